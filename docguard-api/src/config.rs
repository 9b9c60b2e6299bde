//! Configuration resolution for docguard-api
//!
//! Model settings resolve ENV → TOML → compiled default, field by field.
//! Service settings combine the bootstrap TOML with the resolved root folder.

use docguard_common::config::{
    LlmSection, RootFolderInitializer, TomlConfig, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT,
};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an alternate policy YAML
pub const POLICY_PATH_ENV: &str = "DOCGUARD_POLICY";

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection and sampling settings for one model backend
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl LlmSettings {
    pub fn primary_defaults() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-pro-latest".to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            temperature: 0.2,
            top_p: 0.9,
            max_output_tokens: 1024,
        }
    }

    pub fn secondary_defaults() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
            temperature: 0.1,
            top_p: 0.9,
            max_output_tokens: 800,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().map(is_valid_key).unwrap_or(false)
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Environment variable names for one backend
struct LlmEnv {
    api_keys: &'static [&'static str],
    model: &'static str,
    base_url: Option<&'static str>,
    temperature: &'static str,
    top_p: &'static str,
    max_output: &'static str,
}

const PRIMARY_ENV: LlmEnv = LlmEnv {
    api_keys: &["GEMINI_API_KEY"],
    model: "GEMINI_MODEL",
    base_url: None,
    temperature: "GEMINI_TEMPERATURE",
    top_p: "GEMINI_TOP_P",
    max_output: "GEMINI_MAX_OUTPUT",
};

const SECONDARY_ENV: LlmEnv = LlmEnv {
    api_keys: &["SECONDARY_LLM_API_KEY", "OPENAI_API_KEY"],
    model: "SECONDARY_LLM_MODEL",
    base_url: Some("SECONDARY_LLM_BASE_URL"),
    temperature: "SECONDARY_LLM_TEMPERATURE",
    top_p: "SECONDARY_LLM_TOP_P",
    max_output: "SECONDARY_LLM_MAX_OUTPUT",
};

/// Resolve the primary (Gemini) backend settings
pub fn resolve_primary_llm(toml: &TomlConfig) -> LlmSettings {
    resolve_llm("primary", &PRIMARY_ENV, &toml.primary_llm, LlmSettings::primary_defaults())
}

/// Resolve the secondary (OpenAI-compatible) backend settings
pub fn resolve_secondary_llm(toml: &TomlConfig) -> LlmSettings {
    resolve_llm(
        "secondary",
        &SECONDARY_ENV,
        &toml.secondary_llm,
        LlmSettings::secondary_defaults(),
    )
}

fn resolve_llm(label: &str, env: &LlmEnv, section: &LlmSection, defaults: LlmSettings) -> LlmSettings {
    let env_key = env
        .api_keys
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|key| is_valid_key(key));
    let toml_key = section.api_key.clone().filter(|key| is_valid_key(key));

    if env_key.is_some() && toml_key.is_some() {
        warn!(backend = label, "API key found in environment and TOML. Using environment.");
    }
    let api_key = match (env_key, toml_key) {
        (Some(key), _) => {
            info!(backend = label, "API key loaded from environment variable");
            Some(key)
        }
        (None, Some(key)) => {
            info!(backend = label, "API key loaded from TOML config");
            Some(key)
        }
        (None, None) => {
            warn!(backend = label, "No API key configured; backend disabled");
            None
        }
    };

    let model = env_string(env.model)
        .or_else(|| section.model.clone())
        .unwrap_or(defaults.model);
    let base_url = env
        .base_url
        .and_then(env_string)
        .or_else(|| section.base_url.clone())
        .unwrap_or(defaults.base_url)
        .trim_end_matches('/')
        .to_string();

    LlmSettings {
        api_key,
        model,
        base_url,
        temperature: env_parse(env.temperature)
            .or(section.temperature)
            .unwrap_or(defaults.temperature),
        top_p: env_parse(env.top_p).or(section.top_p).unwrap_or(defaults.top_p),
        max_output_tokens: env_parse(env.max_output)
            .or(section.max_output_tokens)
            .unwrap_or(defaults.max_output_tokens),
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", name, raw);
            None
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub root_folder: PathBuf,
    pub uploads_dir: PathBuf,
    pub warehouse_enabled: bool,
    pub database_path: PathBuf,
    pub max_concurrency: usize,
    pub policy_path: Option<PathBuf>,
    pub primary_llm: LlmSettings,
    pub secondary_llm: LlmSettings,
}

impl ServiceConfig {
    /// Combine TOML settings with the resolved root folder
    ///
    /// `port` is the CLI/ENV value (clap reads `DOCGUARD_PORT`), which wins
    /// over TOML.
    pub fn resolve(toml: &TomlConfig, root_folder: PathBuf, port: Option<u16>) -> Self {
        let layout = RootFolderInitializer::new(root_folder.clone());
        let policy_path = env_string(POLICY_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| toml.policy_path.clone());

        Self {
            host: toml.host.clone().unwrap_or_else(|| "127.0.0.1".to_string()),
            port: port.or(toml.port).unwrap_or(DEFAULT_PORT),
            max_upload_bytes: toml.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            uploads_dir: layout.uploads_path(),
            warehouse_enabled: toml.warehouse.enabled,
            database_path: toml
                .warehouse
                .database_path
                .clone()
                .unwrap_or_else(|| layout.database_path()),
            max_concurrency: toml.batch.max_concurrency.max(1),
            policy_path,
            primary_llm: resolve_primary_llm(toml),
            secondary_llm: resolve_secondary_llm(toml),
            root_folder,
        }
    }
}
