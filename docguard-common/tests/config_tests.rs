//! Configuration loading and root folder resolution tests
//!
//! Tests touching DOCGUARD_* environment variables are marked #[serial] so
//! they never race each other.

use docguard_common::config::{
    load_toml_config, load_toml_config_or_default, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig, DEFAULT_PORT, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn compiled_defaults_are_populated() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.port, DEFAULT_PORT);
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.root_folder.to_string_lossy().contains("docguard"));
}

#[test]
#[serial]
fn resolver_without_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root = RootFolderResolver::new("test").resolve();
    assert_eq!(root, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn resolver_priority_cli_then_env_then_toml() {
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/docguard-toml")),
        ..Default::default()
    };

    env::set_var(ROOT_FOLDER_ENV, "/tmp/docguard-env");
    let resolver = RootFolderResolver::new("test")
        .with_toml(&toml)
        .with_cli_arg(Some(PathBuf::from("/tmp/docguard-cli")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/docguard-cli"));

    let resolver = RootFolderResolver::new("test").with_toml(&toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/docguard-env"));

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/docguard-toml"));
}

#[test]
fn partial_toml_parses_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docguard.toml");
    std::fs::write(
        &path,
        r#"
port = 6000

[warehouse]
enabled = false

[secondary_llm]
model = "gpt-4o"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.port, Some(6000));
    assert!(!config.warehouse.enabled);
    assert_eq!(config.batch.max_concurrency, 4);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.secondary_llm.model.as_deref(), Some("gpt-4o"));
    assert!(config.primary_llm.api_key.is_none());
}

#[test]
fn invalid_toml_degrades_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number").unwrap();

    assert!(load_toml_config(&path).is_err());
    let config = load_toml_config_or_default(Some(&path));
    assert!(config.port.is_none());
    assert!(config.warehouse.enabled);
}

#[test]
fn missing_toml_degrades_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_toml_config_or_default(Some(&dir.path().join("absent.toml")));
    assert!(config.root_folder.is_none());
}

#[test]
fn initializer_creates_layout() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();

    assert!(root.join("uploads").is_dir());
    assert_eq!(initializer.database_path(), root.join("docguard.db"));
    assert_eq!(initializer.uploads_path(), root.join("uploads"));
}
