//! Shared state for service-level tests

use std::path::Path;

use docguard_common::events::EventBus;

use crate::config::{LlmSettings, ServiceConfig};
use crate::warehouse::Warehouse;
use crate::AppState;

/// App state rooted at `root` with no model keys, so classification always
/// takes the detector fallback
pub(crate) fn app_state(root: &Path, warehouse: Warehouse) -> AppState {
    let config = ServiceConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_upload_bytes: 1024 * 1024,
        root_folder: root.to_path_buf(),
        uploads_dir: root.join("uploads"),
        warehouse_enabled: warehouse.is_enabled(),
        database_path: root.join("docguard.db"),
        max_concurrency: 2,
        policy_path: None,
        primary_llm: LlmSettings::primary_defaults(),
        secondary_llm: LlmSettings::secondary_defaults(),
    };
    AppState::from_config(config, warehouse, EventBus::new(64)).unwrap()
}
