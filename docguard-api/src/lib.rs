//! docguard-api library interface
//!
//! Document sensitivity classification service: upload, extraction,
//! detectors, dual-model classification, human review routing, warehouse
//! persistence and batch jobs behind an axum router.

pub mod api;
pub mod config;
pub mod detectors;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod policy;
pub mod services;
pub mod store;
pub mod warehouse;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::error::{ApiError, ApiResult};

use anyhow::Context;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use chrono::{DateTime, Utc};
use docguard_common::events::EventBus;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::ServiceConfig;
use crate::detectors::Detectors;
use crate::llm::{ChatBackend, GeminiBackend, OpenAiBackend};
use crate::pipeline::Classifier;
use crate::policy::Policy;
use crate::store::DocumentStore;
use crate::warehouse::Warehouse;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub store: Arc<DocumentStore>,
    pub warehouse: Warehouse,
    pub classifier: Classifier,
    pub detectors: Arc<Detectors>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        classifier: Classifier,
        detectors: Detectors,
        warehouse: Warehouse,
        event_bus: EventBus,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(DocumentStore::new()),
            warehouse,
            classifier,
            detectors: Arc::new(detectors),
            event_bus,
            startup_time: Utc::now(),
        }
    }

    /// Load the policy and build both model backends from `config`
    ///
    /// The secondary model is only attached when it has an API key.
    pub fn from_config(
        config: ServiceConfig,
        warehouse: Warehouse,
        event_bus: EventBus,
    ) -> anyhow::Result<Self> {
        let policy = Policy::load_or_builtin(config.policy_path.as_deref())
            .context("Failed to load classification policy")?;
        let detectors =
            Detectors::new(&policy.detectors).context("Invalid detector keyword list")?;

        let primary: Arc<dyn ChatBackend> = Arc::new(
            GeminiBackend::new(config.primary_llm.clone())
                .context("Failed to build primary model client")?,
        );
        let secondary: Option<Arc<dyn ChatBackend>> = if config.secondary_llm.is_configured() {
            Some(Arc::new(
                OpenAiBackend::new(config.secondary_llm.clone())
                    .context("Failed to build secondary model client")?,
            ))
        } else {
            info!("Secondary model not configured; dual-model review disabled");
            None
        };
        if !config.primary_llm.is_configured() {
            info!("Primary model not configured; classifications use detector fallback");
        }

        let classifier = Classifier::new(primary, secondary, Arc::new(policy));
        Ok(Self::new(config, classifier, detectors, warehouse, event_bus))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(api::document_routes())
        .merge(api::classify_routes())
        .merge(api::hitl_routes())
        .merge(api::batch_routes())
        .merge(api::dashboard_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
