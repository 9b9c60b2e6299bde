//! HTTP API handlers for docguard-api
//!
//! REST + JSON endpoints and the SSE event stream.

pub mod batch;
pub mod classify;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod hitl;
pub mod sse;

pub use batch::batch_routes;
pub use classify::classify_routes;
pub use dashboard::dashboard_routes;
pub use documents::document_routes;
pub use health::health_routes;
pub use hitl::hitl_routes;
pub use sse::event_stream;

use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Parse a path id; ids that are not UUIDs are reported as not found
pub(crate) fn parse_id(raw: &str, kind: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{} {}", kind, raw)))
}
