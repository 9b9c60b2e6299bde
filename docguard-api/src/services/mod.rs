//! Request-level workflows shared by the HTTP handlers and the batch runner
//!
//! Each service updates the in-memory store first, mirrors the change to the
//! warehouse, then emits an event.

pub mod batch_processor;
pub mod classification;
pub mod dashboard;
pub mod ingest;
pub mod review;

pub use batch_processor::process_batch_job;
pub use classification::classify_document;
pub use dashboard::{dashboard_snapshot, recent_documents};
pub use ingest::{ingest_batch, ingest_document, sanitize_filename};
pub use review::{audit_trail, review_queue, submit_review};
