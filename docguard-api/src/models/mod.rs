//! Data models for docguard-api
//!
//! Flat records: a document, its classification, batch jobs, review queue
//! entries and the dashboard snapshot. A classification always refers to a
//! stored document.

pub mod classification;
pub mod dashboard;
pub mod document;
pub mod job;
pub mod review;

pub use classification::{Category, Citation, ClassificationResult, DetectorSignals, HitlUpdate};
pub use dashboard::{
    CategoryCount, DashboardCounts, DashboardDocument, DashboardSnapshot, DashboardSummary,
    ReviewCount, StatusCount,
};
pub use document::{
    DocumentRecord, DocumentStatus, ExtractedDocument, ExtractedImage, UploadResponse,
};
pub use job::{
    BatchJob, BatchUploadResponse, DocumentJobStatus, DocumentProgress, JobDocumentStatus,
    JobStatus, JobStatusResponse, JobSummary,
};
pub use review::{AuditEvent, ReviewPriority, ReviewQueueEntry, ReviewStatus, ReviewTrigger};
