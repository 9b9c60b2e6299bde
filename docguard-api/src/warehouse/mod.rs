//! Fail-soft SQL warehouse
//!
//! A durable copy of documents, classifications, review items and the audit
//! trail. Persistence never fails a request: a disabled warehouse turns every
//! call into a no-op, and database errors are logged and swallowed. Reads
//! return empty results on failure.
//!
//! The submodules hold the strict `Result`-returning queries; `Warehouse`
//! wraps them with the fail-soft policy.

pub mod dashboard;
pub mod records;
pub mod review_queue;
pub mod schema;

use std::path::Path;

use docguard_common::db::{init_database_pool, init_memory_pool};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    AuditEvent, ClassificationResult, DashboardSnapshot, DocumentRecord, DocumentStatus,
    ReviewQueueEntry, ReviewStatus,
};

#[derive(Clone, Default)]
pub struct Warehouse {
    pool: Option<SqlitePool>,
}

fn log_failure(operation: &str, err: &docguard_common::Error) {
    warn!(operation, error = %err, "Warehouse operation failed");
}

impl Warehouse {
    /// A warehouse that accepts every write and reads back nothing
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Open the database file and create missing tables
    ///
    /// A warehouse that cannot be opened is disabled rather than fatal.
    pub async fn open(db_path: &Path) -> Self {
        match init_database_pool(db_path).await {
            Ok(pool) => Self::with_pool(pool).await,
            Err(err) => {
                log_failure("open", &err);
                Self::disabled()
            }
        }
    }

    /// Fresh in-memory warehouse
    pub async fn in_memory() -> Self {
        match init_memory_pool().await {
            Ok(pool) => Self::with_pool(pool).await,
            Err(err) => {
                log_failure("open", &err);
                Self::disabled()
            }
        }
    }

    async fn with_pool(pool: SqlitePool) -> Self {
        match schema::create_tables(&pool).await {
            Ok(()) => {
                info!("Warehouse tables ready");
                Self { pool: Some(pool) }
            }
            Err(err) => {
                log_failure("create_tables", &err);
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    pub fn pool(&self) -> Option<&SqlitePool> {
        self.pool.as_ref()
    }

    pub async fn insert_doc_record(&self, record: &DocumentRecord) {
        if let Some(pool) = &self.pool {
            if let Err(err) = records::insert_doc_record(pool, record).await {
                log_failure("insert_doc_record", &err);
            }
        }
    }

    pub async fn update_doc_status(&self, doc_id: Uuid, status: DocumentStatus) {
        if let Some(pool) = &self.pool {
            if let Err(err) =
                records::update_doc_record(pool, doc_id, Some(status), None, None, None).await
            {
                log_failure("update_doc_record", &err);
            }
        }
    }

    pub async fn insert_classification_record(&self, result: &ClassificationResult) {
        if let Some(pool) = &self.pool {
            if let Err(err) = records::insert_classification_record(pool, result).await {
                log_failure("insert_classification_record", &err);
            }
        }
    }

    pub async fn insert_audit_event(&self, event: &AuditEvent) {
        if let Some(pool) = &self.pool {
            if let Err(err) = records::insert_audit_event(pool, event).await {
                log_failure("insert_audit_event", &err);
            }
        }
    }

    pub async fn upsert_review_queue(&self, entry: &ReviewQueueEntry) {
        if let Some(pool) = &self.pool {
            if let Err(err) = review_queue::upsert_review_queue(pool, entry).await {
                log_failure("upsert_review_queue", &err);
            }
        }
    }

    pub async fn close_review_item(&self, doc_id: Uuid, reviewer: &str, resolution: Option<&str>) {
        if let Some(pool) = &self.pool {
            if let Err(err) = review_queue::close_review_item(pool, doc_id, reviewer, resolution).await {
                log_failure("close_review_item", &err);
            }
        }
    }

    pub async fn list_documents(&self, limit: usize) -> Vec<DocumentRecord> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };
        records::list_documents(pool, limit).await.unwrap_or_else(|err| {
            log_failure("list_documents", &err);
            Vec::new()
        })
    }

    pub async fn list_audit_events(&self, doc_id: Uuid, limit: usize) -> Vec<AuditEvent> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };
        records::list_audit_events(pool, doc_id, limit)
            .await
            .unwrap_or_else(|err| {
                log_failure("list_audit_events", &err);
                Vec::new()
            })
    }

    pub async fn list_review_queue(
        &self,
        status: Option<ReviewStatus>,
        limit: usize,
    ) -> Vec<ReviewQueueEntry> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };
        review_queue::list_review_queue(pool, status, limit)
            .await
            .unwrap_or_else(|err| {
                log_failure("list_review_queue", &err);
                Vec::new()
            })
    }

    /// Dashboard snapshot; each failing query contributes an empty part
    pub async fn dashboard_snapshot(&self, limit: usize) -> DashboardSnapshot {
        let Some(pool) = &self.pool else {
            return DashboardSnapshot::new(Vec::new(), Default::default(), 0.0, limit);
        };
        let documents = dashboard::list_dashboard_documents(pool, limit)
            .await
            .unwrap_or_else(|err| {
                log_failure("list_dashboard_documents", &err);
                Vec::new()
            });
        let summary = dashboard::summary(pool).await.unwrap_or_else(|err| {
            log_failure("summary", &err);
            Default::default()
        });
        let average = dashboard::average_confidence(pool)
            .await
            .unwrap_or_else(|err| {
                log_failure("average_confidence", &err);
                0.0
            });
        DashboardSnapshot::new(documents, summary, average, limit)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    #[tokio::test]
    async fn disabled_warehouse_is_a_no_op() {
        let warehouse = Warehouse::disabled();
        assert!(!warehouse.is_enabled());
        let record = DocumentRecord::new("a.txt".into(), "/u/a.txt".into());
        warehouse.insert_doc_record(&record).await;
        warehouse
            .insert_classification_record(&fixtures::classification(record.doc_id, Category::Public, 0.7))
            .await;
        assert!(warehouse.list_documents(10).await.is_empty());
        let snapshot = warehouse.dashboard_snapshot(25).await;
        assert!(snapshot.documents.is_empty());
        assert_eq!(snapshot.limit, 25);
    }

    #[tokio::test]
    async fn query_errors_are_swallowed() {
        let warehouse = Warehouse::in_memory().await;
        assert!(warehouse.is_enabled());
        let pool = warehouse.pool().unwrap();
        sqlx::query("DROP TABLE review_queue").execute(pool).await.unwrap();
        sqlx::query("DROP TABLE docs").execute(pool).await.unwrap();

        warehouse.close_review_item(Uuid::new_v4(), "kim", None).await;
        assert!(warehouse.list_review_queue(None, 10).await.is_empty());
        assert!(warehouse.list_documents(10).await.is_empty());
        let snapshot = warehouse.dashboard_snapshot(10).await;
        assert_eq!(snapshot.counts.total, 0);
    }

    #[tokio::test]
    async fn open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docguard.db");
        let warehouse = Warehouse::open(&path).await;
        assert!(warehouse.is_enabled());

        let mut record = DocumentRecord::new("a.txt".into(), "/u/a.txt".into());
        record.status = DocumentStatus::Preprocessed;
        warehouse.insert_doc_record(&record).await;
        warehouse.update_doc_status(record.doc_id, DocumentStatus::Classified).await;

        let docs = warehouse.list_documents(10).await;
        assert_eq!(docs[0].status, DocumentStatus::Classified);
        assert!(path.exists());
    }
}
