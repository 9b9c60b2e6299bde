//! Warehouse table definitions
//!
//! Tables are created idempotently on startup. Timestamps are RFC 3339 text,
//! ids are hyphenated UUID text and nested values are JSON text.

use docguard_common::Result;
use sqlx::SqlitePool;

const CREATE_DOCS: &str = r#"
    CREATE TABLE IF NOT EXISTS docs (
        doc_id TEXT PRIMARY KEY,
        filename TEXT NOT NULL,
        source_path TEXT NOT NULL,
        uploaded_at TEXT NOT NULL,
        status TEXT NOT NULL,
        page_count INTEGER,
        image_count INTEGER,
        legibility_score REAL
    )
"#;

const CREATE_CLASSIFICATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS classifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        doc_id TEXT NOT NULL,
        classified_at TEXT NOT NULL,
        final_category TEXT NOT NULL,
        secondary_tags TEXT,
        confidence REAL,
        explanation TEXT,
        citations TEXT,
        page_count INTEGER,
        image_count INTEGER,
        legibility_score REAL,
        content_safety TEXT,
        requires_review INTEGER,
        dual_llm_agreement REAL,
        dual_llm_disagreements TEXT,
        primary_analysis TEXT,
        secondary_analysis TEXT,
        summary TEXT,
        raw_signals TEXT,
        llm_payload TEXT
    )
"#;

const CREATE_REVIEW_QUEUE: &str = r#"
    CREATE TABLE IF NOT EXISTS review_queue (
        doc_id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        last_updated_at TEXT NOT NULL,
        reason_triggers TEXT NOT NULL,
        assigned_to TEXT,
        category TEXT,
        confidence REAL,
        priority TEXT NOT NULL,
        resolution_notes TEXT
    )
"#;

const CREATE_AUDIT_LOG: &str = r#"
    CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        doc_id TEXT NOT NULL,
        event_time TEXT NOT NULL,
        event_type TEXT NOT NULL,
        payload TEXT
    )
"#;

const CREATE_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_classifications_doc ON classifications(doc_id, classified_at)",
    "CREATE INDEX IF NOT EXISTS idx_audit_log_doc ON audit_log(doc_id, event_time)",
];

/// Create all warehouse tables that do not exist yet
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    for statement in [
        CREATE_DOCS,
        CREATE_CLASSIFICATIONS,
        CREATE_REVIEW_QUEUE,
        CREATE_AUDIT_LOG,
    ] {
        sqlx::query(statement).execute(pool).await?;
    }
    for statement in CREATE_INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tables_are_created_idempotently() {
        let pool = docguard_common::db::init_memory_pool().await.unwrap();
        create_tables(&pool).await.unwrap();
        create_tables(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["audit_log", "classifications", "docs", "review_queue"]);
    }
}
