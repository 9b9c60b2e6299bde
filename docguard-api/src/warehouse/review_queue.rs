//! review_queue table operations
//!
//! One row per document. Re-queueing a document reopens its row and keeps
//! the original `created_at` and assignee.

use chrono::Utc;
use docguard_common::{Error, Result};
use sqlx::{Row, SqlitePool};

use super::records::{parse_time, parse_uuid, to_json};
use crate::models::{ReviewPriority, ReviewQueueEntry, ReviewStatus};

/// Open (or reopen) the review row for `entry.doc_id`
pub async fn upsert_review_queue(pool: &SqlitePool, entry: &ReviewQueueEntry) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO review_queue (
            doc_id, status, created_at, last_updated_at, reason_triggers,
            assigned_to, category, confidence, priority
        ) VALUES (?, 'open', ?, ?, ?, NULL, ?, ?, ?)
        ON CONFLICT(doc_id) DO UPDATE SET
            status = 'open',
            last_updated_at = excluded.last_updated_at,
            reason_triggers = excluded.reason_triggers,
            category = excluded.category,
            confidence = excluded.confidence,
            priority = excluded.priority
        "#,
    )
    .bind(entry.doc_id.to_string())
    .bind(entry.created_at.to_rfc3339())
    .bind(&now)
    .bind(to_json(&entry.reason_triggers)?)
    .bind(&entry.category)
    .bind(entry.confidence)
    .bind(entry.priority.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark the review row closed by `reviewer`
pub async fn close_review_item(
    pool: &SqlitePool,
    doc_id: uuid::Uuid,
    reviewer: &str,
    resolution: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE review_queue
        SET status = 'closed',
            assigned_to = ?,
            resolution_notes = ?,
            last_updated_at = ?
        WHERE doc_id = ?
        "#,
    )
    .bind(reviewer)
    .bind(resolution)
    .bind(Utc::now().to_rfc3339())
    .bind(doc_id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Review rows, high priority first, then oldest first
pub async fn list_review_queue(
    pool: &SqlitePool,
    status: Option<ReviewStatus>,
    limit: usize,
) -> Result<Vec<ReviewQueueEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT doc_id, status, created_at, last_updated_at, reason_triggers,
               assigned_to, category, confidence, priority, resolution_notes
        FROM review_queue
        WHERE ? IS NULL OR status = ?
        ORDER BY CASE priority WHEN 'high' THEN 1 ELSE 0 END DESC, created_at ASC
        LIMIT ?
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(status.map(|s| s.as_str()))
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let doc_id: String = row.get("doc_id");
            let status: String = row.get("status");
            let created_at: String = row.get("created_at");
            let last_updated_at: String = row.get("last_updated_at");
            let triggers: String = row.get("reason_triggers");
            let priority: String = row.get("priority");
            Ok(ReviewQueueEntry {
                doc_id: parse_uuid(&doc_id)?,
                status: ReviewStatus::parse(&status)
                    .ok_or_else(|| Error::corrupt("status", status.as_str()))?,
                created_at: parse_time(&created_at)?,
                last_updated_at: parse_time(&last_updated_at)?,
                reason_triggers: serde_json::from_str(&triggers)?,
                assigned_to: row.get("assigned_to"),
                category: row.get::<Option<String>, _>("category").unwrap_or_default(),
                confidence: row.get::<Option<f64>, _>("confidence").unwrap_or(0.0),
                priority: if priority == "high" {
                    ReviewPriority::High
                } else {
                    ReviewPriority::Normal
                },
                resolution_notes: row.get("resolution_notes"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::schema::create_tables;
    use uuid::Uuid;

    fn entry(doc_id: Uuid, priority: ReviewPriority, offset_secs: i64) -> ReviewQueueEntry {
        let created = Utc::now() - chrono::Duration::seconds(offset_secs);
        ReviewQueueEntry {
            doc_id,
            status: ReviewStatus::Open,
            created_at: created,
            last_updated_at: created,
            reason_triggers: vec!["low_confidence".into()],
            assigned_to: None,
            category: "Confidential".into(),
            confidence: 0.55,
            priority,
            resolution_notes: None,
        }
    }

    #[tokio::test]
    async fn upsert_close_and_reopen() {
        let pool = docguard_common::db::init_memory_pool().await.unwrap();
        create_tables(&pool).await.unwrap();
        let doc_id = Uuid::new_v4();

        upsert_review_queue(&pool, &entry(doc_id, ReviewPriority::Normal, 60)).await.unwrap();
        close_review_item(&pool, doc_id, "kim", Some("checked")).await.unwrap();

        let closed = list_review_queue(&pool, Some(ReviewStatus::Closed), 50).await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].assigned_to.as_deref(), Some("kim"));
        assert_eq!(closed[0].resolution_notes.as_deref(), Some("checked"));

        let mut again = entry(doc_id, ReviewPriority::High, 0);
        again.reason_triggers = vec!["unsafe_detector".into()];
        upsert_review_queue(&pool, &again).await.unwrap();

        let open = list_review_queue(&pool, Some(ReviewStatus::Open), 50).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].priority, ReviewPriority::High);
        assert_eq!(open[0].reason_triggers, vec!["unsafe_detector".to_string()]);
        // Reopening keeps the first created_at and the assignee
        assert!(open[0].created_at < again.created_at);
        assert_eq!(open[0].assigned_to.as_deref(), Some("kim"));
    }

    #[tokio::test]
    async fn high_priority_sorts_first() {
        let pool = docguard_common::db::init_memory_pool().await.unwrap();
        create_tables(&pool).await.unwrap();
        let normal = Uuid::new_v4();
        let high = Uuid::new_v4();
        upsert_review_queue(&pool, &entry(normal, ReviewPriority::Normal, 30)).await.unwrap();
        upsert_review_queue(&pool, &entry(high, ReviewPriority::High, 0)).await.unwrap();

        let all = list_review_queue(&pool, None, 10).await.unwrap();
        assert_eq!(all.iter().map(|e| e.doc_id).collect::<Vec<_>>(), vec![high, normal]);
        assert_eq!(list_review_queue(&pool, None, 1).await.unwrap().len(), 1);
    }
}
