//! docs, classifications and audit_log operations

use chrono::{DateTime, Utc};
use docguard_common::{Error, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::models::{AuditEvent, ClassificationResult, DocumentRecord, DocumentStatus};

pub(super) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub(super) fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::corrupt("timestamp", value))
}

pub(super) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| Error::corrupt("doc_id", value))
}

/// Whether an insert failed because the table lacks one of its columns
fn is_missing_column(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let message = db.message();
            message.contains("no such column") || message.contains("has no column named")
        }
        _ => false,
    }
}

pub async fn insert_doc_record(pool: &SqlitePool, record: &DocumentRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO docs (
            doc_id, filename, source_path, uploaded_at, status,
            page_count, image_count, legibility_score
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(doc_id) DO UPDATE SET
            status = excluded.status,
            page_count = excluded.page_count,
            image_count = excluded.image_count,
            legibility_score = excluded.legibility_score
        "#,
    )
    .bind(record.doc_id.to_string())
    .bind(&record.filename)
    .bind(&record.source_path)
    .bind(record.uploaded_at.to_rfc3339())
    .bind(record.status.as_str())
    .bind(record.page_count as i64)
    .bind(record.image_count as i64)
    .bind(record.legibility_score)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update the given docs columns, leaving `None` fields untouched
pub async fn update_doc_record(
    pool: &SqlitePool,
    doc_id: Uuid,
    status: Option<DocumentStatus>,
    page_count: Option<usize>,
    image_count: Option<usize>,
    legibility_score: Option<f64>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE docs SET
            status = COALESCE(?, status),
            page_count = COALESCE(?, page_count),
            image_count = COALESCE(?, image_count),
            legibility_score = COALESCE(?, legibility_score)
        WHERE doc_id = ?
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(page_count.map(|n| n as i64))
    .bind(image_count.map(|n| n as i64))
    .bind(legibility_score)
    .bind(doc_id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Append a classification row
///
/// Older tables may only carry the core columns; in that case the row is
/// written with doc_id, timestamp, category, tags and confidence only.
pub async fn insert_classification_record(
    pool: &SqlitePool,
    result: &ClassificationResult,
) -> Result<()> {
    let doc_id = result.doc_id.to_string();
    let classified_at = Utc::now().to_rfc3339();
    let secondary_tags = to_json(&result.secondary_tags)?;
    let citations = to_json(&result.citations)?;
    let disagreements = result
        .dual_llm_disagreements
        .as_ref()
        .filter(|d| !d.is_empty())
        .map(|d| to_json(d))
        .transpose()?;
    let primary_analysis = result.primary_analysis.as_ref().map(to_json).transpose()?;
    let secondary_analysis = result.secondary_analysis.as_ref().map(to_json).transpose()?;
    let summary = result.summary.as_ref().map(to_json).transpose()?;
    let raw_signals = to_json(&result.raw_signals)?;
    let llm_payload = result.llm_payload.as_ref().map(to_json).transpose()?;

    let full = sqlx::query(
        r#"
        INSERT INTO classifications (
            doc_id, classified_at, final_category, secondary_tags, confidence,
            explanation, citations, page_count, image_count, legibility_score,
            content_safety, requires_review, dual_llm_agreement,
            dual_llm_disagreements, primary_analysis, secondary_analysis,
            summary, raw_signals, llm_payload
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&doc_id)
    .bind(&classified_at)
    .bind(result.final_category.as_str())
    .bind(&secondary_tags)
    .bind(result.confidence)
    .bind(&result.explanation)
    .bind(&citations)
    .bind(result.page_count as i64)
    .bind(result.image_count as i64)
    .bind(result.legibility_score)
    .bind(&result.content_safety)
    .bind(result.requires_review)
    .bind(result.dual_llm_agreement)
    .bind(&disagreements)
    .bind(&primary_analysis)
    .bind(&secondary_analysis)
    .bind(&summary)
    .bind(&raw_signals)
    .bind(&llm_payload)
    .execute(pool)
    .await;

    match full {
        Ok(_) => Ok(()),
        Err(err) if is_missing_column(&err) => {
            debug!(doc_id = %result.doc_id, error = %err, "Falling back to core classification columns");
            sqlx::query(
                r#"
                INSERT INTO classifications (
                    doc_id, classified_at, final_category, secondary_tags, confidence
                ) VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&doc_id)
            .bind(&classified_at)
            .bind(result.final_category.as_str())
            .bind(&secondary_tags)
            .bind(result.confidence)
            .execute(pool)
            .await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn insert_audit_event(pool: &SqlitePool, event: &AuditEvent) -> Result<()> {
    sqlx::query(
        "INSERT INTO audit_log (doc_id, event_time, event_type, payload) VALUES (?, ?, ?, ?)",
    )
    .bind(event.doc_id.to_string())
    .bind(event.event_time.to_rfc3339())
    .bind(&event.event_type)
    .bind(to_json(&event.payload)?)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent uploads first, without classifications
pub async fn list_documents(pool: &SqlitePool, limit: usize) -> Result<Vec<DocumentRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT doc_id, filename, source_path, uploaded_at, status,
               page_count, image_count, legibility_score
        FROM docs
        ORDER BY uploaded_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let doc_id: String = row.get("doc_id");
            let uploaded_at: String = row.get("uploaded_at");
            let status: String = row.get("status");
            Ok(DocumentRecord {
                doc_id: parse_uuid(&doc_id)?,
                filename: row.get("filename"),
                source_path: row.get("source_path"),
                status: DocumentStatus::parse(&status)
                    .ok_or_else(|| Error::corrupt("status", status.as_str()))?,
                page_count: row.get::<Option<i64>, _>("page_count").unwrap_or(0) as usize,
                image_count: row.get::<Option<i64>, _>("image_count").unwrap_or(0) as usize,
                legibility_score: row.get("legibility_score"),
                uploaded_at: parse_time(&uploaded_at)?,
                classification: None,
            })
        })
        .collect()
}

/// Audit trail for one document, newest first
pub async fn list_audit_events(
    pool: &SqlitePool,
    doc_id: Uuid,
    limit: usize,
) -> Result<Vec<AuditEvent>> {
    let rows = sqlx::query(
        r#"
        SELECT doc_id, event_time, event_type, payload
        FROM audit_log
        WHERE doc_id = ?
        ORDER BY event_time DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(doc_id.to_string())
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let event_time: String = row.get("event_time");
            let payload: Option<String> = row.get("payload");
            let payload = match payload {
                Some(text) => serde_json::from_str(&text)?,
                None => serde_json::Value::Null,
            };
            Ok(AuditEvent {
                doc_id,
                event_type: row.get("event_type"),
                payload,
                event_time: parse_time(&event_time)?,
            })
        })
        .collect()
}
