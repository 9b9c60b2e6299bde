//! Dashboard queries over the latest classification of each document

use docguard_common::Result;
use sqlx::{Row, SqlitePool};

use super::records::{parse_time, parse_uuid};
use crate::models::{
    CategoryCount, DashboardDocument, DashboardSummary, ReviewCount, StatusCount,
};

const LATEST: &str = r#"
    WITH latest AS (
        SELECT
            doc_id, final_category, confidence, requires_review, content_safety,
            page_count, image_count, legibility_score, classified_at,
            ROW_NUMBER() OVER (PARTITION BY doc_id ORDER BY classified_at DESC) AS row_num
        FROM classifications
    )
"#;

/// Most recent uploads joined with their latest classification
pub async fn list_dashboard_documents(
    pool: &SqlitePool,
    limit: usize,
) -> Result<Vec<DashboardDocument>> {
    let query = format!(
        r#"{LATEST}
        SELECT
            d.doc_id,
            d.filename,
            d.uploaded_at,
            d.status,
            COALESCE(latest.page_count, d.page_count) AS page_count,
            COALESCE(latest.image_count, d.image_count) AS image_count,
            COALESCE(latest.legibility_score, d.legibility_score) AS legibility_score,
            latest.final_category,
            latest.confidence,
            latest.requires_review,
            latest.content_safety,
            latest.classified_at
        FROM docs d
        LEFT JOIN latest ON latest.doc_id = d.doc_id AND latest.row_num = 1
        ORDER BY d.uploaded_at DESC
        LIMIT ?
        "#
    );
    let rows = sqlx::query(&query)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|row| {
            let doc_id: String = row.get("doc_id");
            let uploaded_at: String = row.get("uploaded_at");
            let classified_at: Option<String> = row.get("classified_at");
            let final_category = row
                .get::<Option<String>, _>("final_category")
                .unwrap_or_else(|| DashboardDocument::UNCLASSIFIED.to_string());
            Ok(DashboardDocument {
                doc_id: parse_uuid(&doc_id)?,
                filename: row.get("filename"),
                uploaded_at: parse_time(&uploaded_at)?,
                status: row.get("status"),
                page_count: row.get::<Option<i64>, _>("page_count").unwrap_or(0),
                image_count: row.get::<Option<i64>, _>("image_count").unwrap_or(0),
                legibility_score: row.get("legibility_score"),
                requires_review: row
                    .get::<Option<bool>, _>("requires_review")
                    .unwrap_or(false),
                confidence: row.get("confidence"),
                content_safety: row.get("content_safety"),
                classified_at: classified_at.as_deref().map(parse_time).transpose()?,
                is_unsafe: final_category == "Unsafe",
                final_category,
            })
        })
        .collect()
}

/// Document counts by status, and latest classifications by category and
/// review flag
pub async fn summary(pool: &SqlitePool) -> Result<DashboardSummary> {
    let by_status = sqlx::query("SELECT status, COUNT(*) AS count FROM docs GROUP BY status ORDER BY status")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| StatusCount {
            status: row.get("status"),
            count: row.get("count"),
        })
        .collect();

    let by_category = sqlx::query(&format!(
        "{LATEST} SELECT final_category, COUNT(*) AS count FROM latest WHERE row_num = 1 \
         GROUP BY final_category ORDER BY final_category"
    ))
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| CategoryCount {
        final_category: row.get("final_category"),
        count: row.get("count"),
    })
    .collect();

    let by_requires_review = sqlx::query(&format!(
        "{LATEST} SELECT COALESCE(requires_review, 0) AS requires_review, COUNT(*) AS count \
         FROM latest WHERE row_num = 1 GROUP BY COALESCE(requires_review, 0) ORDER BY 1"
    ))
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| ReviewCount {
        requires_review: row.get::<i64, _>("requires_review") != 0,
        count: row.get("count"),
    })
    .collect();

    Ok(DashboardSummary {
        by_status,
        by_category,
        by_requires_review,
    })
}

/// Mean confidence (0.0 - 1.0) of the latest classifications; 0.0 when none
pub async fn average_confidence(pool: &SqlitePool) -> Result<f64> {
    let avg: Option<f64> = sqlx::query_scalar(&format!(
        "{LATEST} SELECT AVG(confidence) FROM latest WHERE row_num = 1"
    ))
    .fetch_one(pool)
    .await?;
    Ok(avg.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, DocumentRecord, DocumentStatus};
    use crate::warehouse::fixtures::classification;
    use crate::warehouse::records::{insert_classification_record, insert_doc_record};
    use crate::warehouse::schema::create_tables;

    #[tokio::test]
    async fn latest_classification_wins() {
        let pool = docguard_common::db::init_memory_pool().await.unwrap();
        create_tables(&pool).await.unwrap();

        let mut classified = DocumentRecord::new("a.pdf".into(), "/u/a.pdf".into());
        classified.status = DocumentStatus::Classified;
        insert_doc_record(&pool, &classified).await.unwrap();
        let pending = DocumentRecord::new("b.txt".into(), "/u/b.txt".into());
        insert_doc_record(&pool, &pending).await.unwrap();

        insert_classification_record(&pool, &classification(classified.doc_id, Category::Public, 0.6))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut latest = classification(classified.doc_id, Category::Unsafe, 0.9);
        latest.requires_review = true;
        insert_classification_record(&pool, &latest).await.unwrap();

        let docs = list_dashboard_documents(&pool, 50).await.unwrap();
        assert_eq!(docs.len(), 2);
        let a = docs.iter().find(|d| d.doc_id == classified.doc_id).unwrap();
        assert_eq!(a.final_category, "Unsafe");
        assert!(a.is_unsafe);
        assert!(a.requires_review);
        let b = docs.iter().find(|d| d.doc_id == pending.doc_id).unwrap();
        assert_eq!(b.final_category, "Unclassified");
        assert_eq!(b.confidence, None);

        let summary = summary(&pool).await.unwrap();
        assert_eq!(summary.by_status.iter().map(|s| s.count).sum::<i64>(), 2);
        assert_eq!(summary.by_category.len(), 1);
        assert_eq!(summary.by_category[0].final_category, "Unsafe");
        assert!(summary.by_requires_review[0].requires_review);

        let avg = average_confidence(&pool).await.unwrap();
        assert!((avg - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_warehouse_averages_zero() {
        let pool = docguard_common::db::init_memory_pool().await.unwrap();
        create_tables(&pool).await.unwrap();
        assert_eq!(average_confidence(&pool).await.unwrap(), 0.0);
        assert!(list_dashboard_documents(&pool, 10).await.unwrap().is_empty());
    }
}
