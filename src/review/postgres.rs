use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use crate::entity::Entity;

use super::{ReviewError, Reviewable, ReviewableFilters, ReviewProjection, ReviewStatus, SourceRef};

/// Reads the materialized `review.reviewable` view (spec §4.8). The view
/// itself, and the trigger/scheduled job that refreshes it within the 5s
/// bound, live in the deployment's migrations, not in this crate.
pub struct PostgresReviewProjection {
    pool: PgPool,
}

impl PostgresReviewProjection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewProjection for PostgresReviewProjection {
    async fn list(&self, filters: ReviewableFilters) -> Result<Vec<Reviewable>, ReviewError> {
        let status_str = filters.status.map(|s| format!("{s:?}").to_lowercase());
        let entity_str = filters.entity.map(|e| e.schema().to_string());

        let rows = sqlx::query(
            r#"
            SELECT id, type, entity, created_at, updated_at, source_table, source_schema,
                   source_pk, summary, details, confidence, requires_review, status,
                   assignee, vendor, date, amount
              FROM review.reviewable
             WHERE ($1::text IS NULL OR entity = $1)
               AND ($2::text IS NULL OR vendor = $2)
               AND ($3::text IS NULL OR status = $3)
             ORDER BY created_at DESC
            "#,
        )
        .bind(&entity_str)
        .bind(&filters.vendor)
        .bind(&status_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReviewError::Storage(e.to_string()))?;

        rows.into_iter().map(row_to_reviewable).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<Reviewable>, ReviewError> {
        let row = sqlx::query(
            r#"
            SELECT id, type, entity, created_at, updated_at, source_table, source_schema,
                   source_pk, summary, details, confidence, requires_review, status,
                   assignee, vendor, date, amount
              FROM review.reviewable
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReviewError::Storage(e.to_string()))?;

        row.map(row_to_reviewable).transpose()
    }
}

fn row_to_reviewable(row: sqlx::postgres::PgRow) -> Result<Reviewable, ReviewError> {
    let entity_str: String = row.try_get("entity").map_err(|e| ReviewError::Storage(e.to_string()))?;
    let status_str: String = row.try_get("status").map_err(|e| ReviewError::Storage(e.to_string()))?;
    let created_at = row.try_get("created_at").map_err(|e| ReviewError::Storage(e.to_string()))?;
    let updated_at = row.try_get("updated_at").map_err(|e| ReviewError::Storage(e.to_string()))?;

    Ok(Reviewable {
        id: row.try_get("id").map_err(|e| ReviewError::Storage(e.to_string()))?,
        kind: row.try_get("type").map_err(|e| ReviewError::Storage(e.to_string()))?,
        entity: Entity::from_str(&entity_str).map_err(ReviewError::Storage)?,
        created_at,
        updated_at,
        source_ref: SourceRef {
            table: row.try_get("source_table").map_err(|e| ReviewError::Storage(e.to_string()))?,
            schema: row.try_get("source_schema").map_err(|e| ReviewError::Storage(e.to_string()))?,
            pk: row.try_get("source_pk").map_err(|e| ReviewError::Storage(e.to_string()))?,
        },
        summary: row.try_get("summary").map_err(|e| ReviewError::Storage(e.to_string()))?,
        details: row.try_get("details").map_err(|e| ReviewError::Storage(e.to_string()))?,
        confidence: row.try_get("confidence").map_err(|e| ReviewError::Storage(e.to_string()))?,
        requires_review: row.try_get("requires_review").map_err(|e| ReviewError::Storage(e.to_string()))?,
        status: match status_str.as_str() {
            "approved" => ReviewStatus::Approved,
            "rejected" => ReviewStatus::Rejected,
            "snoozed" => ReviewStatus::Snoozed,
            "needs_info" => ReviewStatus::NeedsInfo,
            "posted" => ReviewStatus::Posted,
            _ => ReviewStatus::Pending,
        },
        assignee: row.try_get("assignee").map_err(|e| ReviewError::Storage(e.to_string()))?,
        vendor: row.try_get("vendor").map_err(|e| ReviewError::Storage(e.to_string()))?,
        date: row.try_get("date").map_err(|e| ReviewError::Storage(e.to_string()))?,
        amount: row.try_get("amount").map_err(|e| ReviewError::Storage(e.to_string()))?,
        age_hours: (Utc::now() - created_at).num_seconds() as f64 / 3600.0,
    })
}
