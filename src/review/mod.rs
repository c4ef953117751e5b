//! Review projection (spec §4.8): a generic, read-only shape that unifies
//! heterogeneous domain rows for the review UI.

pub mod activity;
pub mod actions;
pub mod postgres;

pub use activity::{NewReviewActivity, PostgresReviewActivityLog, ReviewAction, ReviewActivity, ReviewActivityLog};
pub use actions::{
    record_review_decision, CorrectReceiptLine, PostgresReviewCorrectionStore, ReviewCorrectionStore,
};
pub use postgres::PostgresReviewProjection;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::entity::Entity;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("review projection storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Snoozed,
    NeedsInfo,
    Posted,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub table: String,
    pub schema: String,
    pub pk: String,
}

/// The single generic shape every reviewable row is materialized into
/// (spec §4.8). New reviewable types add a projection source with this
/// same output shape rather than adding fields callers must special-case.
#[derive(Debug, Clone, Serialize)]
pub struct Reviewable {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub entity: Entity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_ref: SourceRef,
    pub summary: String,
    pub details: Value,
    pub confidence: Option<f64>,
    pub requires_review: bool,
    pub status: ReviewStatus,
    pub assignee: Option<String>,
    pub vendor: Option<String>,
    pub date: Option<chrono::NaiveDate>,
    pub amount: Option<Decimal>,
    pub age_hours: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewableFilters {
    pub entity: Option<Entity>,
    pub vendor: Option<String>,
    pub status: Option<ReviewStatus>,
}

/// Read-only access to the materialized `review.reviewable` projection.
/// Mutations never go through this trait — corrections go through
/// [`ReviewCorrectionStore::correct_receipt_line`], the one place that
/// writes the line, the cache, and the audit row as a single transaction.
#[async_trait]
pub trait ReviewProjection: Send + Sync {
    async fn list(&self, filters: ReviewableFilters) -> Result<Vec<Reviewable>, ReviewError>;
    async fn get(&self, id: &str) -> Result<Option<Reviewable>, ReviewError>;
}
