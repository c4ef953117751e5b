//! The append-only review-activity log (spec §3 "ReviewActivity"): every
//! `approve | reject | correct | snooze | needs_info` action taken against
//! a [`super::Reviewable`] is recorded here, independent of which domain
//! table the reviewable's `correct` action ends up writing to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::ReviewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
    Correct,
    Snooze,
    NeedsInfo,
}

impl ReviewAction {
    fn as_str(self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::Correct => "correct",
            ReviewAction::Snooze => "snooze",
            ReviewAction::NeedsInfo => "needs_info",
        }
    }
}

/// One row as read back from the log.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewActivity {
    pub reviewable_id: String,
    pub action: ReviewAction,
    pub actor: String,
    pub reason: Option<String>,
    pub payload: Value,
    pub at: DateTime<Utc>,
}

/// Fields supplied when appending a new activity row; `at` is assigned by
/// the log, not the caller.
#[derive(Debug, Clone)]
pub struct NewReviewActivity {
    pub reviewable_id: String,
    pub action: ReviewAction,
    pub actor: String,
    pub reason: Option<String>,
    pub payload: Value,
}

#[async_trait]
pub trait ReviewActivityLog: Send + Sync {
    async fn record(&self, activity: NewReviewActivity) -> Result<(), ReviewError>;
}

#[async_trait]
impl<L: ReviewActivityLog + ?Sized> ReviewActivityLog for std::sync::Arc<L> {
    async fn record(&self, activity: NewReviewActivity) -> Result<(), ReviewError> {
        (**self).record(activity).await
    }
}

pub struct PostgresReviewActivityLog {
    pool: sqlx::PgPool,
}

impl PostgresReviewActivityLog {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewActivityLog for PostgresReviewActivityLog {
    async fn record(&self, activity: NewReviewActivity) -> Result<(), ReviewError> {
        sqlx::query(
            r#"
            INSERT INTO review.review_activity
                (reviewable_id, action, actor, reason, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, now())
            "#,
        )
        .bind(&activity.reviewable_id)
        .bind(activity.action.as_str())
        .bind(&activity.actor)
        .bind(&activity.reason)
        .bind(&activity.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| ReviewError::Storage(e.to_string()))?;

        Ok(())
    }
}
