//! Action dispatch on a [`super::Reviewable`] (spec §4.8 point 3): the
//! single authoritative path a human decision takes, so the next receipt
//! from the same vendor benefits immediately (Design Note "Feedback edge").
//!
//! `correct` is the only action that touches the categorization cache —
//! approve/reject/snooze/needs_info only ever append to the activity log,
//! since this crate's repository contract has no receipt/line status
//! setter beyond `update_line_categorization` (status transitions after
//! human review belong to the review UI/task runner named out of scope in
//! spec §1).

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;

use crate::entity::Entity;
use crate::model::LineId;
use crate::recognizer::ProductCategory;
use crate::repository::LineCategorizationUpdate;

use super::activity::{NewReviewActivity, ReviewAction, ReviewActivityLog};
use super::ReviewError;

/// Everything needed to correct one `receipt_line_item` reviewable: the
/// line to update, the `(vendor, sku)` cache key it is keyed on (when the
/// line is cacheable), and who/why.
#[derive(Debug, Clone)]
pub struct CorrectReceiptLine {
    pub reviewable_id: String,
    pub entity: Entity,
    pub line_id: LineId,
    pub vendor_canonical: String,
    pub sku: Option<String>,
    pub fields: LineCategorizationUpdate,
    pub actor: String,
    pub reason: Option<String>,
}

/// The feedback edge's single authoritative write path (spec §4.7 "must
/// also call `cache.correct(...)` in the same transaction", §9): updates
/// the persisted line's categorization fields, writes through the
/// categorization cache when the line carries a SKU, and appends the audit
/// record, all as one atomic unit. [`ReceiptRepository::update_line_categorization`]
/// and [`CategorizationCache::correct`] each commit independently, so
/// composing calls to them cannot give this guarantee — implementors of
/// this trait own the transaction boundary directly.
///
/// [`ReceiptRepository::update_line_categorization`]: crate::repository::ReceiptRepository::update_line_categorization
/// [`CategorizationCache::correct`]: crate::cache::CategorizationCache::correct
#[async_trait]
pub trait ReviewCorrectionStore: Send + Sync {
    async fn correct_receipt_line(&self, request: CorrectReceiptLine) -> Result<(), ReviewError>;
}

#[async_trait]
impl<S: ReviewCorrectionStore + ?Sized> ReviewCorrectionStore for std::sync::Arc<S> {
    async fn correct_receipt_line(&self, request: CorrectReceiptLine) -> Result<(), ReviewError> {
        (**self).correct_receipt_line(request).await
    }
}

/// Backed by the same pool as [`crate::repository::postgres::PostgresReceiptRepository`]
/// and [`crate::cache::postgres::PostgresCategorizationCache`]; this store
/// does not call through those types, since each opens and commits its own
/// transaction. It inlines the equivalent statements against one
/// `sqlx::Transaction` instead, so a failure partway through rolls every
/// effect back rather than leaving the line corrected with a stale cache
/// entry or a missing audit row.
pub struct PostgresReviewCorrectionStore {
    pool: PgPool,
}

impl PostgresReviewCorrectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewCorrectionStore for PostgresReviewCorrectionStore {
    async fn correct_receipt_line(&self, request: CorrectReceiptLine) -> Result<(), ReviewError> {
        let mut tx = self.pool.begin().await.map_err(|e| ReviewError::Storage(e.to_string()))?;

        let line_sql = format!(
            r#"
            UPDATE {schema}.receipt_lines
               SET normalized_description = COALESCE($2, normalized_description),
                   product_category = COALESCE($3, product_category),
                   account_code = COALESCE($4, account_code),
                   brand = COALESCE($5, brand),
                   requires_review = COALESCE($6, requires_review)
             WHERE id = $1
            "#,
            schema = request.entity.schema(),
        );

        sqlx::query(&line_sql)
            .bind(request.line_id)
            .bind(&request.fields.normalized_description)
            .bind(&request.fields.product_category)
            .bind(&request.fields.account_code)
            .bind(&request.fields.brand)
            .bind(request.fields.requires_review)
            .execute(&mut *tx)
            .await
            .map_err(|e| ReviewError::Storage(e.to_string()))?;

        if let Some(sku) = &request.sku {
            let category = request
                .fields
                .product_category
                .as_deref()
                .and_then(ProductCategory::from_code)
                .unwrap_or(ProductCategory::Unknown);
            let normalized_description = request.fields.normalized_description.clone().unwrap_or_default();

            let cache_sql = r#"
                INSERT INTO product_mappings
                    (vendor_canonical, sku, normalized_description, product_category, brand,
                     account_code, user_confidence, times_seen, first_seen, last_seen)
                VALUES ($1, $2, $3, $4, $5, $6, 1.0, 1, now(), now())
                ON CONFLICT (vendor_canonical, sku) DO UPDATE
                    SET normalized_description = $3,
                        product_category = $4,
                        brand = $5,
                        account_code = $6,
                        user_confidence = 1.0,
                        last_seen = now()
            "#;

            sqlx::query(cache_sql)
                .bind(&request.vendor_canonical)
                .bind(sku)
                .bind(&normalized_description)
                .bind(category.as_code())
                .bind(&request.fields.brand)
                .bind(&request.fields.account_code)
                .execute(&mut *tx)
                .await
                .map_err(|e| ReviewError::Storage(e.to_string()))?;

            let cache_activity_sql = r#"
                INSERT INTO review_activity (vendor_canonical, sku, actor, action, created_at)
                VALUES ($1, $2, $3, 'correct', now())
            "#;

            sqlx::query(cache_activity_sql)
                .bind(&request.vendor_canonical)
                .bind(sku)
                .bind(&request.actor)
                .execute(&mut *tx)
                .await
                .map_err(|e| ReviewError::Storage(e.to_string()))?;
        }

        let payload = serde_json::to_value(&request.fields).unwrap_or_default();
        let activity_sql = r#"
            INSERT INTO review.review_activity
                (reviewable_id, action, actor, reason, payload, created_at)
            VALUES ($1, 'correct', $2, $3, $4, now())
        "#;

        sqlx::query(activity_sql)
            .bind(&request.reviewable_id)
            .bind(&request.actor)
            .bind(&request.reason)
            .bind(payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| ReviewError::Storage(e.to_string()))?;

        tx.commit().await.map_err(|e| ReviewError::Storage(e.to_string()))?;

        Ok(())
    }
}

/// Approve/reject/snooze/needs-info: no domain write, just the audit
/// trail. Status transitions these imply are materialized by the same
/// refresh mechanism that maintains `review.reviewable` (spec §4.8 point
/// 1), not by this crate.
pub async fn record_review_decision<A: ReviewActivityLog>(
    activity_log: &A,
    reviewable_id: String,
    action: ReviewAction,
    actor: String,
    reason: Option<String>,
) -> Result<(), ReviewError> {
    activity_log
        .record(NewReviewActivity {
            reviewable_id,
            action,
            actor,
            reason,
            payload: json!({}),
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A single in-process store standing in for the three-table write:
    /// since it runs under one `&self` call with no intervening await that
    /// yields to another correction, recording all three effects here is
    /// already atomic from callers' point of view — there's no need to
    /// simulate `sqlx::Transaction` rollback to exercise the dispatch
    /// logic this module owns.
    #[derive(Default)]
    struct InMemoryCorrectionStore {
        line_updates: Mutex<Vec<(LineId, LineCategorizationUpdate)>>,
        cache_corrections: Mutex<Vec<(String, String)>>,
        activity: Mutex<Vec<NewReviewActivity>>,
    }

    #[async_trait]
    impl ReviewCorrectionStore for InMemoryCorrectionStore {
        async fn correct_receipt_line(&self, request: CorrectReceiptLine) -> Result<(), ReviewError> {
            self.line_updates.lock().unwrap().push((request.line_id, request.fields.clone()));

            if let Some(sku) = &request.sku {
                self.cache_corrections.lock().unwrap().push((request.vendor_canonical.clone(), sku.clone()));
            }

            self.activity.lock().unwrap().push(NewReviewActivity {
                reviewable_id: request.reviewable_id,
                action: ReviewAction::Correct,
                actor: request.actor,
                reason: request.reason,
                payload: json!(request.fields),
            });

            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeActivityLog {
        recorded: Mutex<Vec<NewReviewActivity>>,
    }

    #[async_trait]
    impl ReviewActivityLog for FakeActivityLog {
        async fn record(&self, activity: NewReviewActivity) -> Result<(), ReviewError> {
            self.recorded.lock().unwrap().push(activity);
            Ok(())
        }
    }

    #[tokio::test]
    async fn correct_writes_through_line_cache_and_activity_together() {
        let store = InMemoryCorrectionStore::default();
        let line_id = LineId::new_v4();

        store
            .correct_receipt_line(CorrectReceiptLine {
                reviewable_id: "receipt_line_item:corp:abc".to_string(),
                entity: Entity::Corp,
                line_id,
                vendor_canonical: "costco".to_string(),
                sku: Some("54491".to_string()),
                fields: LineCategorizationUpdate {
                    product_category: Some("retail_snack".to_string()),
                    ..Default::default()
                },
                actor: "reviewer@example.com".to_string(),
                reason: Some("brand was wrong".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(store.line_updates.lock().unwrap().len(), 1);
        assert_eq!(store.cache_corrections.lock().unwrap().len(), 1);
        let recorded = store.activity.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(recorded[0].action, ReviewAction::Correct));
    }

    #[tokio::test]
    async fn correct_without_a_sku_never_touches_the_cache() {
        let store = InMemoryCorrectionStore::default();

        store
            .correct_receipt_line(CorrectReceiptLine {
                reviewable_id: "receipt_line_item:corp:xyz".to_string(),
                entity: Entity::Corp,
                line_id: LineId::new_v4(),
                vendor_canonical: "generic".to_string(),
                sku: None,
                fields: LineCategorizationUpdate::default(),
                actor: "reviewer@example.com".to_string(),
                reason: None,
            })
            .await
            .unwrap();

        assert!(store.cache_corrections.lock().unwrap().is_empty());
        assert_eq!(store.activity.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approve_only_appends_to_the_activity_log() {
        let activity_log = FakeActivityLog::default();
        record_review_decision(
            &activity_log,
            "receipt_line_item:corp:abc".to_string(),
            ReviewAction::Approve,
            "reviewer@example.com".to_string(),
            None,
        )
        .await
        .unwrap();

        let recorded = activity_log.recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(recorded[0].action, ReviewAction::Approve));
    }
}
