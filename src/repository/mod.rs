//! Receipt repository (spec §4.7): entity-routed persistence, one
//! transaction per receipt.

pub mod postgres;

pub use postgres::PostgresReceiptRepository;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::entity::Entity;
use crate::error::ValidationWarning;
use crate::model::{LineId, ReceiptHeader, ReceiptId, ReceiptLine};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository storage error: {0}")]
    Storage(String),
    #[error("receipt {0} not found")]
    NotFound(ReceiptId),
}

#[derive(Debug, Clone, Default)]
pub struct ReviewFilters {
    pub vendor: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub max_confidence: Option<f64>,
}

/// Fields a human reviewer may overwrite on a persisted line (spec §4.7,
/// §4.8). Any `None` field is left unchanged.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LineCategorizationUpdate {
    pub normalized_description: Option<String>,
    pub product_category: Option<String>,
    pub account_code: Option<String>,
    pub brand: Option<String>,
    pub requires_review: Option<bool>,
}

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    /// Insert or update the receipt row; warnings are stored as a JSON
    /// array on the row.
    async fn save_receipt(
        &self,
        entity: Entity,
        header: &ReceiptHeader,
        warnings: &[ValidationWarning],
    ) -> Result<(), RepositoryError>;

    /// Insert all lines transactionally. Idempotent per
    /// `(receipt_id, line_index)`.
    async fn save_lines(
        &self,
        entity: Entity,
        receipt_id: ReceiptId,
        lines: &[ReceiptLine],
    ) -> Result<(), RepositoryError>;

    async fn get_lines_for_review(
        &self,
        entity: Entity,
        filters: ReviewFilters,
    ) -> Result<Vec<ReceiptLine>, RepositoryError>;

    /// Updates only the receipt line; it does not touch the
    /// categorization cache or the audit log and commits on its own. The
    /// feedback edge that must apply all three atomically is
    /// [`crate::review::ReviewCorrectionStore::correct_receipt_line`] —
    /// callers correcting a line through review should use that instead
    /// of calling this method directly.
    async fn update_line_categorization(
        &self,
        entity: Entity,
        line_id: LineId,
        fields: LineCategorizationUpdate,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<R: ReceiptRepository + ?Sized> ReceiptRepository for std::sync::Arc<R> {
    async fn save_receipt(
        &self,
        entity: Entity,
        header: &ReceiptHeader,
        warnings: &[ValidationWarning],
    ) -> Result<(), RepositoryError> {
        (**self).save_receipt(entity, header, warnings).await
    }

    async fn save_lines(
        &self,
        entity: Entity,
        receipt_id: ReceiptId,
        lines: &[ReceiptLine],
    ) -> Result<(), RepositoryError> {
        (**self).save_lines(entity, receipt_id, lines).await
    }

    async fn get_lines_for_review(
        &self,
        entity: Entity,
        filters: ReviewFilters,
    ) -> Result<Vec<ReceiptLine>, RepositoryError> {
        (**self).get_lines_for_review(entity, filters).await
    }

    async fn update_line_categorization(
        &self,
        entity: Entity,
        line_id: LineId,
        fields: LineCategorizationUpdate,
    ) -> Result<(), RepositoryError> {
        (**self).update_line_categorization(entity, line_id, fields).await
    }
}
