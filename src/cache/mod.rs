//! Categorization cache (spec §4.6): a single shared table keyed on
//! `(vendor_canonical, sku)` that lets repeat line items skip the LLM.

pub mod postgres;

pub use postgres::PostgresCategorizationCache;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::recognizer::ProductCategory;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub normalized_description: String,
    pub product_category: ProductCategory,
    pub brand: Option<String>,
    pub account_code: Option<String>,
    pub user_confidence: f64,
    pub times_seen: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Fields supplied when writing through a fresh recognizer result.
#[derive(Debug, Clone)]
pub struct NewProductMapping {
    pub normalized_description: String,
    pub product_category: ProductCategory,
    pub brand: Option<String>,
    pub account_code: Option<String>,
    pub user_confidence: f64,
}

/// The feedback-edge payload for a human correction (spec §4.8).
#[derive(Debug, Clone)]
pub struct CorrectedMapping {
    pub normalized_description: String,
    pub product_category: ProductCategory,
    pub brand: Option<String>,
    pub account_code: Option<String>,
}

#[async_trait]
pub trait CategorizationCache: Send + Sync {
    /// O(1) lookup by unique index. A hit bumps `times_seen`/`last_seen`
    /// atomically as part of the read (spec §4.4 step 1).
    async fn get(&self, vendor_canonical: &str, sku: &str) -> Result<Option<CachedEntry>, CacheError>;

    /// Upsert a fresh write-through entry. On conflict, increments
    /// `times_seen` and updates `last_seen`, leaving other fields
    /// unchanged — a human correction must go through [`correct`] instead.
    async fn put(&self, vendor_canonical: &str, sku: &str, entry: NewProductMapping) -> Result<(), CacheError>;

    /// Unconditional overwrite from a human correction. Sets
    /// `user_confidence = 1.0` and records a review-activity row in the
    /// same transaction (spec §4.6). Commits independently of any
    /// receipt-line write — the feedback edge that must apply both
    /// atomically goes through
    /// [`crate::review::ReviewCorrectionStore::correct_receipt_line`]
    /// instead of calling this method directly.
    async fn correct(
        &self,
        vendor_canonical: &str,
        sku: &str,
        entry: CorrectedMapping,
        actor: &str,
    ) -> Result<(), CacheError>;
}

#[async_trait::async_trait]
impl<C: CategorizationCache + ?Sized> CategorizationCache for std::sync::Arc<C> {
    async fn get(&self, vendor_canonical: &str, sku: &str) -> Result<Option<CachedEntry>, CacheError> {
        (**self).get(vendor_canonical, sku).await
    }

    async fn put(&self, vendor_canonical: &str, sku: &str, entry: NewProductMapping) -> Result<(), CacheError> {
        (**self).put(vendor_canonical, sku, entry).await
    }

    async fn correct(
        &self,
        vendor_canonical: &str,
        sku: &str,
        entry: CorrectedMapping,
        actor: &str,
    ) -> Result<(), CacheError> {
        (**self).correct(vendor_canonical, sku, entry, actor).await
    }
}
