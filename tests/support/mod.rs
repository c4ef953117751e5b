//! Hand-written fakes shared by the end-to-end scenario tests. No real
//! network or database calls happen anywhere in this module.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;

use receipt_ingestion_core::cache::{
    CacheError, CachedEntry, CategorizationCache, CorrectedMapping, NewProductMapping,
};
use receipt_ingestion_core::entity::Entity;
use receipt_ingestion_core::error::ValidationWarning;
use receipt_ingestion_core::model::{LineId, ReceiptHeader, ReceiptId, ReceiptLine};
use receipt_ingestion_core::ocr::{OcrError, OcrOutput, OcrProvider};
use receipt_ingestion_core::recognizer::{ClassifyRequest, ClassifyResponse, LlmClient, RecognizerError};
use receipt_ingestion_core::repository::{
    LineCategorizationUpdate, ReceiptRepository, RepositoryError, ReviewFilters,
};

/// An [`OcrProvider`] that returns one scripted [`OcrOutput`] regardless of
/// the path it is asked about, so scenario tests never touch Textract,
/// Tesseract, or a real PDF.
pub struct FakeOcrProvider {
    output: Mutex<Option<OcrOutput>>,
}

impl FakeOcrProvider {
    pub fn new(output: OcrOutput) -> Self {
        Self { output: Mutex::new(Some(output)) }
    }
}

#[async_trait]
impl OcrProvider for FakeOcrProvider {
    async fn extract_text(&self, _path: &Path) -> Result<OcrOutput, OcrError> {
        self.output.lock().unwrap().clone().ok_or(OcrError::Failed)
    }
}

/// An in-memory categorization cache keyed the same way the Postgres
/// implementation is: `(vendor_canonical, sku)`.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<(String, String), CachedEntry>>,
}

#[async_trait]
impl CategorizationCache for InMemoryCache {
    async fn get(&self, vendor_canonical: &str, sku: &str) -> Result<Option<CachedEntry>, CacheError> {
        let mut entries = self.entries.lock().unwrap();
        let key = (vendor_canonical.to_string(), sku.to_string());
        if let Some(entry) = entries.get_mut(&key) {
            entry.times_seen += 1;
            entry.last_seen = Utc::now();
            return Ok(Some(entry.clone()));
        }
        Ok(None)
    }

    async fn put(&self, vendor_canonical: &str, sku: &str, entry: NewProductMapping) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap();
        let key = (vendor_canonical.to_string(), sku.to_string());
        entries
            .entry(key)
            .and_modify(|e| {
                e.times_seen += 1;
                e.last_seen = Utc::now();
            })
            .or_insert_with(|| CachedEntry {
                normalized_description: entry.normalized_description.clone(),
                product_category: entry.product_category,
                brand: entry.brand.clone(),
                account_code: entry.account_code.clone(),
                user_confidence: entry.user_confidence,
                times_seen: 1,
                first_seen: Utc::now(),
                last_seen: Utc::now(),
            });
        Ok(())
    }

    async fn correct(
        &self,
        vendor_canonical: &str,
        sku: &str,
        entry: CorrectedMapping,
        _actor: &str,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap();
        let key = (vendor_canonical.to_string(), sku.to_string());
        let now = Utc::now();
        entries
            .entry(key)
            .and_modify(|e| {
                e.normalized_description = entry.normalized_description.clone();
                e.product_category = entry.product_category;
                e.brand = entry.brand.clone();
                e.account_code = entry.account_code.clone();
                e.user_confidence = 1.0;
                e.last_seen = now;
            })
            .or_insert_with(|| CachedEntry {
                normalized_description: entry.normalized_description.clone(),
                product_category: entry.product_category,
                brand: entry.brand.clone(),
                account_code: entry.account_code.clone(),
                user_confidence: 1.0,
                times_seen: 1,
                first_seen: now,
                last_seen: now,
            });
        Ok(())
    }
}

pub enum FakeLlmBehavior {
    Respond(ClassifyResponse),
    Timeout,
    Fail,
}

/// An [`LlmClient`] whose single canned response/behavior is set up ahead
/// of time by the test.
pub struct FakeLlmClient {
    behavior: Mutex<FakeLlmBehavior>,
    pub calls: Mutex<u32>,
}

impl FakeLlmClient {
    pub fn new(behavior: FakeLlmBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn classify_item(&self, _request: ClassifyRequest) -> Result<ClassifyResponse, RecognizerError> {
        *self.calls.lock().unwrap() += 1;
        match &*self.behavior.lock().unwrap() {
            FakeLlmBehavior::Respond(response) => Ok(ClassifyResponse {
                normalized_description: response.normalized_description.clone(),
                product_category: response.product_category.clone(),
                brand: response.brand.clone(),
                confidence: response.confidence,
                ai_cost_usd: response.ai_cost_usd,
            }),
            FakeLlmBehavior::Timeout => Err(RecognizerError::Timeout(30)),
            FakeLlmBehavior::Fail => Err(RecognizerError::CallFailed("fake failure".to_string())),
        }
    }
}

/// An in-memory repository recording everything `save_receipt`/`save_lines`
/// were called with, so a test can assert on persisted shape directly
/// instead of reaching for a real database.
#[derive(Default)]
pub struct InMemoryRepository {
    pub receipts: Mutex<HashMap<(Entity, ReceiptId), (ReceiptHeader, Vec<ValidationWarning>)>>,
    pub lines: Mutex<HashMap<(Entity, ReceiptId), Vec<ReceiptLine>>>,
}

#[async_trait]
impl ReceiptRepository for InMemoryRepository {
    async fn save_receipt(
        &self,
        entity: Entity,
        header: &ReceiptHeader,
        warnings: &[ValidationWarning],
    ) -> Result<(), RepositoryError> {
        self.receipts
            .lock()
            .unwrap()
            .insert((entity, header.id), (header.clone(), warnings.to_vec()));
        Ok(())
    }

    async fn save_lines(
        &self,
        entity: Entity,
        receipt_id: ReceiptId,
        lines: &[ReceiptLine],
    ) -> Result<(), RepositoryError> {
        self.lines.lock().unwrap().insert((entity, receipt_id), lines.to_vec());
        Ok(())
    }

    async fn get_lines_for_review(
        &self,
        entity: Entity,
        _filters: ReviewFilters,
    ) -> Result<Vec<ReceiptLine>, RepositoryError> {
        Ok(self
            .lines
            .lock()
            .unwrap()
            .iter()
            .filter(|((e, _), _)| *e == entity)
            .flat_map(|(_, lines)| lines.clone())
            .filter(|l| l.requires_review)
            .collect())
    }

    async fn update_line_categorization(
        &self,
        entity: Entity,
        line_id: LineId,
        fields: LineCategorizationUpdate,
    ) -> Result<(), RepositoryError> {
        let mut lines = self.lines.lock().unwrap();
        for receipt_lines in lines.values_mut() {
            for line in receipt_lines.iter_mut() {
                if line.id == line_id {
                    if let Some(v) = fields.normalized_description.clone() {
                        line.normalized_description = Some(v);
                    }
                    if let Some(v) = fields.product_category.clone() {
                        line.product_category = Some(v);
                    }
                    if let Some(v) = fields.account_code.clone() {
                        line.account_code = Some(v);
                    }
                    if let Some(v) = fields.brand.clone() {
                        line.brand = Some(v);
                    }
                    if let Some(v) = fields.requires_review {
                        line.requires_review = v;
                    }
                }
            }
        }
        let _ = entity;
        Ok(())
    }
}
