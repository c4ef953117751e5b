//! The single pipeline entry point (spec §5): `process_receipt`. One
//! receipt's steps run in strict order on one logical task; independent
//! receipts run concurrently behind whatever task runner the caller
//! provides. Cancellation is cooperative: dropping the returned future
//! abandons any in-flight suspension point (OCR I/O, LLM call, cache or
//! repository write) before the next step begins, and because the single
//! per-receipt transaction in [`crate::repository`] has not committed yet,
//! no partial state survives a cancellation.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::account_mapper::AccountMapper;
use crate::cache::CategorizationCache;
use crate::config::PipelineConfig;
use crate::entity::Entity;
use crate::error::{PipelineError, ValidationWarning, WarningKind};
use crate::model::{
    LineType, ReceiptHeader, ReceiptId, ReceiptLine, ReceiptStatus, Source,
};
use crate::ocr::{BoundingBox, OcrProvider, OcrStrategy};
use crate::parsers::text_cleanup::clean_description;
use crate::parsers::{
    AtlanticSuperstoreParser, CostcoParser, GenericParser, GfsParser, GrosnorParser,
    PepsiParser, PharmasaveParser, VendorParser, WalmartParser,
};
use crate::recognizer::{ItemRecognizer, LlmClient, RecognitionSource};
use crate::repository::ReceiptRepository;
use crate::vendor::VendorIdentifier;

/// Below this overall OCR confidence, the pipeline flags the receipt rather
/// than silently trusting a noisy read. Not in spec §6's closed config
/// table, so this is a fixed floor rather than a tunable knob.
const OCR_LOW_CONFIDENCE_THRESHOLD: f32 = 0.75;

/// Best-effort line ↔ bounding-box correlation: OCR providers emit one
/// bounding box per recovered text line in the same order the text itself
/// was joined from, so a parsed line's (cleaned) text is normally a
/// substring of the bounding box's raw line text (which still carries the
/// price/tax-code tokens a parser stripped off). Each box is claimed at
/// most once so two identical item descriptions don't collapse onto the
/// same box.
fn match_bounding_box(
    boxes: &[BoundingBox],
    raw_text: &str,
    used: &mut HashSet<usize>,
) -> Option<BoundingBox> {
    let needle = clean_description(raw_text).to_lowercase();
    if needle.is_empty() {
        return None;
    }
    boxes.iter().enumerate().find_map(|(i, b)| {
        if used.contains(&i) {
            return None;
        }
        let haystack = clean_description(&b.text).to_lowercase();
        if haystack.contains(&needle) {
            used.insert(i);
            Some(b.clone())
        } else {
            None
        }
    })
}

/// Outcome of one `process_receipt` call.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub receipt_id: ReceiptId,
    pub status: ReceiptStatus,
    pub lines_persisted: usize,
    pub requires_review: bool,
    pub total_ai_cost_usd: rust_decimal::Decimal,
    pub validation_warnings: Vec<ValidationWarning>,
}

/// Constructor-injected dependency bundle. Each dependency is a trait
/// object so callers can swap in fakes for testing without the pipeline
/// knowing about it.
pub struct Pipeline<C: CategorizationCache, L: LlmClient> {
    config: PipelineConfig,
    ocr: Box<dyn OcrProvider>,
    vendor_identifier: VendorIdentifier,
    parsers: HashMap<&'static str, Box<dyn VendorParser>>,
    generic_parser: GenericParser,
    recognizer: ItemRecognizer<C, L>,
    mapper: AccountMapper,
    repository: Box<dyn ReceiptRepository>,
}

impl<C: CategorizationCache, L: LlmClient> Pipeline<C, L> {
    pub fn new(
        config: PipelineConfig,
        cache: C,
        llm: L,
        repository: Box<dyn ReceiptRepository>,
    ) -> Self {
        let ocr: Box<dyn OcrProvider> = Box::new(OcrStrategy::new(config.clone()));
        Self::new_with_ocr(config, ocr, cache, llm, repository)
    }

    /// Same as [`Pipeline::new`] but with the OCR layer supplied by the
    /// caller rather than built from `config`. Tests use this to swap in a
    /// fake [`OcrProvider`] that returns scripted text/bounding boxes
    /// instead of calling Textract/Tesseract/a real PDF.
    pub fn new_with_ocr(
        config: PipelineConfig,
        ocr: Box<dyn OcrProvider>,
        cache: C,
        llm: L,
        repository: Box<dyn ReceiptRepository>,
    ) -> Self {
        let recognizer = ItemRecognizer::new(cache, llm, &config);
        let mapper = AccountMapper::new(&config);

        let mut parsers: HashMap<&'static str, Box<dyn VendorParser>> = HashMap::new();
        parsers.insert("walmart", Box::new(WalmartParser::new()));
        parsers.insert("costco", Box::new(CostcoParser::new()));
        parsers.insert("gfs", Box::new(GfsParser::new()));
        parsers.insert("grosnor", Box::new(GrosnorParser::new()));
        parsers.insert("atlantic_superstore", Box::new(AtlanticSuperstoreParser::new()));
        parsers.insert("pepsi", Box::new(PepsiParser::new()));
        parsers.insert("pharmasave", Box::new(PharmasaveParser::new()));

        Self {
            config,
            ocr,
            vendor_identifier: VendorIdentifier::new(),
            parsers,
            generic_parser: GenericParser::new(),
            recognizer,
            mapper,
            repository,
        }
    }

    #[instrument(skip(self), fields(receipt_id = %receipt_id, entity = %entity))]
    pub async fn process_receipt(
        &self,
        file_path: &Path,
        entity: Entity,
        receipt_id: ReceiptId,
        source: Source,
    ) -> Result<ProcessingResult, PipelineError> {
        let ocr_output = tokio::time::timeout(
            Duration::from_secs(self.config.ocr_call_timeout_s),
            self.ocr.extract_text(file_path),
        )
        .await
        .map_err(|_| PipelineError::Ocr(crate::ocr::OcrError::Timeout(self.config.ocr_call_timeout_s)))??;

        let mut warnings = Vec::new();
        if ocr_output.bounding_boxes.is_empty() {
            warnings.push(ValidationWarning::new(
                WarningKind::BoundingBoxesUnavailable,
                "ocr provider returned no bounding boxes",
                serde_json::json!({ "method": ocr_output.method }),
            ));
        }
        if ocr_output.confidence < OCR_LOW_CONFIDENCE_THRESHOLD {
            warnings.push(ValidationWarning::new(
                WarningKind::OcrLowConfidence,
                "overall ocr confidence below the review floor",
                serde_json::json!({
                    "confidence": ocr_output.confidence,
                    "threshold": OCR_LOW_CONFIDENCE_THRESHOLD,
                }),
            ));
        }

        let vendor_key = self.vendor_identifier.identify(&ocr_output.text);
        let generic: &dyn VendorParser = &self.generic_parser;
        let parser: &dyn VendorParser = vendor_key
            .and_then(|key| self.parsers.get(key))
            .map(|p| p.as_ref())
            .unwrap_or(generic);

        let normalized = parser.parse(&ocr_output.text, entity)?;
        warnings.extend(normalized.validation_warnings.clone());

        let vendor_canonical = parser.vendor_key().to_string();
        let mut lines = Vec::with_capacity(normalized.lines.len());
        let mut total_ai_cost = rust_decimal::Decimal::ZERO;
        let mut used_boxes = HashSet::new();

        for parsed_line in normalized.lines {
            let bounding_box =
                match_bounding_box(&ocr_output.bounding_boxes, &parsed_line.raw_text, &mut used_boxes);

            if !matches!(parsed_line.line_type, LineType::Item) {
                lines.push(ReceiptLine {
                    id: Uuid::new_v4(),
                    line_index: parsed_line.line_index,
                    line_type: parsed_line.line_type,
                    sku: parsed_line.sku,
                    upc: parsed_line.upc,
                    raw_text: parsed_line.raw_text,
                    quantity: parsed_line.quantity,
                    unit_price: parsed_line.unit_price,
                    line_total: parsed_line.line_total,
                    tax_flag: parsed_line.tax_flag,
                    tax_amount: parsed_line.tax_amount,
                    normalized_description: None,
                    product_category: None,
                    account_code: None,
                    brand: None,
                    confidence: None,
                    requires_review: false,
                    ai_cost_usd: None,
                    bounding_box,
                });
                continue;
            }

            let recognized = match self
                .recognizer
                .recognize(
                    &vendor_canonical,
                    parsed_line.sku.as_deref(),
                    &parsed_line.raw_text,
                    parsed_line.line_total,
                )
                .await
            {
                Ok(item) => item,
                Err(e) => {
                    warn!(error = %e, "recognizer call failed, degrading line to unknown");
                    crate::recognizer::degraded(RecognitionSource::DegradedInvalid)
                }
            };

            match recognized.source {
                RecognitionSource::DegradedTimeout => warnings.push(ValidationWarning::new(
                    WarningKind::RecognizerTimeout,
                    "item recognizer timed out",
                    serde_json::json!({ "raw_text": parsed_line.raw_text }),
                )),
                RecognitionSource::DegradedInvalid => warnings.push(ValidationWarning::new(
                    WarningKind::RecognizerOutputInvalid,
                    "item recognizer returned invalid output",
                    serde_json::json!({ "raw_text": parsed_line.raw_text }),
                )),
                _ => info!(
                    source = ?recognized.source,
                    confidence = recognized.confidence,
                    "recognized line item"
                ),
            }

            total_ai_cost += recognized.ai_cost_usd;

            let mapping = self.mapper.map(recognized.product_category, parsed_line.line_total);
            let requires_review = mapping.requires_review
                || recognized.confidence < self.config.categorization_review_threshold;

            lines.push(ReceiptLine {
                id: Uuid::new_v4(),
                line_index: parsed_line.line_index,
                line_type: parsed_line.line_type,
                sku: parsed_line.sku,
                upc: parsed_line.upc,
                raw_text: parsed_line.raw_text,
                quantity: parsed_line.quantity,
                unit_price: parsed_line.unit_price,
                line_total: parsed_line.line_total,
                tax_flag: parsed_line.tax_flag,
                tax_amount: parsed_line.tax_amount,
                normalized_description: Some(recognized.normalized_description),
                product_category: Some(recognized.product_category.as_code()),
                account_code: Some(mapping.account_code),
                brand: recognized.brand,
                confidence: Some(recognized.confidence),
                requires_review,
                ai_cost_usd: Some(recognized.ai_cost_usd),
                bounding_box,
            });
        }

        let receipt_requires_review = lines.iter().any(|l| l.requires_review) || !warnings.is_empty();
        let status = if receipt_requires_review {
            ReceiptStatus::ReviewRequired
        } else {
            ReceiptStatus::Approved
        };

        let header = ReceiptHeader {
            id: receipt_id,
            source,
            vendor_guess: normalized.vendor_guess,
            purchase_date: normalized.purchase_date,
            invoice_number: normalized.invoice_number,
            currency: normalized.currency,
            subtotal: normalized.subtotal,
            tax_total: normalized.tax_total,
            total: normalized.total,
            is_bill: normalized.is_bill,
            payment_terms: normalized.payment_terms,
            ocr_method: ocr_output.method,
            ocr_confidence: ocr_output.confidence,
            page_count: ocr_output.page_count,
            status,
        };

        self.repository.save_receipt(entity, &header, &warnings).await?;
        self.repository.save_lines(entity, receipt_id, &lines).await?;

        Ok(ProcessingResult {
            receipt_id,
            status,
            lines_persisted: lines.len(),
            requires_review: receipt_requires_review,
            total_ai_cost_usd: total_ai_cost,
            validation_warnings: warnings,
        })
    }
}
