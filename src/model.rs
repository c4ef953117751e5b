//! Core domain types shared across parsing, categorization, persistence
//! and review (spec §3).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationWarning;
use crate::ocr::{BoundingBox, OcrMethod};

pub type ReceiptId = Uuid;
pub type LineId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Pwa,
    Email,
    Drive,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Processing,
    ReviewRequired,
    Approved,
    Posted,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Item,
    Discount,
    Deposit,
    Fee,
    Subtotal,
    Tax,
    Total,
}

/// Per-line tax treatment (spec glossary: "Tax flag").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxFlag {
    /// Taxable.
    Y,
    /// Zero-rated.
    Z,
    /// Exempt.
    N,
}

/// The canonical, post-parse receipt shape a [`crate::parsers::VendorParser`]
/// produces (spec glossary: "ReceiptNormalized").
#[derive(Debug, Clone)]
pub struct NormalizedReceipt {
    pub vendor_guess: String,
    pub purchase_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
    pub is_bill: bool,
    pub payment_terms: Option<String>,
    pub lines: Vec<ParsedLine>,
    pub validation_warnings: Vec<ValidationWarning>,
}

/// A line as it comes out of a parser, before Stage 1/Stage 2
/// categorization has run.
#[derive(Debug, Clone)]
pub struct ParsedLine {
    pub line_index: u32,
    pub line_type: LineType,
    pub sku: Option<String>,
    pub upc: Option<String>,
    pub raw_text: String,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub line_total: Decimal,
    pub tax_flag: TaxFlag,
    pub tax_amount: Option<Decimal>,
}

/// A receipt line after Stage 1 (recognizer) and Stage 2 (account mapper)
/// have filled in the classification fields.
#[derive(Debug, Clone)]
pub struct ReceiptLine {
    pub id: LineId,
    pub line_index: u32,
    pub line_type: LineType,
    pub sku: Option<String>,
    pub upc: Option<String>,
    pub raw_text: String,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub line_total: Decimal,
    pub tax_flag: TaxFlag,
    pub tax_amount: Option<Decimal>,

    pub normalized_description: Option<String>,
    pub product_category: Option<String>,
    pub account_code: Option<String>,
    pub brand: Option<String>,
    pub confidence: Option<f64>,
    pub requires_review: bool,
    pub ai_cost_usd: Option<Decimal>,
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone)]
pub struct ReceiptHeader {
    pub id: ReceiptId,
    pub source: Source,
    pub vendor_guess: String,
    pub purchase_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
    pub is_bill: bool,
    pub payment_terms: Option<String>,
    pub ocr_method: OcrMethod,
    pub ocr_confidence: f32,
    pub page_count: u32,
    pub status: ReceiptStatus,
}
