//! Shared error types and the closed validation-warning taxonomy (spec §7).
//!
//! The pipeline recognizes three severity tiers. Only **Fatal** conditions
//! become an `Err` from `process_receipt`; **Degraded** conditions are
//! folded into a [`ValidationWarning`] and the receipt proceeds into
//! `review_required`; **Informational** conditions are only logged via
//! `tracing`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of warning types a receipt can accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    SubtotalMismatch,
    TotalMismatch,
    PriceParseFailed,
    DateParseFailed,
    VendorUnknown,
    RecognizerTimeout,
    RecognizerOutputInvalid,
    OcrLowConfidence,
    BoundingBoxesUnavailable,
}

/// One structured, non-fatal parse problem attached to a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    pub data: Value,
}

impl ValidationWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>, data: Value) -> Self {
        Self {
            kind,
            message: message.into(),
            data,
        }
    }
}

/// Fatal conditions: OCR produced no text via any strategy, a repository
/// write failed, or the caller cancelled. Only these abort a receipt; the
/// receipt transitions to `failed` and no lines are persisted.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("ocr failed: {0}")]
    Ocr(#[from] crate::ocr::OcrError),

    #[error("repository failed: {0}")]
    Repository(#[from] crate::repository::RepositoryError),

    #[error("no line items could be recovered from the receipt")]
    Parse(#[from] crate::parsers::ParseError),

    #[error("receipt processing cancelled")]
    Cancelled,
}
