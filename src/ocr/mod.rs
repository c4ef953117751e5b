//! OCR provider layer (spec §4.1): one operation, `extract_text`, backed by
//! a strategy that picks the right concrete provider for the file type.

mod pdf_text;
mod strategy;
mod tesseract;
mod textract;

pub use strategy::OcrStrategy;

use async_trait::async_trait;
use std::path::Path;

/// One line Textract/Tesseract recovered, with page-normalized `[0,1]`
/// coordinates. Providers that natively emit pixel coordinates convert
/// before returning (spec §9 Open Question (c)).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub page: u32,
    pub line_number: u32,
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Which concrete path produced the text, persisted on the receipt row as
/// `ocr_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrMethod {
    Textract,
    Tesseract,
    PdfTextExtraction,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OcrOutput {
    pub text: String,
    /// Overall confidence in `[0, 1]`.
    pub confidence: f32,
    pub method: OcrMethod,
    pub page_count: u32,
    pub bounding_boxes: Vec<BoundingBox>,
}

/// Fatal-tier OCR failures. A `bounding_boxes_unavailable` or
/// `ocr_low_confidence` condition is never represented here — those are
/// Degraded and surface as a [`crate::error::ValidationWarning`] instead,
/// never as an `Err`.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("no OCR provider available for this file type")]
    Unavailable,

    #[error("all OCR strategies were exhausted without recovering text")]
    Failed,

    #[error("provider I/O error: {0}")]
    Io(String),

    #[error("provider timed out after {0}s")]
    Timeout(u64),
}

/// A single OCR backend. Implementations are stateless with respect to
/// individual calls; the strategy owns their lifecycle.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<OcrOutput, OcrError>;
}

pub use pdf_text::PdfTextProvider;
pub use tesseract::TesseractProvider;
pub use textract::TextractProvider;
