//! The closed configuration surface from spec §6. No other knob exists;
//! adding one means updating this struct and this doc comment together.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    Auto,
    Textract,
    Tesseract,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ocr_backend: OcrBackend,
    pub textract_enabled: bool,
    pub textract_region: String,
    /// Confidence gate (`[0,1]`) for returning Tesseract output on PDFs.
    pub tesseract_min_confidence: f64,
    /// Flag items below this Stage-1 confidence for review.
    pub categorization_review_threshold: f64,
    /// Cache write only above this confidence.
    pub categorization_cache_write_threshold: f64,
    /// Equipment capitalization threshold, in the receipt's currency.
    pub capitalization_threshold: Decimal,
    pub ocr_call_timeout_s: u64,
    pub llm_call_timeout_s: u64,
    /// Off by default: target sites block automated access (glossary,
    /// "Web lookup").
    pub web_lookup_enabled: bool,
    pub web_lookup_timeout_s: u64,
    pub objects_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_backend: OcrBackend::Auto,
            textract_enabled: true,
            textract_region: "us-east-1".to_string(),
            tesseract_min_confidence: 0.96,
            categorization_review_threshold: 0.80,
            categorization_cache_write_threshold: 0.80,
            capitalization_threshold: dec!(2500.00),
            ocr_call_timeout_s: 60,
            llm_call_timeout_s: 30,
            web_lookup_enabled: false,
            web_lookup_timeout_s: 5,
            objects_root: PathBuf::from("./objects"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.tesseract_min_confidence, 0.96);
        assert_eq!(cfg.categorization_review_threshold, 0.80);
        assert_eq!(cfg.categorization_cache_write_threshold, 0.80);
        assert_eq!(cfg.capitalization_threshold, dec!(2500.00));
        assert_eq!(cfg.ocr_call_timeout_s, 60);
        assert_eq!(cfg.llm_call_timeout_s, 30);
        assert!(!cfg.web_lookup_enabled);
    }
}
