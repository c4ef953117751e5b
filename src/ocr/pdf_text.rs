//! Direct text-layer extraction for text-bearing PDFs. Confidence is always
//! `1.0` and `method` is always [`OcrMethod::PdfTextExtraction`] (spec §4.1).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{BoundingBox, OcrError, OcrMethod, OcrOutput, OcrProvider};

#[derive(Default)]
pub struct PdfTextProvider;

impl PdfTextProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OcrProvider for PdfTextProvider {
    async fn extract_text(&self, path: &Path) -> Result<OcrOutput, OcrError> {
        let path = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || extract_text_layer(&path))
            .await
            .map_err(|e| OcrError::Io(e.to_string()))??;

        if text.trim().is_empty() {
            return Err(OcrError::Failed);
        }

        Ok(OcrOutput {
            page_count: text.matches('\u{c}').count().max(1) as u32,
            text,
            confidence: 1.0,
            method: OcrMethod::PdfTextExtraction,
            // The text layer carries no per-line geometry.
            bounding_boxes: Vec::new(),
        })
    }
}

#[cfg(feature = "pdf-parse")]
fn extract_text_layer(path: &PathBuf) -> Result<String, OcrError> {
    pdf_extract::extract_text(path).map_err(|e| OcrError::Io(e.to_string()))
}

#[cfg(not(feature = "pdf-parse"))]
fn extract_text_layer(_path: &PathBuf) -> Result<String, OcrError> {
    Err(OcrError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let provider = PdfTextProvider::new();
        let result = provider.extract_text(Path::new("/nonexistent.pdf")).await;
        assert!(result.is_err());
    }
}
