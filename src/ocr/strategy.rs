//! The OCR strategy object (the "factory" of spec §4.1): a single
//! long-lived instance that picks the right provider by file type,
//! constructing providers lazily on first use.

use std::path::Path;
use std::sync::{Arc, OnceLock};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{OcrError, OcrOutput, OcrProvider, PdfTextProvider, TesseractProvider, TextractProvider};
use crate::config::PipelineConfig;

const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "heif", "tiff", "tif", "bmp"];

fn is_pdf(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("pdf")).unwrap_or(false)
}

fn is_raster(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| RASTER_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub struct OcrStrategy {
    config: PipelineConfig,
    textract: OnceCell<Option<Arc<TextractProvider>>>,
    tesseract: OnceLock<Option<Arc<TesseractProvider>>>,
    pdf_text: Arc<PdfTextProvider>,
}

impl OcrStrategy {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            textract: OnceCell::new(),
            tesseract: OnceLock::new(),
            pdf_text: Arc::new(PdfTextProvider::new()),
        }
    }

    async fn textract(&self) -> Option<Arc<TextractProvider>> {
        if !self.config.textract_enabled {
            return None;
        }
        self.textract
            .get_or_init(|| async {
                Some(Arc::new(TextractProvider::new(&self.config.textract_region).await))
            })
            .await
            .clone()
    }

    fn tesseract(&self) -> Option<Arc<TesseractProvider>> {
        self.tesseract
            .get_or_init(|| match TesseractProvider::new() {
                Ok(p) => Some(Arc::new(p)),
                Err(_) => None,
            })
            .clone()
    }

    /// Extract text from `path`, following the per-file-type strategy from
    /// spec §4.1: images go straight to Textract; PDFs try the direct text
    /// layer, then Tesseract (gated on confidence), then Textract.
    pub async fn extract_text(&self, path: &Path) -> Result<OcrOutput, OcrError> {
        if is_raster(path) {
            return match self.textract().await {
                Some(provider) => provider.extract_text(path).await.map_err(|e| {
                    warn!(error = %e, "textract errored, treating as unavailable");
                    OcrError::Unavailable
                }),
                None => Err(OcrError::Unavailable),
            };
        }

        if is_pdf(path) {
            if let Ok(output) = self.pdf_text.extract_text(path).await {
                if !output.text.trim().is_empty() {
                    debug!("recovered text directly from PDF text layer");
                    return Ok(output);
                }
            }

            if let Some(tesseract) = self.tesseract() {
                let min_confidence = self.config.tesseract_min_confidence as f32;
                match tesseract.extract_text(path).await {
                    Ok(output) if output.confidence >= min_confidence => {
                        info!(confidence = output.confidence, "tesseract met confidence gate");
                        return Ok(output);
                    }
                    Ok(output) => {
                        warn!(
                            confidence = output.confidence,
                            threshold = min_confidence,
                            "tesseract below confidence gate, falling back to textract"
                        );
                    }
                    Err(e) => warn!(error = %e, "tesseract failed, falling back to textract"),
                }
            }

            return match self.textract().await {
                Some(provider) => provider.extract_text(path).await,
                None => Err(OcrError::Failed),
            };
        }

        Err(OcrError::Unavailable)
    }
}

/// Lets a [`Pipeline`](crate::pipeline::Pipeline) hold the strategy behind
/// the same `dyn OcrProvider` trait object a test fake implements, so
/// scenario tests can swap in fixed text/bounding boxes without touching
/// Textract, Tesseract, or a real PDF.
#[async_trait]
impl OcrProvider for OcrStrategy {
    async fn extract_text(&self, path: &Path) -> Result<OcrOutput, OcrError> {
        OcrStrategy::extract_text(self, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_file_types() {
        assert!(is_raster(Path::new("a.jpg")));
        assert!(is_raster(Path::new("a.HEIC")));
        assert!(is_pdf(Path::new("a.pdf")));
        assert!(!is_pdf(Path::new("a.jpg")));
        assert!(!is_raster(Path::new("a.pdf")));
    }
}
