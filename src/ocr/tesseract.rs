//! Local Tesseract OCR: PDFs only, rasterized at 300 DPI per page. Optional
//! dependency (feature `tesseract`); the strategy skips this provider
//! entirely when it was not compiled in or fails to initialize.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{BoundingBox, OcrError, OcrMethod, OcrOutput, OcrProvider};

const RASTER_DPI: u32 = 300;

pub struct TesseractProvider;

impl TesseractProvider {
    pub fn new() -> Result<Self, OcrError> {
        #[cfg(feature = "tesseract")]
        {
            // Constructing a throwaway instance validates the tessdata path
            // is reachable without holding it across the async boundary.
            leptess::LepTess::new(None, "eng").map_err(|e| OcrError::Io(e.to_string()))?;
            Ok(Self)
        }
        #[cfg(not(feature = "tesseract"))]
        {
            Err(OcrError::Unavailable)
        }
    }
}

#[async_trait]
impl OcrProvider for TesseractProvider {
    async fn extract_text(&self, path: &Path) -> Result<OcrOutput, OcrError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || ocr_pdf(&path))
            .await
            .map_err(|e| OcrError::Io(e.to_string()))?
    }
}

#[cfg(feature = "tesseract")]
fn ocr_pdf(path: &PathBuf) -> Result<OcrOutput, OcrError> {
    use pdfium_render::prelude::*;

    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| OcrError::Io(e.to_string()))?;

    let render_config = PdfRenderConfig::new().set_target_width(
        (8.5 * RASTER_DPI as f32) as i32,
    );

    let mut pages_text = Vec::new();
    let mut page_confidences = Vec::new();

    for page in document.pages().iter() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| OcrError::Io(e.to_string()))?;
        let image = bitmap.as_image();

        let mut lt = leptess::LepTess::new(None, "eng").map_err(|e| OcrError::Io(e.to_string()))?;
        let mut buf = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageOutputFormat::Png)
            .map_err(|e| OcrError::Io(e.to_string()))?;
        lt.set_image_from_mem(&buf).map_err(|e| OcrError::Io(e.to_string()))?;

        let text = lt.get_utf8_text().map_err(|e| OcrError::Io(e.to_string()))?;
        let confidence = lt.mean_text_conf();
        pages_text.push(text);
        page_confidences.push(confidence as f32 / 100.0);
    }

    if pages_text.is_empty() {
        return Err(OcrError::Failed);
    }

    let confidence = page_confidences.iter().sum::<f32>() / page_confidences.len() as f32;

    Ok(OcrOutput {
        page_count: pages_text.len() as u32,
        text: pages_text.join("\n\f\n"),
        confidence,
        method: OcrMethod::Tesseract,
        // leptess only exposes word-level boxes; a per-line mapping would
        // need to re-segment words back into lines before converting
        // pixel space to [0,1], so this provider reports none rather than
        // risk silently-wrong coordinates.
        bounding_boxes: Vec::new(),
    })
}

#[cfg(not(feature = "tesseract"))]
fn ocr_pdf(_path: &PathBuf) -> Result<OcrOutput, OcrError> {
    Err(OcrError::Unavailable)
}
