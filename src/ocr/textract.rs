//! Amazon Textract provider: rasters (JPG/PNG/HEIC/HEIF/TIFF/BMP) and
//! single-page PDFs. HEIC/HEIF are transcoded to PNG before dispatch (spec
//! §4.1). Required for images — there is no image fallback.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{BoundingBox, OcrError, OcrMethod, OcrOutput, OcrProvider};

pub struct TextractProvider {
    client: aws_sdk_textract::Client,
}

impl TextractProvider {
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_textract::config::Region::new(region.to_string()))
            .load()
            .await;
        Self {
            client: aws_sdk_textract::Client::new(&config),
        }
    }
}

#[async_trait]
impl OcrProvider for TextractProvider {
    async fn extract_text(&self, path: &Path) -> Result<OcrOutput, OcrError> {
        let bytes = transcode_if_needed(path).await?;

        let blob = aws_sdk_textract::primitives::Blob::new(bytes);
        let document = aws_sdk_textract::types::Document::builder().bytes(blob).build();

        let response = self
            .client
            .detect_document_text()
            .document(document)
            .send()
            .await
            .map_err(|e| OcrError::Io(e.to_string()))?;

        let blocks = response.blocks();
        let mut lines = Vec::new();
        let mut boxes = Vec::new();
        let mut confidences = Vec::new();

        for block in blocks {
            if block.block_type() != Some(&aws_sdk_textract::types::BlockType::Line) {
                continue;
            }
            let text = block.text().unwrap_or_default().to_string();
            if let Some(conf) = block.confidence() {
                confidences.push(conf / 100.0);
            }
            if let Some(geometry) = block.geometry() {
                if let Some(bbox) = geometry.bounding_box() {
                    boxes.push(BoundingBox {
                        page: block.page().unwrap_or(1) as u32,
                        line_number: boxes.len() as u32,
                        text: text.clone(),
                        left: bbox.left().unwrap_or_default(),
                        top: bbox.top().unwrap_or_default(),
                        width: bbox.width().unwrap_or_default(),
                        height: bbox.height().unwrap_or_default(),
                    });
                } else {
                    warn!("textract line with no bounding box");
                }
            }
            lines.push(text);
        }

        if lines.is_empty() {
            return Err(OcrError::Failed);
        }

        let confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f32>() / confidences.len() as f32
        };

        Ok(OcrOutput {
            text: lines.join("\n"),
            confidence,
            method: OcrMethod::Textract,
            page_count: 1,
            bounding_boxes: boxes,
        })
    }
}

fn is_heic(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("heic") | Some("heif")
    )
}

async fn transcode_if_needed(path: &Path) -> Result<Vec<u8>, OcrError> {
    let path = path.to_path_buf();
    if is_heic(&path) {
        tokio::task::spawn_blocking(move || transcode_heic_to_png(&path))
            .await
            .map_err(|e| OcrError::Io(e.to_string()))?
    } else {
        tokio::fs::read(&path).await.map_err(|e| OcrError::Io(e.to_string()))
    }
}

fn transcode_heic_to_png(path: &PathBuf) -> Result<Vec<u8>, OcrError> {
    let img = image::open(path).map_err(|e| OcrError::Io(e.to_string()))?;
    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageOutputFormat::Png)
        .map_err(|e| OcrError::Io(e.to_string()))?;
    Ok(out)
}
