use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use care_flow::{ExtractionError, TextExtractor, UploadKind, UploadedFile};
use image::{DynamicImage, ImageFormat};
use pdf2image::{PDF, Pages};
use serde_json::{Value, json};
use std::io::{Cursor, ErrorKind};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{OcrBackend, OcrConfig, ServiceConfig};
use crate::llm::{ChatCompletionClient, CompletionOptions};

/// Reply the vision model is told to give for a page without text.
const NO_TEXT_MARKER: &str = "NO_TEXT";

/// Decode an upload into one image per page. PNG/JPEG give a single page; PDFs are
/// rendered page by page.
pub async fn decode_pages(file: &UploadedFile) -> Result<Vec<DynamicImage>, ExtractionError> {
    let bytes = file.bytes.clone();
    let kind = file.kind;

    let pages = tokio::task::spawn_blocking(move || -> Result<Vec<DynamicImage>, ExtractionError> {
        match kind {
            UploadKind::Png | UploadKind::Jpeg => image::load_from_memory(&bytes)
                .map(|image| vec![image])
                .map_err(|e| ExtractionError::ImageDecode(e.to_string())),
            UploadKind::Pdf => {
                let pdf = PDF::from_bytes(bytes.to_vec())
                    .map_err(|e| ExtractionError::ImageDecode(format!("Failed to load PDF: {}", e)))?;
                pdf.render(Pages::All, None).map_err(|e| {
                    ExtractionError::ImageDecode(format!("Failed to render PDF pages: {}", e))
                })
            }
        }
    })
    .await
    .map_err(|e| ExtractionError::Ocr(format!("Decoding task failed: {}", e)))??;

    if pages.is_empty() {
        return Err(ExtractionError::ImageDecode(
            "No pages found in uploaded file".to_string(),
        ));
    }

    debug!(file_name = %file.file_name, pages = pages.len(), "Decoded upload");
    Ok(pages)
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ExtractionError> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ExtractionError::ImageDecode(format!("Failed to encode image: {}", e)))?;
    Ok(buffer)
}

/// Join per-page transcriptions; tesseract ends every page with a form feed.
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.trim_end_matches(['\u{c}', '\n', ' ']))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// OCR through the `tesseract` command-line tool, one process per page.
pub struct TesseractExtractor {
    command: String,
    language: String,
}

impl TesseractExtractor {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    async fn recognize(&self, png: Vec<u8>) -> Result<String, ExtractionError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", self.language.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ExtractionError::Ocr(format!(
                    "tesseract executable '{}' not found",
                    self.command
                )),
                _ => ExtractionError::Ocr(format!("Failed to start tesseract: {}", e)),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractionError::Ocr("tesseract stdin unavailable".to_string()))?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExtractionError::Ocr(format!("tesseract did not finish: {}", e)))?;
        let sent = writer
            .await
            .map_err(|e| ExtractionError::Ocr(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        sent.map_err(|e| ExtractionError::Ocr(format!("Failed to send image to tesseract: {}", e)))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn extract_text(&self, file: &UploadedFile) -> Result<String, ExtractionError> {
        let pages = decode_pages(file).await?;

        let mut texts = Vec::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            let text = self.recognize(encode_png(page)?).await?;
            debug!(page = i + 1, characters = text.len(), "tesseract page done");
            texts.push(text);
        }

        Ok(join_pages(&texts))
    }
}

/// OCR by sending the page images to a vision-capable chat model in one call.
pub struct LlmVisionExtractor {
    client: ChatCompletionClient,
    model: String,
}

impl LlmVisionExtractor {
    pub fn new(client: ChatCompletionClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

fn vision_instruction(page_count: usize) -> String {
    let layout = if page_count > 1 {
        format!(
            "You will receive {} pages. Start each page with '=== Page X ===' as a header, then its text.",
            page_count
        )
    } else {
        "You will receive one page.".to_string()
    };

    format!(
        "You are an expert medical document OCR system. {} \
        Extract ALL text with perfect accuracy, preserving medical terminology. \
        Return ONLY the extracted text without any commentary. \
        If the image contains no text at all, reply with exactly {}.",
        layout, NO_TEXT_MARKER
    )
}

#[async_trait]
impl TextExtractor for LlmVisionExtractor {
    fn name(&self) -> &str {
        "llm-vision"
    }

    async fn extract_text(&self, file: &UploadedFile) -> Result<String, ExtractionError> {
        let pages = decode_pages(file).await?;

        let mut content = vec![json!({
            "type": "text",
            "text": vision_instruction(pages.len())
        })];
        for page in &pages {
            content.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:image/png;base64,{}", STANDARD.encode(encode_png(page)?))
                }
            }));
        }

        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(4000),
        };
        let text = self
            .client
            .complete(&self.model, Value::Array(content), &options)
            .await?;

        if text.trim() == NO_TEXT_MARKER {
            return Ok(String::new());
        }
        Ok(text)
    }
}

/// Pick the OCR backend named in the config.
pub fn build_extractor(config: &ServiceConfig, client: &ChatCompletionClient) -> Arc<dyn TextExtractor> {
    let OcrConfig {
        backend,
        tesseract_cmd,
        language,
    } = &config.ocr;

    let extractor: Arc<dyn TextExtractor> = match backend {
        OcrBackend::Tesseract => Arc::new(TesseractExtractor::new(tesseract_cmd, language)),
        OcrBackend::LlmVision => Arc::new(LlmVisionExtractor::new(
            client.clone(),
            config.llm.vision_model.clone(),
        )),
    };
    info!(backend = extractor.name(), "OCR backend selected");
    extractor
}
