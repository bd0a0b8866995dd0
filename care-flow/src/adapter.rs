use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{ExtractionError, RemoteApiError};
use crate::models::UploadedFile;

/// Turns an uploaded report into plain text.
///
/// A readable image with no text must produce an empty (or whitespace-only)
/// string, not an error.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    async fn extract_text(&self, file: &UploadedFile) -> Result<String, ExtractionError>;
}

/// Summarizes extracted report text in simple language and translates it.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize_and_translate(&self, text: &str) -> Result<String, RemoteApiError>;
}

/// The external collaborators a session needs to handle patient events.
#[derive(Clone)]
pub struct Adapters {
    pub extractor: Arc<dyn TextExtractor>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl Adapters {
    pub fn new(extractor: Arc<dyn TextExtractor>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            extractor,
            summarizer,
        }
    }
}
