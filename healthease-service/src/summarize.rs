use async_trait::async_trait;
use care_flow::{RemoteApiError, Summarizer};
use serde_json::Value;
use tracing::info;

use crate::llm::{ChatCompletionClient, CompletionOptions};

pub const TARGET_LANGUAGE: &str = "Hindi";

/// The one fixed instruction sent for every report.
pub fn build_summary_prompt(text: &str) -> String {
    format!(
        "Summarize the following medical report in simple language and translate into {}:\n\n{}",
        TARGET_LANGUAGE, text
    )
}

/// Summarizes and translates report text with a single chat completion.
///
/// No caching: the same text summarized twice is two remote calls.
pub struct ChatCompletionSummarizer {
    client: ChatCompletionClient,
    model: String,
    temperature: f64,
}

impl ChatCompletionSummarizer {
    pub fn new(client: ChatCompletionClient, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl Summarizer for ChatCompletionSummarizer {
    async fn summarize_and_translate(&self, text: &str) -> Result<String, RemoteApiError> {
        let prompt = build_summary_prompt(text);
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: None,
        };

        let summary = self
            .client
            .complete(&self.model, Value::String(prompt), &options)
            .await?;

        info!(
            model = %self.model,
            input_characters = text.chars().count(),
            summary_characters = summary.chars().count(),
            "Generated summary and translation"
        );
        Ok(summary)
    }
}
