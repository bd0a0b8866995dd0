use care_flow::RemoteApiError;
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::LlmConfig;

/// Thin client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Every call sends a single user message and returns the first choice's content.
/// Failures are classified into [`RemoteApiError`]; nothing is retried here.
#[derive(Clone)]
pub struct ChatCompletionClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

/// Sampling options for one request.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self, RemoteApiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url),
            api_key: config.api_key.clone(),
        })
    }

    /// `content` is either a plain string or an array of typed parts (text / image_url).
    pub async fn complete(
        &self,
        model: &str,
        content: Value,
        options: &CompletionOptions,
    ) -> Result<String, RemoteApiError> {
        let mut payload = json!({
            "model": model,
            "messages": [
                {
                    "role": "user",
                    "content": content
                }
            ]
        });
        if let Some(temperature) = options.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }

        debug!(model = %model, endpoint = %self.endpoint, "Sending chat completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Chat completion request failed");
            return Err(classify_status(status, retry_after_secs, body));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| match classify_transport_error(e) {
                RemoteApiError::Network(msg) => RemoteApiError::Malformed(msg),
                other => other,
            })?;

        extract_content(&response_json)
    }
}

fn classify_transport_error(e: reqwest::Error) -> RemoteApiError {
    if e.is_timeout() {
        RemoteApiError::Timeout
    } else if e.is_decode() {
        RemoteApiError::Malformed(e.to_string())
    } else {
        RemoteApiError::Network(e.to_string())
    }
}

fn classify_status(status: StatusCode, retry_after_secs: Option<u64>, body: String) -> RemoteApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteApiError::Auth {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => RemoteApiError::RateLimit { retry_after_secs },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => RemoteApiError::Timeout,
        _ => RemoteApiError::Status {
            status: status.as_u16(),
            body: truncate(&body, 512),
        },
    }
}

fn extract_content(response_json: &Value) -> Result<String, RemoteApiError> {
    response_json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RemoteApiError::Malformed("missing choices[0].message.content".to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, None, String::new()),
            RemoteApiError::Auth { status: 401 }
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some(30), String::new()),
            RemoteApiError::RateLimit {
                retry_after_secs: Some(30)
            }
        );
        assert_eq!(
            classify_status(StatusCode::GATEWAY_TIMEOUT, None, String::new()),
            RemoteApiError::Timeout
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, None, "boom".to_string()),
            RemoteApiError::Status {
                status: 500,
                body: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_extract_content() {
        let ok = json!({"choices": [{"message": {"role": "assistant", "content": "hello"}}]});
        assert_eq!(extract_content(&ok).unwrap(), "hello");

        let missing = json!({"choices": []});
        assert!(matches!(
            extract_content(&missing),
            Err(RemoteApiError::Malformed(_))
        ));
    }
}
