pub mod config;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod service;
pub mod summarize;
pub mod telemetry;

pub use config::{OcrBackend, ServiceConfig};
pub use service::{AppState, build_router, create_app};

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::config::LlmConfig;

    pub type Captured = Arc<Mutex<Vec<Value>>>;

    /// Local stand-in for a `/chat/completions` endpoint: records each request body and
    /// answers with `status` and `reply` after `delay`.
    pub async fn spawn_completion_stub(status: StatusCode, reply: Value, delay: Duration) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(
                    move |State(captured): State<Captured>, Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            captured.lock().unwrap().push(body);
                            tokio::time::sleep(delay).await;
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1", addr), captured)
    }

    pub fn test_llm_config(base_url: &str) -> LlmConfig {
        LlmConfig {
            api_key: "sk-test".to_string(),
            base_url: base_url.to_string(),
            summary_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.5,
            vision_model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}
