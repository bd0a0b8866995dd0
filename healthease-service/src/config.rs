use anyhow::{Context, anyhow};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SUMMARY_TEMPERATURE: f64 = 0.5;
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrBackend {
    Tesseract,
    LlmVision,
}

impl FromStr for OcrBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(OcrBackend::Tesseract),
            "llm-vision" | "llm_vision" | "vision" => Ok(OcrBackend::LlmVision),
            other => Err(anyhow!(
                "Unknown OCR_BACKEND '{}' (expected 'tesseract' or 'llm-vision')",
                other
            )),
        }
    }
}

/// Settings for the remote chat-completion endpoint.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub summary_model: String,
    pub temperature: f64,
    pub vision_model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("summary_model", &self.summary_model)
            .field("temperature", &self.temperature)
            .field("vision_model", &self.vision_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub backend: OcrBackend,
    pub tesseract_cmd: String,
    pub language: String,
}

/// Everything the service reads from the environment, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub llm: LlmConfig,
    pub ocr: OcrConfig,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("OPENAI_API_KEY environment variable is required"))?;

        let llm = LlmConfig {
            api_key,
            base_url: lookup("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            summary_model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            temperature: parse_or(&lookup, "LLM_TEMPERATURE", DEFAULT_SUMMARY_TEMPERATURE)?,
            vision_model: lookup("OCR_VISION_MODEL")
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 60u64)?),
        };

        let ocr = OcrConfig {
            backend: parse_or(&lookup, "OCR_BACKEND", OcrBackend::Tesseract)?,
            tesseract_cmd: lookup("TESSERACT_CMD").unwrap_or_else(|| "tesseract".to_string()),
            language: lookup("OCR_LANG").unwrap_or_else(|| "eng".to_string()),
        };

        Ok(Self {
            llm,
            ocr,
            port: parse_or(&lookup, "PORT", 3000u16)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();

        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.summary_model, "gpt-3.5-turbo");
        assert_eq!(config.llm.temperature, 0.5);
        assert_eq!(config.llm.timeout, Duration::from_secs(60));
        assert_eq!(config.ocr.backend, OcrBackend::Tesseract);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        assert!(ServiceConfig::from_lookup(lookup_from(&[])).is_err());
        assert!(ServiceConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_BASE_URL", "http://127.0.0.1:9000/v1/"),
            ("OCR_BACKEND", "llm-vision"),
            ("LLM_TEMPERATURE", "0.7"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.llm.base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(config.ocr.backend, OcrBackend::LlmVision);
        assert_eq!(config.port, 8080);

        let err = ServiceConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_debug_output_hides_api_key() {
        let config = ServiceConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
