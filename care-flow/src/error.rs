use thiserror::Error;

use crate::session::Mode;

/// Classified failure of a call to the remote chat-completion API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteApiError {
    #[error("Remote API request timed out")]
    Timeout,

    #[error("Remote API rejected the credential (status {status})")]
    Auth { status: u16 },

    #[error("Remote API rate limit reached")]
    RateLimit { retry_after_secs: Option<u64> },

    #[error("Malformed response from remote API: {0}")]
    Malformed(String),

    #[error("Remote API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error talking to remote API: {0}")]
    Network(String),
}

impl RemoteApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteApiError::Timeout => "timeout",
            RemoteApiError::Auth { .. } => "auth",
            RemoteApiError::RateLimit { .. } => "rate_limit",
            RemoteApiError::Malformed(_) => "malformed",
            RemoteApiError::Status { .. } => "status",
            RemoteApiError::Network(_) => "network",
        }
    }
}

/// Failure while turning an uploaded file into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Could not decode uploaded file: {0}")]
    ImageDecode(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("OCR via remote API failed: {0}")]
    Remote(#[from] RemoteApiError),
}

impl ExtractionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::ImageDecode(_) => "image_decode",
            ExtractionError::Ocr(_) => "ocr_failure",
            ExtractionError::Remote(inner) => inner.kind(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Please enter your name.")]
    MissingPatientName,

    #[error("Unsupported file type: {0} (accepted: png, jpg, jpeg, pdf)")]
    UnsupportedFileType(String),

    #[error("No patient data available yet.")]
    NoPatients,

    #[error("Action requires {expected:?} mode but session is in {actual:?} mode")]
    WrongMode { expected: Mode, actual: Mode },

    #[error("Cannot apply {event} while patient flow is {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Summarization failed: {0}")]
    Summarization(#[from] RemoteApiError),
}

impl FlowError {
    /// Stable machine-readable tag, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::SessionNotFound(_) => "session_not_found",
            FlowError::PatientNotFound(_) => "patient_not_found",
            FlowError::MissingPatientName => "missing_patient_name",
            FlowError::UnsupportedFileType(_) => "unsupported_file_type",
            FlowError::NoPatients => "no_patients",
            FlowError::WrongMode { .. } => "wrong_mode",
            FlowError::InvalidTransition { .. } => "invalid_transition",
            FlowError::Extraction(inner) => inner.kind(),
            FlowError::Summarization(inner) => inner.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
