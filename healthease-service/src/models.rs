use care_flow::{EventOutcome, Mode, SessionView};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SwitchModeRequest {
    pub mode: Mode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavePatientRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectPatientRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveNotesRequest {
    #[serde(default)]
    pub prescription: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: String,
    pub mode: Mode,
    pub view: SessionView,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub view: SessionView,
}

/// Reply to any action: what happened, a human-readable message, and the view afterwards.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub session_id: String,
    pub message: String,
    pub result: EventOutcome,
    pub view: SessionView,
}
