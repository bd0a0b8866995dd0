use axum::{
    Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        rejection::JsonRejection,
    },
    http::StatusCode,
    middleware::from_fn,
    response::Json,
    routing::{get, post},
};
use care_flow::{
    Adapters, DoctorEvent, DoctorOutcome, EventOutcome, FlowError, FlowRunner,
    InMemorySessionStorage, PatientEvent, PatientOutcome, RemoteApiError, SessionEvent,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    config::ServiceConfig,
    llm::ChatCompletionClient,
    models::{
        EventResponse, SaveNotesRequest, SavePatientRequest, SelectPatientRequest,
        SessionCreatedResponse, SessionResponse, SwitchModeRequest,
    },
    ocr::build_extractor,
    summarize::ChatCompletionSummarizer,
    telemetry::correlation_id_middleware,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    request_error(StatusCode::BAD_REQUEST, message)
}

/// Body for requests rejected before they reach a session.
fn request_error(status: StatusCode, message: &str) -> ApiError {
    warn!(status = status.as_u16(), error = %message, "Malformed request");
    (
        status,
        Json(json!({
            "error": message,
            "kind": "bad_request"
        })),
    )
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| request_error(rejection.status(), &rejection.body_text()))
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "kind": "internal",
            "details": details
        })),
    )
}

/// Map a flow failure to the status and body the client sees.
fn flow_error(e: FlowError) -> ApiError {
    let status = match &e {
        FlowError::SessionNotFound(_) | FlowError::PatientNotFound(_) => StatusCode::NOT_FOUND,
        FlowError::MissingPatientName => StatusCode::BAD_REQUEST,
        FlowError::UnsupportedFileType(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FlowError::Extraction(care_flow::ExtractionError::ImageDecode(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        FlowError::Extraction(care_flow::ExtractionError::Remote(remote))
        | FlowError::Summarization(remote) => remote_status(remote),
        FlowError::Extraction(care_flow::ExtractionError::Ocr(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        FlowError::WrongMode { .. } | FlowError::InvalidTransition { .. } | FlowError::NoPatients => {
            StatusCode::CONFLICT
        }
    };

    let mut body = match &e {
        // The only deliberate, friendly rejection.
        FlowError::MissingPatientName => json!({ "warning": e.to_string() }),
        _ => json!({ "error": e.to_string() }),
    };
    body["kind"] = json!(e.kind());

    if let FlowError::Summarization(RemoteApiError::RateLimit {
        retry_after_secs: Some(secs),
    }) = &e
    {
        body["retry_after_secs"] = json!(secs);
    }
    if let FlowError::SessionNotFound(id) = &e {
        body["session_id"] = json!(id);
    }

    if status.is_server_error() {
        error!(kind = e.kind(), error = %e, "Request failed");
    } else {
        warn!(kind = e.kind(), error = %e, "Request rejected");
    }
    (status, Json(body))
}

fn remote_status(e: &RemoteApiError) -> StatusCode {
    match e {
        RemoteApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        RemoteApiError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Clone)]
pub struct AppState {
    pub flow_runner: FlowRunner,
}

impl AppState {
    pub fn new(flow_runner: FlowRunner) -> Self {
        Self { flow_runner }
    }
}

/// Wire the configured adapters into a runner and build the router.
pub fn create_app(config: &ServiceConfig) -> anyhow::Result<Router> {
    let client = ChatCompletionClient::new(&config.llm)?;
    let extractor = build_extractor(config, &client);
    let summarizer = Arc::new(ChatCompletionSummarizer::new(
        client,
        config.llm.summary_model.clone(),
        config.llm.temperature,
    ));

    let flow_runner = FlowRunner::new(
        Arc::new(InMemorySessionStorage::new()),
        Adapters::new(extractor, summarizer),
    );

    Ok(build_router(AppState::new(flow_runner), config.max_upload_bytes))
}

pub fn build_router(app_state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/{session_id}", get(get_session).delete(end_session))
        .route("/sessions/{session_id}/mode", post(switch_mode))
        .route("/sessions/{session_id}/patient/upload", post(upload_report))
        .route("/sessions/{session_id}/patient/extract", post(extract_again))
        .route("/sessions/{session_id}/patient/summarize", post(summarize_report))
        .route("/sessions/{session_id}/patient/save", post(save_for_doctor))
        .route("/sessions/{session_id}/patient/reset", post(reset_patient))
        .route("/sessions/{session_id}/doctor/select", post(select_patient))
        .route("/sessions/{session_id}/doctor/notes", post(save_notes))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "HealthEase - OCR + AI Medical Report Helper",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Upload a medical report image, get its text, a simple summary in Hindi, and share it with a doctor",
        "endpoints": {
            "POST /sessions": "Start a new session (patient mode)",
            "GET /sessions/{session_id}": "Render the active mode",
            "DELETE /sessions/{session_id}": "End the session and drop its records",
            "POST /sessions/{session_id}/mode": "Switch between patient and doctor mode",
            "POST /sessions/{session_id}/patient/upload": "Upload a png/jpg/jpeg/pdf report (multipart field 'file')",
            "POST /sessions/{session_id}/patient/extract": "Run OCR again on the uploaded report",
            "POST /sessions/{session_id}/patient/summarize": "Summarize & translate the extracted text",
            "POST /sessions/{session_id}/patient/save": "Save the extracted text for the doctor under a name",
            "POST /sessions/{session_id}/patient/reset": "Discard the current upload",
            "POST /sessions/{session_id}/doctor/select": "Select a patient",
            "POST /sessions/{session_id}/doctor/notes": "Save prescription and comments for the selected patient",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let sessions = state
        .flow_runner
        .storage()
        .count()
        .await
        .map_err(|e| internal_error("Failed to read session storage", &e.to_string()))?;

    Ok(Json(json!({
        "status": "healthy",
        "active_sessions": sessions,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

async fn create_session(State(state): State<AppState>) -> Result<(StatusCode, Json<SessionCreatedResponse>), ApiError> {
    let session = state.flow_runner.create_session().await.map_err(flow_error)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id: session.id.clone(),
            mode: session.mode,
            view: session.view(),
        }),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let view = state.flow_runner.view(&session_id).await.map_err(flow_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .flow_runner
        .end_session(&session_id)
        .await
        .map_err(flow_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn switch_mode(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<SwitchModeRequest>, JsonRejection>,
) -> ApiResult<EventResponse> {
    let request = json_body(payload)?;
    run_event(&state, session_id, SessionEvent::SwitchMode(request.mode)).await
}

async fn upload_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<EventResponse> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| request_error(e.status(), &e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| bad_request_error("Uploaded file has no file name"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| request_error(e.status(), &e.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload.ok_or_else(|| bad_request_error("Missing multipart field 'file'"))?;
    info!(session_id = %session_id, file_name = %file_name, size_bytes = bytes.len(), "Report upload received");

    let event = PatientEvent::Upload {
        file_name,
        bytes: Arc::from(&bytes[..]),
    };
    run_event(&state, session_id, SessionEvent::Patient(event)).await
}

async fn extract_again(State(state): State<AppState>, Path(session_id): Path<String>) -> ApiResult<EventResponse> {
    run_event(&state, session_id, SessionEvent::Patient(PatientEvent::Extract)).await
}

async fn summarize_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<EventResponse> {
    run_event(&state, session_id, SessionEvent::Patient(PatientEvent::Summarize)).await
}

async fn save_for_doctor(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<SavePatientRequest>, JsonRejection>,
) -> ApiResult<EventResponse> {
    let request = json_body(payload)?;
    run_event(
        &state,
        session_id,
        SessionEvent::Patient(PatientEvent::Save { name: request.name }),
    )
    .await
}

async fn reset_patient(State(state): State<AppState>, Path(session_id): Path<String>) -> ApiResult<EventResponse> {
    run_event(&state, session_id, SessionEvent::Patient(PatientEvent::Reset)).await
}

async fn select_patient(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<SelectPatientRequest>, JsonRejection>,
) -> ApiResult<EventResponse> {
    let request = json_body(payload)?;
    run_event(
        &state,
        session_id,
        SessionEvent::Doctor(DoctorEvent::SelectPatient { name: request.name }),
    )
    .await
}

async fn save_notes(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<SaveNotesRequest>, JsonRejection>,
) -> ApiResult<EventResponse> {
    let request = json_body(payload)?;
    run_event(
        &state,
        session_id,
        SessionEvent::Doctor(DoctorEvent::SaveNotes {
            prescription: request.prescription,
            comment: request.comment,
        }),
    )
    .await
}

async fn run_event(state: &AppState, session_id: String, event: SessionEvent) -> ApiResult<EventResponse> {
    let result = state
        .flow_runner
        .run(&session_id, event)
        .await
        .map_err(flow_error)?;

    Ok(Json(EventResponse {
        session_id,
        message: outcome_message(&result.outcome),
        result: result.outcome,
        view: result.view,
    }))
}

fn outcome_message(outcome: &EventOutcome) -> String {
    match outcome {
        EventOutcome::ModeSwitched { mode } => format!("Switched to {:?} mode", mode),
        EventOutcome::Patient(PatientOutcome::Extracted { .. }) => "Text extracted with OCR".to_string(),
        EventOutcome::Patient(PatientOutcome::Summarized { .. }) => {
            "AI summary + Hindi translation ready".to_string()
        }
        EventOutcome::Patient(PatientOutcome::Saved { .. }) => "Report saved for your doctor.".to_string(),
        EventOutcome::Patient(PatientOutcome::Reset) => "Upload discarded".to_string(),
        EventOutcome::Doctor(DoctorOutcome::Selected { name }) => format!("Showing report for {}", name),
        EventOutcome::Doctor(DoctorOutcome::NotesSaved { .. }) => "Notes saved successfully!".to_string(),
    }
}
