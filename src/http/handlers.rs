use super::state::AppState;
use crate::error::CallError;
use crate::session::{CallState, CallStats, Language, StartOutcome, SUPPORTED_LANGUAGES};
use crate::transcript::TranscriptEntry;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartCallRequest {
    /// Optional language code (if not provided, use the configured default)
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartCallResponse {
    pub call_id: String,
    pub status: CallState,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HangupResponse {
    pub status: CallState,
    pub message: String,
    pub stats: CallStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /call/start
/// Start a call with the live speech agent
pub async fn start_call(
    State(state): State<AppState>,
    body: Option<Json<StartCallRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    info!("Start call requested (language: {:?})", req.language);

    match state.call.start(req.language.as_deref()).await {
        Ok(StartOutcome::Started { call_id }) => (
            StatusCode::OK,
            Json(StartCallResponse {
                call_id: call_id.clone(),
                status: state.call.state(),
                message: format!("Call {} started", call_id),
            }),
        )
            .into_response(),
        Ok(StartOutcome::Ignored(current)) => {
            warn!("Start call rejected: call is {}", current);
            error_response(
                StatusCode::CONFLICT,
                format!("A call is already in progress ({})", current),
            )
        }
        Err(e @ CallError::UnknownLanguage(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!("Failed to start call: {}", e);
            error_response(StatusCode::BAD_GATEWAY, format!("Failed to start call: {}", e))
        }
    }
}

/// POST /call/hangup
/// End the current call; hanging up an idle engine is not an error
pub async fn hangup(State(state): State<AppState>) -> impl IntoResponse {
    info!("Hangup requested");

    match state.call.hangup().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HangupResponse {
                status: state.call.state(),
                message: "Call ended".to_string(),
                stats: state.call.stats().await,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to hang up: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to hang up: {}", e),
            )
        }
    }
}

/// GET /call/status
pub async fn get_call_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.call.stats().await))
}

/// GET /call/transcript
/// Finalized turns of the current or most recent call
pub async fn get_call_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let transcript: Vec<TranscriptEntry> = state.call.history().await;
    (StatusCode::OK, Json(transcript))
}

/// GET /languages
pub async fn list_languages() -> impl IntoResponse {
    let languages: Vec<Language> = SUPPORTED_LANGUAGES.to_vec();
    (StatusCode::OK, Json(languages))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
