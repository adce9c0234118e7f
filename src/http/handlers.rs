use super::state::AppState;
use crate::session::Phase;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::info;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub session_id: String,
    pub signal: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session_id: String,
    pub phase: Phase,
    /// Display hint: whether the operator may open the candidate's window
    pub speaking_enabled: bool,
    pub ended: bool,
}

// ============================================================================
// Handlers
// ============================================================================
//
// Handlers only flip operator signals and read the phase hint; the session
// task owns all conversation state.

/// POST /session/speak/start
/// Open the candidate's recording window
pub async fn begin_speaking(State(state): State<AppState>) -> impl IntoResponse {
    info!("Operator signal: begin-speaking");
    state.control.begin_speaking();

    (
        StatusCode::OK,
        Json(SignalResponse {
            session_id: state.session_id.clone(),
            signal: "begin-speaking",
        }),
    )
}

/// POST /session/speak/stop
/// Close the recording window; the segment proceeds to transcription
pub async fn stop_speaking(State(state): State<AppState>) -> impl IntoResponse {
    info!("Operator signal: stop-speaking");
    state.control.stop_speaking();

    (
        StatusCode::OK,
        Json(SignalResponse {
            session_id: state.session_id.clone(),
            signal: "stop-speaking",
        }),
    )
}

/// POST /session/end
/// End the session after the in-flight operation completes
pub async fn end_session(State(state): State<AppState>) -> impl IntoResponse {
    info!("Operator signal: end-session");
    state.control.end_session();

    (
        StatusCode::OK,
        Json(SignalResponse {
            session_id: state.session_id.clone(),
            signal: "end-session",
        }),
    )
}

/// GET /session/status
/// Current phase and display hint
pub async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    let phase = *state.phase.borrow();

    (
        StatusCode::OK,
        Json(StatusResponse {
            session_id: state.session_id.clone(),
            phase,
            speaking_enabled: phase.speaking_enabled(),
            ended: state.control.is_ended(),
        }),
    )
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
