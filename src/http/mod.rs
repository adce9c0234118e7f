//! HTTP surface for operator control (control panel, curl, anything)
//!
//! This module exposes the three operator intents and the phase hint:
//! - POST /session/speak/start - begin-speaking
//! - POST /session/speak/stop  - stop-speaking
//! - POST /session/end         - end-session
//! - GET  /session/status      - phase + display hint
//! - GET  /health              - health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
