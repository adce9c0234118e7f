use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Operator signals
        .route("/session/speak/start", post(handlers::begin_speaking))
        .route("/session/speak/stop", post(handlers::stop_speaking))
        .route("/session/end", post(handlers::end_session))
        // Display hint
        .route("/session/status", get(handlers::session_status))
        // Permissive CORS so a local control panel can drive the session
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
