use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/languages", get(handlers::list_languages))
        // Call control
        .route("/call/start", post(handlers::start_call))
        .route("/call/hangup", post(handlers::hangup))
        // Call queries
        .route("/call/status", get(handlers::get_call_status))
        .route("/call/transcript", get(handlers::get_call_transcript))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
