//! HTTP API server for the call screen
//!
//! This module provides a REST API for driving the call engine:
//! - POST /call/start - Start a call (optional language code)
//! - POST /call/hangup - End the current call
//! - GET /call/status - Query engine statistics
//! - GET /call/transcript - Get finalized turns
//! - GET /languages - Supported conversational languages
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
