use crate::session::CallController;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single call engine this service fronts
    pub call: CallController,
}

impl AppState {
    pub fn new(call: CallController) -> Self {
        Self { call }
    }
}
