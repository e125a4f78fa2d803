//! Application state for Axum web framework.

use crate::services::Services;

/// Shared state handed to every request handler.
///
/// Cloning is cheap since `Services` holds its dispatcher behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}
