//! Shared application state.

use std::sync::Arc;

use gamemaster_turn::application::engine::GameEngine;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The turn engine.
    pub engine: Arc<GameEngine>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(engine: Arc<GameEngine>) -> Self {
        Self { engine }
    }
}
