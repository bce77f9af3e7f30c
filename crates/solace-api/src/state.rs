//! Application state shared across all route handlers.

use std::sync::Arc;

use solace_chat::SessionRegistry;

/// Shared application state.
///
/// All fields are cheap to clone across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Per-session dialogue orchestrators.
    pub registry: Arc<SessionRegistry>,
    /// Session used when a chat request does not name one.
    pub default_session: Arc<str>,
}

impl AppState {
    pub fn new(registry: SessionRegistry, default_session: impl Into<String>) -> Self {
        Self {
            registry: Arc::new(registry),
            default_session: Arc::from(default_session.into()),
        }
    }
}
