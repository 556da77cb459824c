use std::sync::Arc;

use crate::proposal::sessions::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// One proposal state machine per open front-end interaction.
    pub sessions: Arc<SessionRegistry>,
}
