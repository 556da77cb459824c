pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::proposal::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Proposal API
        .route(
            "/api/v1/proposals/sessions",
            post(handlers::handle_open_session),
        )
        .route(
            "/api/v1/proposals/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_close_session),
        )
        .route(
            "/api/v1/proposals/sessions/:id/settled",
            get(handlers::handle_wait_settled),
        )
        .route(
            "/api/v1/proposals/sessions/:id/submit",
            post(handlers::handle_submit),
        )
        .route(
            "/api/v1/proposals/sessions/:id/reset",
            post(handlers::handle_reset),
        )
        .with_state(state)
}
