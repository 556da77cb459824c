//! Axum route handlers for the Proposal API.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::SessionView;
use crate::proposal::machine::{Rejection, RequestState};
use crate::state::AppState;

/// Upper bound for a long-poll on a loading session. Shorter than the
/// worst-case retry budget, so clients may need to poll more than once.
const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(10);

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub idea: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// False when the submit was a no-op (already loading, or a proposal is shown).
    pub accepted: bool,
    pub state: RequestState,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub session_id: Uuid,
    pub state: RequestState,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/proposals/sessions
///
/// Opens a new interaction with an Idle state machine. 503 when the registry is full.
pub async fn handle_open_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    Ok((StatusCode::CREATED, Json(state.sessions.open().await?)))
}

/// GET /api/v1/proposals/sessions/:id
///
/// Current state for the front-end to render.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StateResponse>, AppError> {
    let view = state
        .sessions
        .view(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    Ok(Json(StateResponse {
        session_id,
        state: view.state,
    }))
}

/// GET /api/v1/proposals/sessions/:id/settled
///
/// Long-poll: waits while the session is Loading (up to LONG_POLL_TIMEOUT), then
/// returns the current state, which may still be Loading on timeout.
pub async fn handle_wait_settled(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StateResponse>, AppError> {
    let handle = state
        .sessions
        .handle(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    let mut updates = handle.subscribe();
    // A closed channel or a timeout both fall through to the current state.
    let _ = tokio::time::timeout(
        LONG_POLL_TIMEOUT,
        updates.wait_for(|state| !state.is_loading()),
    )
    .await;

    Ok(Json(StateResponse {
        session_id,
        state: handle.current_state(),
    }))
}

/// POST /api/v1/proposals/sessions/:id/submit
///
/// Starts proposal generation. Returns immediately; poll the session for the outcome.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let handle = state
        .sessions
        .handle(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    let accepted = match handle.submit(request.idea).await? {
        Ok(()) => true,
        Err(Rejection::EmptyIdea) => {
            return Err(AppError::Validation("idea cannot be empty".to_string()))
        }
        Err(Rejection::AlreadyLoading | Rejection::ProposalShown) => false,
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            accepted,
            state: handle.current_state(),
        }),
    ))
}

/// POST /api/v1/proposals/sessions/:id/reset
///
/// "New Idea": back to Idle, discarding the proposal or any in-flight request.
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StateResponse>, AppError> {
    let handle = state
        .sessions
        .handle(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    handle.reset().await?;

    Ok(Json(StateResponse {
        session_id,
        state: handle.current_state(),
    }))
}

/// DELETE /api/v1/proposals/sessions/:id
///
/// Closes the interaction and cancels any in-flight request.
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.close(session_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(session_id))
    }
}

fn session_not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {session_id} not found"))
}
