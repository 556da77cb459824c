//! Proposal State Machine — the request lifecycle for one session.
//!
//! Idle ──submit──▶ Loading ──succeeded──▶ Success
//!  ▲                  │
//!  │                  └────failed────▶ Error ──submit──▶ Loading
//!  └──────────────reset (from any non-Idle state)───────────┘
//!
//! Pure and synchronous: it never performs I/O. The actor in `service` owns one
//! machine, runs the `Dispatch` it hands out, and feeds completions back in.
//! Every accepted submit and every reset bumps the generation, so a completion
//! carrying an older generation is discarded.

use serde::Serialize;
use thiserror::Error;

use crate::models::proposal::Proposal;
use crate::proposal::builder::{self, PromptPayload};

/// Shown for every failure. Internal causes are logged, never rendered.
pub const USER_FACING_ERROR: &str =
    "Our AI architect is currently overwhelmed with requests. Please try again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Every transport attempt failed.
    RetriesExhausted,
    /// The endpoint answered but the envelope had no usable text.
    InvalidResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success {
        proposal: Proposal,
    },
    Error {
        #[serde(skip)]
        kind: ErrorKind,
        message: String,
    },
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }
}

/// Why a submit did not start a request. None of these change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("idea cannot be empty")]
    EmptyIdea,
    #[error("a proposal is already being generated")]
    AlreadyLoading,
    #[error("a proposal is already shown; start a new idea first")]
    ProposalShown,
}

/// Work the owner must start after an accepted submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub generation: u64,
    pub payload: PromptPayload,
}

#[derive(Debug, Default)]
pub struct ProposalMachine {
    state: RequestState,
    generation: u64,
}

impl ProposalMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Idle/Error → Loading. Builds the prompt; rejects without any transition
    /// when a request is in flight, a proposal is shown, or the idea is blank.
    pub fn submit(&mut self, idea: &str) -> Result<Dispatch, Rejection> {
        match self.state {
            RequestState::Loading => return Err(Rejection::AlreadyLoading),
            RequestState::Success { .. } => return Err(Rejection::ProposalShown),
            RequestState::Idle | RequestState::Error { .. } => {}
        }

        let payload = builder::build(idea).map_err(|_| Rejection::EmptyIdea)?;

        self.generation += 1;
        self.state = RequestState::Loading;

        Ok(Dispatch {
            generation: self.generation,
            payload,
        })
    }

    /// Any non-Idle state → Idle. Returns whether a request was in flight and
    /// must be cancelled by the owner.
    pub fn reset(&mut self) -> bool {
        if self.state == RequestState::Idle {
            return false;
        }
        let was_loading = self.state.is_loading();
        self.generation += 1;
        self.state = RequestState::Idle;
        was_loading
    }

    /// Loading → Success. Returns false if the completion is stale.
    pub fn client_succeeded(&mut self, generation: u64, proposal: Proposal) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = RequestState::Success { proposal };
        true
    }

    /// Loading → Error. Returns false if the completion is stale.
    pub fn client_failed(&mut self, generation: u64, kind: ErrorKind) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = RequestState::Error {
            kind,
            message: USER_FACING_ERROR.to_string(),
        };
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.state.is_loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loading(machine: &mut ProposalMachine) -> u64 {
        machine.submit("a dog adoption app").unwrap().generation
    }

    #[test]
    fn test_starts_idle() {
        let machine = ProposalMachine::new();
        assert_eq!(machine.state(), &RequestState::Idle);
        assert_eq!(machine.generation(), 0);
    }

    #[test]
    fn test_submit_moves_to_loading_with_prompt() {
        let mut machine = ProposalMachine::new();
        let dispatch = machine.submit("  a dog adoption app ").unwrap();

        assert_eq!(machine.state(), &RequestState::Loading);
        assert_eq!(dispatch.generation, 1);
        assert_eq!(
            dispatch.payload.user_message(),
            "Client Idea: a dog adoption app"
        );
    }

    #[test]
    fn test_blank_submit_leaves_state_unchanged() {
        let mut machine = ProposalMachine::new();
        for idea in ["", "   ", "\n\t"] {
            assert_eq!(machine.submit(idea), Err(Rejection::EmptyIdea));
            assert_eq!(machine.state(), &RequestState::Idle);
            assert_eq!(machine.generation(), 0);
        }
    }

    #[test]
    fn test_submit_while_loading_is_noop() {
        let mut machine = ProposalMachine::new();
        let generation = loading(&mut machine);

        assert_eq!(machine.submit("another idea"), Err(Rejection::AlreadyLoading));
        assert_eq!(machine.state(), &RequestState::Loading);
        assert_eq!(machine.generation(), generation);
    }

    #[test]
    fn test_success_then_submit_requires_reset() {
        let mut machine = ProposalMachine::new();
        let generation = loading(&mut machine);
        assert!(machine.client_succeeded(generation, Proposal::new("<p>x</p>")));

        assert_eq!(machine.submit("next"), Err(Rejection::ProposalShown));
        assert!(!machine.reset());
        assert!(machine.submit("next").is_ok());
    }

    #[test]
    fn test_failure_shows_generic_message_and_allows_resubmit() {
        let mut machine = ProposalMachine::new();
        let generation = loading(&mut machine);
        assert!(machine.client_failed(generation, ErrorKind::RetriesExhausted));

        assert_eq!(
            machine.state(),
            &RequestState::Error {
                kind: ErrorKind::RetriesExhausted,
                message: USER_FACING_ERROR.to_string(),
            }
        );
        let retry = machine.submit("a dog adoption app").unwrap();
        assert_eq!(retry.generation, generation + 1);
        assert!(machine.state().is_loading());
    }

    #[test]
    fn test_reset_after_success_clears_proposal() {
        let mut machine = ProposalMachine::new();
        let generation = loading(&mut machine);
        machine.client_succeeded(generation, Proposal::new("<p>x</p>"));

        assert!(!machine.reset());
        assert_eq!(machine.state(), &RequestState::Idle);
    }

    #[test]
    fn test_reset_while_idle_is_noop() {
        let mut machine = ProposalMachine::new();
        assert!(!machine.reset());
        assert_eq!(machine.generation(), 0);
    }

    #[test]
    fn test_reset_while_loading_requests_cancel() {
        let mut machine = ProposalMachine::new();
        loading(&mut machine);
        assert!(machine.reset());
        assert_eq!(machine.state(), &RequestState::Idle);
    }

    #[test]
    fn test_stale_completion_does_not_overwrite_reset() {
        let mut machine = ProposalMachine::new();
        let stale = loading(&mut machine);
        machine.reset();

        assert!(!machine.client_succeeded(stale, Proposal::new("<p>late</p>")));
        assert!(!machine.client_failed(stale, ErrorKind::InvalidResponse));
        assert_eq!(machine.state(), &RequestState::Idle);
    }

    #[test]
    fn test_stale_completion_does_not_overwrite_newer_request() {
        let mut machine = ProposalMachine::new();
        let stale = loading(&mut machine);
        machine.reset();
        let current = loading(&mut machine);

        assert!(!machine.client_succeeded(stale, Proposal::new("<p>late</p>")));
        assert!(machine.state().is_loading());
        assert!(machine.client_succeeded(current, Proposal::new("<p>fresh</p>")));
        assert_eq!(
            machine.state(),
            &RequestState::Success {
                proposal: Proposal::new("<p>fresh</p>")
            }
        );
    }

    #[test]
    fn test_completion_after_terminal_state_is_ignored() {
        let mut machine = ProposalMachine::new();
        let generation = loading(&mut machine);
        machine.client_succeeded(generation, Proposal::new("<p>x</p>"));

        assert!(!machine.client_failed(generation, ErrorKind::RetriesExhausted));
        assert!(matches!(machine.state(), RequestState::Success { .. }));
    }

    #[test]
    fn test_state_json_hides_error_kind() {
        let state = RequestState::Error {
            kind: ErrorKind::InvalidResponse,
            message: USER_FACING_ERROR.to_string(),
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({"status": "error", "message": USER_FACING_ERROR})
        );
        assert_eq!(
            serde_json::to_value(RequestState::Idle).unwrap(),
            serde_json::json!({"status": "idle"})
        );
        assert_eq!(
            serde_json::to_value(RequestState::Success {
                proposal: Proposal::new("<h3>Hi</h3>")
            })
            .unwrap(),
            serde_json::json!({"status": "success", "proposal": "<h3>Hi</h3>"})
        );
    }
}
