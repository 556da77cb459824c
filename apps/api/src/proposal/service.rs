//! Proposal Service — the actor that owns one `ProposalMachine`.
//!
//! Callers talk to it only through `ProposalHandle` commands. The spawned request
//! task reports back on a private channel tagged with its generation. State is
//! published on a `watch` channel after every command or completion.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::llm_client::{LlmClient, LlmError};
use crate::models::proposal::Proposal;
use crate::proposal::builder::PromptPayload;
use crate::proposal::machine::{
    Dispatch, ErrorKind, ProposalMachine, Rejection, RequestState,
};
use crate::proposal::validator::{self, ValidationError};

#[derive(Debug, Error)]
#[error("proposal service has shut down")]
pub struct ServiceClosed;

/// Why a request task ended without a proposal.
#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error(transparent)]
    Terminal(#[from] LlmError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl GenerationFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationFailure::Terminal(_) => ErrorKind::RetriesExhausted,
            GenerationFailure::Validation(_) => ErrorKind::InvalidResponse,
        }
    }
}

enum Command {
    Submit {
        idea: String,
        reply: oneshot::Sender<Result<(), Rejection>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug)]
enum ClientEvent {
    Succeeded { generation: u64, proposal: Proposal },
    Failed { generation: u64, failure: GenerationFailure },
}

/// Cheap to clone. The actor stops, aborting any in-flight request, once every
/// handle has been dropped.
#[derive(Clone)]
pub struct ProposalHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<RequestState>,
}

impl ProposalHandle {
    /// Starts a request for `idea` unless the machine rejects it. Rejections are
    /// not errors: state is left untouched.
    pub async fn submit(
        &self,
        idea: impl Into<String>,
    ) -> Result<Result<(), Rejection>, ServiceClosed> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Submit {
                idea: idea.into(),
                reply,
            })
            .map_err(|_| ServiceClosed)?;
        rx.await.map_err(|_| ServiceClosed)
    }

    /// Returns to Idle, cancelling any in-flight request.
    pub async fn reset(&self) -> Result<(), ServiceClosed> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Reset { reply })
            .map_err(|_| ServiceClosed)?;
        rx.await.map_err(|_| ServiceClosed)
    }

    pub fn current_state(&self) -> RequestState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.clone()
    }
}

pub struct ProposalService {
    machine: ProposalMachine,
    client: LlmClient,
    state_tx: watch::Sender<RequestState>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    in_flight: Option<JoinHandle<()>>,
}

impl ProposalService {
    /// Spawns the actor on the current tokio runtime.
    pub fn spawn(client: LlmClient) -> ProposalHandle {
        Self::spawn_with_events(client).0
    }

    /// Also returns the channel request tasks report their completions on.
    fn spawn_with_events(
        client: LlmClient,
    ) -> (ProposalHandle, mpsc::UnboundedSender<ClientEvent>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let machine = ProposalMachine::new();
        let (state_tx, state_rx) = watch::channel(machine.state().clone());

        let service = ProposalService {
            machine,
            client,
            state_tx,
            events_tx: events_tx.clone(),
            in_flight: None,
        };
        tokio::spawn(service.run(commands_rx, events_rx));

        let handle = ProposalHandle {
            commands: commands_tx,
            state: state_rx,
        };
        (handle, events_tx)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<ClientEvent>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }

        self.cancel_in_flight();
        debug!("Proposal service stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { idea, reply } => {
                let outcome = self
                    .machine
                    .submit(&idea)
                    .map(|dispatch| self.start(dispatch));
                if let Err(rejection) = &outcome {
                    debug!("Submit rejected: {rejection}");
                }
                self.publish();
                let _ = reply.send(outcome);
            }
            Command::Reset { reply } => {
                if self.machine.reset() {
                    info!("Reset while loading; cancelling in-flight request");
                    self.cancel_in_flight();
                }
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    fn handle_event(&mut self, event: ClientEvent) {
        let applied = match event {
            ClientEvent::Succeeded {
                generation,
                proposal,
            } => {
                let bytes = proposal.as_html().len();
                let applied = self.machine.client_succeeded(generation, proposal);
                if applied {
                    info!("Proposal generated (generation {generation}, {bytes} bytes)");
                }
                applied
            }
            ClientEvent::Failed {
                generation,
                failure,
            } => {
                let applied = self.machine.client_failed(generation, failure.kind());
                if applied {
                    error!("Proposal generation failed (generation {generation}): {failure}");
                }
                applied
            }
        };

        if applied {
            self.in_flight = None;
            self.publish();
        } else {
            debug!(
                "Discarded stale completion; current generation is {}",
                self.machine.generation()
            );
        }
    }

    fn start(&mut self, dispatch: Dispatch) {
        let Dispatch {
            generation,
            payload,
        } = dispatch;
        let client = self.client.clone();
        let events = self.events_tx.clone();

        info!("Starting proposal request (generation {generation})");
        self.cancel_in_flight();
        self.in_flight = Some(tokio::spawn(async move {
            let event = match generate(&client, &payload).await {
                Ok(proposal) => ClientEvent::Succeeded {
                    generation,
                    proposal,
                },
                Err(failure) => ClientEvent::Failed {
                    generation,
                    failure,
                },
            };
            let _ = events.send(event);
        }));
    }

    fn cancel_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.machine.state().clone());
    }
}

/// ResilientClient call followed by envelope validation.
async fn generate(
    client: &LlmClient,
    payload: &PromptPayload,
) -> Result<Proposal, GenerationFailure> {
    let raw = client
        .call(payload.system_instruction(), payload.user_message())
        .await?;
    Ok(validator::extract(&raw)?)
}
