//! In-memory registry of open proposal sessions, one state machine per session.
//! Nothing here outlives the process. Sessions nobody has touched for
//! `SESSION_IDLE_TTL` are evicted by a background sweeper, which also stops
//! their actors.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm_client::LlmClient;
use crate::models::session::SessionView;
use crate::proposal::service::{ProposalHandle, ProposalService, ServiceClosed};

pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
pub const MAX_OPEN_SESSIONS: usize = 10_000;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
#[error("too many open proposal sessions (limit {0})")]
pub struct RegistryFull(pub usize);

struct Session {
    handle: ProposalHandle,
    created_at: DateTime<Utc>,
    last_seen: Instant,
}

impl Session {
    fn view(&self, session_id: Uuid) -> SessionView {
        SessionView {
            session_id,
            created_at: self.created_at,
            state: self.handle.current_state(),
        }
    }
}

pub struct SessionRegistry {
    client: LlmClient,
    idle_ttl: Duration,
    max_sessions: usize,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
    pub fn new(client: LlmClient) -> Self {
        Self::with_limits(client, SESSION_IDLE_TTL, MAX_OPEN_SESSIONS)
    }

    pub fn with_limits(client: LlmClient, idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            client,
            idle_ttl,
            max_sessions,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Periodically evicts idle sessions. Ends once the registry is dropped.
    pub fn spawn_sweeper(registry: &Arc<Self>) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(registry);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.evict_idle().await;
            }
        })
    }

    /// Opens a session with a fresh, Idle state machine. At the limit, idle
    /// sessions are evicted first; if none are, the open is refused.
    pub async fn open(&self) -> Result<SessionView, RegistryFull> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            self.retain_active(&mut sessions);
            if sessions.len() >= self.max_sessions {
                warn!("Refusing new session: {} open", sessions.len());
                return Err(RegistryFull(self.max_sessions));
            }
        }

        let session_id = Uuid::new_v4();
        let session = Session {
            handle: ProposalService::spawn(self.client.clone()),
            created_at: Utc::now(),
            last_seen: Instant::now(),
        };
        let view = session.view(session_id);

        sessions.insert(session_id, session);
        info!("Opened proposal session {session_id}");
        Ok(view)
    }

    /// Looks up a session and marks it as active.
    pub async fn handle(&self, session_id: Uuid) -> Option<ProposalHandle> {
        self.touch(session_id, |s| s.handle.clone()).await
    }

    pub async fn view(&self, session_id: Uuid) -> Option<SessionView> {
        self.touch(session_id, |s| s.view(session_id)).await
    }

    /// Resets and forgets the session. Returns `Ok(false)` if it did not exist.
    pub async fn close(&self, session_id: Uuid) -> Result<bool, ServiceClosed> {
        let Some(session) = self.sessions.write().await.remove(&session_id) else {
            return Ok(false);
        };
        session.handle.reset().await?;
        info!("Closed proposal session {session_id}");
        Ok(true)
    }

    /// Drops every session idle for longer than the TTL. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.retain_active(&mut sessions)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn touch<T>(&self, session_id: Uuid, read: impl FnOnce(&Session) -> T) -> Option<T> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&session_id)?;
        session.last_seen = Instant::now();
        Some(read(session))
    }

    // Dropping a session's last handle stops its actor and any in-flight request.
    fn retain_active(&self, sessions: &mut HashMap<Uuid, Session>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen.elapsed() < self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle proposal sessions");
        }
        evicted
    }
}
