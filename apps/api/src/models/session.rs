use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::proposal::machine::RequestState;

/// Snapshot of one proposal session as rendered to the front-end.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state: RequestState,
}
