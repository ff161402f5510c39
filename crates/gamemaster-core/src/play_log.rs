//! Play-log store: the per-session record of completed turns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GmError;

/// One completed turn as persisted in the play log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayLogEntry {
    /// `{session_id}:{turn_seq}`.
    pub turn_id: String,
    /// Session key.
    pub session_id: String,
    /// Per-session sequence number.
    pub turn_seq: i64,
    /// Action text (player input or generated NPC action).
    pub user_input: String,
    /// Generated narrative.
    pub final_output: String,
    /// Resolved diffs, serialized.
    pub state_diff: Value,
    /// State-service commit id.
    pub commit_id: String,
    /// Act tag.
    pub act_id: Option<String>,
    /// Sequence tag.
    pub sequence_id: Option<String>,
    /// Sequence kind tag.
    pub sequence_type: Option<String>,
    /// Sequence ordinal tag.
    pub sequence_seq: Option<i32>,
    /// Who acted.
    pub active_entity_id: String,
    /// World snapshot at turn start, serialized.
    pub world_snapshot: Value,
    /// When the row was recorded.
    pub created_at: DateTime<Utc>,
}

/// Input/output pair of one past turn, used as language-model context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryExchange {
    /// What was attempted.
    pub player_input: String,
    /// What the narrator said.
    pub narrative: String,
}

/// Append/query store for completed turns.
#[async_trait]
pub trait PlayLogRepository: Send + Sync {
    /// Highest recorded `turn_seq` for the session, or `None` if it has no turns.
    async fn max_turn_seq(&self, session_id: &str) -> Result<Option<i64>, GmError>;

    /// Appends one completed turn.
    async fn append(&self, entry: &PlayLogEntry) -> Result<(), GmError>;

    /// The `limit` most recent exchanges, newest first.
    async fn recent_exchanges(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<HistoryExchange>, GmError>;

    /// Every recorded turn of the session, ordered by `turn_seq` ascending.
    async fn session_entries(&self, session_id: &str) -> Result<Vec<PlayLogEntry>, GmError>;
}
