//! Per-session turn numbering and the play-log recorder.

use std::sync::Arc;

use gamemaster_core::clock::Clock;
use gamemaster_core::context::TurnContext;
use gamemaster_core::error::GmError;
use gamemaster_core::play_log::{HistoryExchange, PlayLogEntry, PlayLogRepository};
use serde_json::Value;

/// Assigns `turn_seq` values and reads and writes the play log.
///
/// Sequence lookups and history reads fail open: a store outage yields
/// sequence 1 and an empty history rather than aborting the turn.
#[derive(Clone)]
pub struct TurnSequencer {
    log: Arc<dyn PlayLogRepository>,
    clock: Arc<dyn Clock>,
}

impl TurnSequencer {
    /// Creates a sequencer over `log`, stamping rows with `clock`.
    #[must_use]
    pub fn new(log: Arc<dyn PlayLogRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { log, clock }
    }

    /// `1 + max(turn_seq)` for the session, or 1 if it has no turns or the
    /// lookup fails.
    pub async fn next_seq(&self, session_id: &str) -> i64 {
        match self.log.max_turn_seq(session_id).await {
            Ok(max) => max.map_or(1, |seq| seq + 1),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "turn_seq lookup failed, starting at 1");
                1
            }
        }
    }

    /// Records a completed turn.
    ///
    /// # Errors
    ///
    /// Returns `GmError::Invariant` if the context is missing a field a
    /// completed turn must have, or the store's error if the insert fails.
    pub async fn append(&self, context: &TurnContext) -> Result<(), GmError> {
        let entry = entry_from(context, self.clock.as_ref())?;
        self.log.append(&entry).await
    }

    /// The last `limit` exchanges of the session, oldest first. Empty if the
    /// store cannot be read.
    pub async fn history(&self, session_id: &str, limit: u32) -> Vec<HistoryExchange> {
        match self.log.recent_exchanges(session_id, limit).await {
            Ok(mut newest_first) => {
                newest_first.reverse();
                newest_first
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "history lookup failed, continuing without it");
                Vec::new()
            }
        }
    }

    /// Every recorded turn of the session, by ascending `turn_seq`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the read fails.
    pub async fn session_entries(&self, session_id: &str) -> Result<Vec<PlayLogEntry>, GmError> {
        self.log.session_entries(session_id).await
    }
}

fn entry_from(context: &TurnContext, clock: &dyn Clock) -> Result<PlayLogEntry, GmError> {
    let missing = |field: &str| GmError::Invariant(format!("cannot record turn without `{field}`"));

    let state_diff = serde_json::to_value(context.final_diffs().ok_or_else(|| missing("final_diffs"))?)
        .map_err(|e| GmError::Infrastructure(format!("failed to serialize final_diffs: {e}")))?;
    let world_snapshot = match context.world_snapshot() {
        Some(snapshot) => serde_json::to_value(snapshot).map_err(|e| {
            GmError::Infrastructure(format!("failed to serialize world_snapshot: {e}"))
        })?,
        None => Value::Object(serde_json::Map::new()),
    };
    let hierarchy = context.hierarchy();

    Ok(PlayLogEntry {
        turn_id: context.turn_id().ok_or_else(|| missing("turn_id"))?.to_owned(),
        session_id: context.session_id().to_owned(),
        turn_seq: context.turn_seq().ok_or_else(|| missing("turn_seq"))?,
        user_input: context.user_input().to_owned(),
        final_output: context.narrative().ok_or_else(|| missing("narrative"))?.to_owned(),
        state_diff,
        commit_id: context.commit_id().ok_or_else(|| missing("commit_id"))?.to_owned(),
        act_id: hierarchy.act_id.clone(),
        sequence_id: hierarchy.sequence_id.clone(),
        sequence_type: hierarchy.sequence_type.clone(),
        sequence_seq: hierarchy.sequence_seq,
        active_entity_id: context
            .active_entity_id()
            .ok_or_else(|| missing("active_entity_id"))?
            .to_owned(),
        world_snapshot,
        created_at: clock.now(),
    })
}
