//! Test play logs: in-memory and failing `PlayLogRepository` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use gamemaster_core::error::GmError;
use gamemaster_core::play_log::{HistoryExchange, PlayLogEntry, PlayLogRepository};

/// A play log held in memory. Behaves like the PostgreSQL store, including
/// rejecting a second row with the same `(session_id, turn_seq)`.
#[derive(Debug, Default)]
pub struct InMemoryPlayLog {
    entries: Mutex<Vec<PlayLogEntry>>,
}

impl InMemoryPlayLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A log pre-populated with `entries`.
    #[must_use]
    pub fn with_entries(entries: Vec<PlayLogEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Snapshot of every stored row, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn entries(&self) -> Vec<PlayLogEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn session_rows(&self, session_id: &str) -> Vec<PlayLogEntry> {
        let mut rows: Vec<PlayLogEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.turn_seq);
        rows
    }
}

#[async_trait]
impl PlayLogRepository for InMemoryPlayLog {
    async fn max_turn_seq(&self, session_id: &str) -> Result<Option<i64>, GmError> {
        Ok(self.session_rows(session_id).last().map(|e| e.turn_seq))
    }

    async fn append(&self, entry: &PlayLogEntry) -> Result<(), GmError> {
        let mut entries = self.entries.lock().unwrap();
        let duplicate = entries.iter().any(|e| {
            e.turn_id == entry.turn_id
                || (e.session_id == entry.session_id && e.turn_seq == entry.turn_seq)
        });
        if duplicate {
            return Err(GmError::Infrastructure(format!(
                "duplicate play log row for turn {}",
                entry.turn_id
            )));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn recent_exchanges(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<HistoryExchange>, GmError> {
        Ok(self
            .session_rows(session_id)
            .into_iter()
            .rev()
            .take(limit as usize)
            .map(|e| HistoryExchange {
                player_input: e.user_input,
                narrative: e.final_output,
            })
            .collect())
    }

    async fn session_entries(&self, session_id: &str) -> Result<Vec<PlayLogEntry>, GmError> {
        Ok(self.session_rows(session_id))
    }
}

/// A play log whose every operation fails with an infrastructure error.
#[derive(Debug)]
pub struct FailingPlayLog;

#[async_trait]
impl PlayLogRepository for FailingPlayLog {
    async fn max_turn_seq(&self, _session_id: &str) -> Result<Option<i64>, GmError> {
        Err(GmError::Infrastructure("connection refused".into()))
    }

    async fn append(&self, _entry: &PlayLogEntry) -> Result<(), GmError> {
        Err(GmError::Infrastructure("connection refused".into()))
    }

    async fn recent_exchanges(
        &self,
        _session_id: &str,
        _limit: u32,
    ) -> Result<Vec<HistoryExchange>, GmError> {
        Err(GmError::Infrastructure("connection refused".into()))
    }

    async fn session_entries(&self, _session_id: &str) -> Result<Vec<PlayLogEntry>, GmError> {
        Err(GmError::Infrastructure("connection refused".into()))
    }
}
