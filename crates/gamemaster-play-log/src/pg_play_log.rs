//! `PostgreSQL` implementation of the `PlayLogRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use gamemaster_core::error::GmError;
use gamemaster_core::play_log::{HistoryExchange, PlayLogEntry, PlayLogRepository};

/// PostgreSQL-backed play log.
#[derive(Debug, Clone)]
pub struct PgPlayLogRepository {
    pool: PgPool,
}

impl PgPlayLogRepository {
    /// Creates a new `PgPlayLogRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PlayLogRow {
    turn_id: String,
    session_id: String,
    turn_seq: i64,
    user_input: String,
    final_output: String,
    state_diff: Json<Value>,
    commit_id: String,
    act_id: Option<String>,
    sequence_id: Option<String>,
    sequence_type: Option<String>,
    sequence_seq: Option<i32>,
    active_entity_id: String,
    world_snapshot: Json<Value>,
    created_at: DateTime<Utc>,
}

impl From<PlayLogRow> for PlayLogEntry {
    fn from(row: PlayLogRow) -> Self {
        Self {
            turn_id: row.turn_id,
            session_id: row.session_id,
            turn_seq: row.turn_seq,
            user_input: row.user_input,
            final_output: row.final_output,
            state_diff: row.state_diff.0,
            commit_id: row.commit_id,
            act_id: row.act_id,
            sequence_id: row.sequence_id,
            sequence_type: row.sequence_type,
            sequence_seq: row.sequence_seq,
            active_entity_id: row.active_entity_id,
            world_snapshot: row.world_snapshot.0,
            created_at: row.created_at,
        }
    }
}

fn db_error(action: &str, error: &sqlx::Error) -> GmError {
    GmError::Infrastructure(format!("failed to {action}: {error}"))
}

#[async_trait]
impl PlayLogRepository for PgPlayLogRepository {
    async fn max_turn_seq(&self, session_id: &str) -> Result<Option<i64>, GmError> {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(turn_seq) FROM play_logs WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("read latest turn_seq", &e))
    }

    async fn append(&self, entry: &PlayLogEntry) -> Result<(), GmError> {
        sqlx::query(
            r"
            INSERT INTO play_logs (
                turn_id, session_id, turn_seq, user_input, final_output,
                state_diff, commit_id, act_id, sequence_id, sequence_type,
                sequence_seq, active_entity_id, world_snapshot, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(&entry.turn_id)
        .bind(&entry.session_id)
        .bind(entry.turn_seq)
        .bind(&entry.user_input)
        .bind(&entry.final_output)
        .bind(Json(&entry.state_diff))
        .bind(&entry.commit_id)
        .bind(&entry.act_id)
        .bind(&entry.sequence_id)
        .bind(&entry.sequence_type)
        .bind(entry.sequence_seq)
        .bind(&entry.active_entity_id)
        .bind(Json(&entry.world_snapshot))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert play log row", &e))?;

        tracing::debug!(turn_id = %entry.turn_id, "play log row inserted");
        Ok(())
    }

    async fn recent_exchanges(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<HistoryExchange>, GmError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r"
            SELECT user_input, final_output
            FROM play_logs
            WHERE session_id = $1
            ORDER BY turn_seq DESC
            LIMIT $2
            ",
        )
        .bind(session_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("read recent exchanges", &e))?;

        Ok(rows
            .into_iter()
            .map(|(player_input, narrative)| HistoryExchange {
                player_input,
                narrative,
            })
            .collect())
    }

    async fn session_entries(&self, session_id: &str) -> Result<Vec<PlayLogEntry>, GmError> {
        let rows: Vec<PlayLogRow> = sqlx::query_as(
            r"
            SELECT turn_id, session_id, turn_seq, user_input, final_output,
                   state_diff, commit_id, act_id, sequence_id, sequence_type,
                   sequence_seq, active_entity_id, world_snapshot, created_at
            FROM play_logs
            WHERE session_id = $1
            ORDER BY turn_seq ASC
            ",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("read session history", &e))?;

        Ok(rows.into_iter().map(PlayLogEntry::from).collect())
    }
}
