//! Integration tests for `PgPlayLogRepository`.

use chrono::{TimeZone, Utc};
use gamemaster_core::error::GmError;
use gamemaster_core::play_log::{PlayLogEntry, PlayLogRepository};
use gamemaster_play_log::PgPlayLogRepository;
use sqlx::PgPool;

/// Helper to build a `PlayLogEntry` with sensible defaults.
fn make_entry(session_id: &str, turn_seq: i64) -> PlayLogEntry {
    PlayLogEntry {
        turn_id: format!("{session_id}:{turn_seq}"),
        session_id: session_id.to_owned(),
        turn_seq,
        user_input: format!("input {turn_seq}"),
        final_output: format!("narrative {turn_seq}"),
        state_diff: serde_json::json!([{"entity_id": "player", "diff": {"hp": -10}}]),
        commit_id: format!("commit-{turn_seq}"),
        act_id: Some("act_1".to_owned()),
        sequence_id: Some("seq_1".to_owned()),
        sequence_type: Some("EXPLORATION".to_owned()),
        sequence_seq: Some(1),
        active_entity_id: "player".to_owned(),
        world_snapshot: serde_json::json!({"entities": ["player"], "relations": []}),
        created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    }
}

// --- max_turn_seq ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_max_turn_seq_is_none_for_new_session(pool: PgPool) {
    let repo = PgPlayLogRepository::new(pool);

    let max = repo.max_turn_seq("fresh").await.unwrap();

    assert_eq!(max, None);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_max_turn_seq_tracks_highest_row(pool: PgPool) {
    let repo = PgPlayLogRepository::new(pool);
    repo.append(&make_entry("s1", 1)).await.unwrap();
    repo.append(&make_entry("s1", 2)).await.unwrap();
    repo.append(&make_entry("other", 9)).await.unwrap();

    let max = repo.max_turn_seq("s1").await.unwrap();

    assert_eq!(max, Some(2));
}

// --- append + session_entries round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_and_load_preserves_every_column(pool: PgPool) {
    let repo = PgPlayLogRepository::new(pool);
    let entry = make_entry("s1", 1);

    repo.append(&entry).await.unwrap();

    let loaded = repo.session_entries("s1").await.unwrap();
    assert_eq!(loaded, vec![entry]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_session_entries_are_ordered_by_turn_seq(pool: PgPool) {
    let repo = PgPlayLogRepository::new(pool);
    for seq in [3, 1, 2] {
        repo.append(&make_entry("s1", seq)).await.unwrap();
    }

    let loaded = repo.session_entries("s1").await.unwrap();

    let seqs: Vec<i64> = loaded.iter().map(|e| e.turn_seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_duplicate_turn_seq_is_rejected(pool: PgPool) {
    let repo = PgPlayLogRepository::new(pool);
    repo.append(&make_entry("s1", 1)).await.unwrap();
    let mut clash = make_entry("s1", 1);
    clash.turn_id = "s1:1-retry".to_owned();

    let result = repo.append(&clash).await;

    assert!(matches!(result, Err(GmError::Infrastructure(_))));
}

// --- recent_exchanges ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_recent_exchanges_returns_newest_first_up_to_limit(pool: PgPool) {
    let repo = PgPlayLogRepository::new(pool);
    for seq in 1..=4 {
        repo.append(&make_entry("s1", seq)).await.unwrap();
    }

    let recent = repo.recent_exchanges("s1", 2).await.unwrap();

    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].player_input, "input 4");
    assert_eq!(recent[1].narrative, "narrative 3");
}
