//! PostgreSQL-backed play log.
//!
//! The `play_logs` table is created by the workspace `migrations/` set.

pub mod pg_play_log;

pub use pg_play_log::PgPlayLogRepository;
