//! Gamemaster Core: shared turn types and service ports.
//!
//! This crate defines the data that flows through a turn (context, proposals,
//! diffs, snapshots), the error model, and the traits through which the turn
//! engine reaches the rule, scenario, state and language-model services and
//! the play-log store. It contains no infrastructure code.

pub mod clock;
pub mod context;
pub mod diff;
pub mod error;
pub mod outcome;
pub mod play_log;
pub mod ports;
pub mod snapshot;
