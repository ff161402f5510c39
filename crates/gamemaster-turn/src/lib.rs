//! Gamemaster turn engine.
//!
//! Turns a player's free-text action (or a generated NPC action) into an
//! authoritative set of world-state changes and a piece of narrative: rules
//! and scenario verdicts are reconciled, committed to the state service,
//! narrated by the language model, and recorded in the play log.

pub mod application;
pub mod domain;
