//! Pure turn logic with no I/O.

pub mod prompts;
pub mod resolution;
