//! Stage orchestration, sequencing and the public engine API.

pub mod engine;
pub mod instrumentation;
pub mod pipeline;
pub mod sequencer;
