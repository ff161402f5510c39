//! Shared test fakes for the Gamemaster turn engine.

mod clock;
mod fixtures;
mod llm;
mod play_log;
mod services;

pub use clock::FixedClock;
pub use fixtures::{diff, rule_outcome, scenario_suggestion, snapshot_of};
pub use llm::ScriptedLlm;
pub use play_log::{FailingPlayLog, InMemoryPlayLog};
pub use services::{RecordingStateService, StubRuleService, StubScenarioService};
