//! Stage identities and the hook the pipeline calls around each stage.

use std::fmt;

use gamemaster_core::context::TurnContext;
use gamemaster_core::error::GmError;

/// One step of the turn pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Load the world snapshot.
    FetchState,
    /// Decide who acts.
    SelectActiveEntity,
    /// Write the NPC's action text.
    GenerateNpcInput,
    /// Assign `turn_seq` and `turn_id`.
    InitTurn,
    /// Ask the rules engine for a verdict.
    CheckRule,
    /// Ask the scenario engine for a verdict.
    CheckScenario,
    /// Reconcile both verdicts.
    ResolveConflicts,
    /// Commit the resolved diffs.
    CommitState,
    /// Narrate the outcome.
    GenerateNarrative,
    /// Record the turn in the play log.
    SaveLog,
}

impl Stage {
    /// Execution order, identical for player and NPC turns.
    pub const ORDER: [Self; 10] = [
        Self::FetchState,
        Self::SelectActiveEntity,
        Self::GenerateNpcInput,
        Self::InitTurn,
        Self::CheckRule,
        Self::CheckScenario,
        Self::ResolveConflicts,
        Self::CommitState,
        Self::GenerateNarrative,
        Self::SaveLog,
    ];

    /// Snake-case stage name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FetchState => "fetch_state",
            Self::SelectActiveEntity => "select_active_entity",
            Self::GenerateNpcInput => "generate_npc_input",
            Self::InitTurn => "init_turn",
            Self::CheckRule => "check_rule",
            Self::CheckScenario => "check_scenario",
            Self::ResolveConflicts => "resolve_conflicts",
            Self::CommitState => "commit_state",
            Self::GenerateNarrative => "generate_narrative",
            Self::SaveLog => "save_log",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observer invoked by the pipeline around every stage.
///
/// `after` receives the names of the context fields the stage assigned.
/// All methods default to doing nothing.
pub trait StageHook: Send + Sync {
    /// Called before `stage` runs.
    fn before(&self, _stage: Stage, _context: &TurnContext) {}

    /// Called after `stage` succeeded and its update was merged.
    fn after(&self, _stage: Stage, _context: &TurnContext, _updated: &[&'static str]) {}

    /// Called when `stage` failed; the turn is aborted afterwards.
    fn failed(&self, _stage: Stage, _context: &TurnContext, _error: &GmError) {}
}

/// Emits one structured `tracing` event per hook call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStageHook;

impl StageHook for TracingStageHook {
    fn before(&self, stage: Stage, context: &TurnContext) {
        tracing::info!(
            stage = stage.name(),
            session_id = context.session_id(),
            npc_turn = context.is_npc_turn(),
            "stage started"
        );
    }

    fn after(&self, stage: Stage, context: &TurnContext, updated: &[&'static str]) {
        tracing::info!(
            stage = stage.name(),
            session_id = context.session_id(),
            turn_id = context.turn_id().unwrap_or_default(),
            updated = ?updated,
            "stage finished"
        );
    }

    fn failed(&self, stage: Stage, context: &TurnContext, error: &GmError) {
        tracing::error!(
            stage = stage.name(),
            session_id = context.session_id(),
            turn_id = context.turn_id().unwrap_or_default(),
            error = %error,
            "stage failed"
        );
    }
}
