//! The typed record threaded through every stage of one turn.
//!
//! Stages never mutate a [`TurnContext`] directly. Each stage returns a
//! [`TurnUpdate`] naming only the fields it produced, and the orchestrator
//! merges it with [`TurnContext::apply`]. `apply` enforces write-once
//! semantics: a field assigned by an earlier stage can never be replaced,
//! except `user_input`, which an NPC turn may replace exactly once before
//! the rule check.

use serde::{Deserialize, Serialize};

use crate::diff::EntityDiff;
use crate::error::GmError;
use crate::outcome::{RuleOutcome, ScenarioSuggestion};
use crate::snapshot::WorldSnapshot;

/// Narrative grouping tags. Opaque to the pipeline; recorded with the turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnHierarchy {
    /// Act the turn belongs to.
    pub act_id: Option<String>,
    /// Sequence within the act.
    pub sequence_id: Option<String>,
    /// Kind of sequence, e.g. `COMBAT` or `EXPLORATION`.
    pub sequence_type: Option<String>,
    /// Ordinal of the sequence within the act.
    pub sequence_seq: Option<i32>,
}

/// Working state of one turn.
#[derive(Debug, Clone)]
pub struct TurnContext {
    session_id: String,
    user_input: String,
    is_npc_turn: bool,
    scenario_id: i64,
    hierarchy: TurnHierarchy,
    active_entity_id: Option<String>,
    world_snapshot: Option<WorldSnapshot>,
    turn_seq: Option<i64>,
    turn_id: Option<String>,
    rule_outcome: Option<RuleOutcome>,
    scenario_suggestion: Option<ScenarioSuggestion>,
    final_diffs: Option<Vec<EntityDiff>>,
    commit_id: Option<String>,
    narrative: Option<String>,
    user_input_replaced: bool,
}

impl TurnContext {
    /// Starts a player turn with the player's free-text action.
    #[must_use]
    pub fn player(
        session_id: impl Into<String>,
        user_input: impl Into<String>,
        scenario_id: i64,
        hierarchy: TurnHierarchy,
    ) -> Self {
        Self::new(session_id.into(), user_input.into(), false, scenario_id, hierarchy)
    }

    /// Starts an NPC turn. The action text is generated during the turn.
    #[must_use]
    pub fn npc(session_id: impl Into<String>, scenario_id: i64, hierarchy: TurnHierarchy) -> Self {
        Self::new(session_id.into(), String::new(), true, scenario_id, hierarchy)
    }

    fn new(
        session_id: String,
        user_input: String,
        is_npc_turn: bool,
        scenario_id: i64,
        hierarchy: TurnHierarchy,
    ) -> Self {
        Self {
            session_id,
            user_input,
            is_npc_turn,
            scenario_id,
            hierarchy,
            active_entity_id: None,
            world_snapshot: None,
            turn_seq: None,
            turn_id: None,
            rule_outcome: None,
            scenario_suggestion: None,
            final_diffs: None,
            commit_id: None,
            narrative: None,
            user_input_replaced: false,
        }
    }

    /// Session key.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Action text: the player's input, or the generated NPC action.
    #[must_use]
    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    /// Whether this is an NPC turn.
    #[must_use]
    pub const fn is_npc_turn(&self) -> bool {
        self.is_npc_turn
    }

    /// Scenario the session is playing.
    #[must_use]
    pub const fn scenario_id(&self) -> i64 {
        self.scenario_id
    }

    /// Narrative grouping tags.
    #[must_use]
    pub const fn hierarchy(&self) -> &TurnHierarchy {
        &self.hierarchy
    }

    /// Acting participant, once selected.
    #[must_use]
    pub fn active_entity_id(&self) -> Option<&str> {
        self.active_entity_id.as_deref()
    }

    /// World snapshot, if the state service provided one.
    #[must_use]
    pub const fn world_snapshot(&self) -> Option<&WorldSnapshot> {
        self.world_snapshot.as_ref()
    }

    /// Per-session sequence number, once assigned.
    #[must_use]
    pub const fn turn_seq(&self) -> Option<i64> {
        self.turn_seq
    }

    /// `{session_id}:{turn_seq}`, once assigned.
    #[must_use]
    pub fn turn_id(&self) -> Option<&str> {
        self.turn_id.as_deref()
    }

    /// Rules verdict, once checked.
    #[must_use]
    pub const fn rule_outcome(&self) -> Option<&RuleOutcome> {
        self.rule_outcome.as_ref()
    }

    /// Scenario verdict, once checked.
    #[must_use]
    pub const fn scenario_suggestion(&self) -> Option<&ScenarioSuggestion> {
        self.scenario_suggestion.as_ref()
    }

    /// Resolved diffs, once conflicts are resolved.
    #[must_use]
    pub fn final_diffs(&self) -> Option<&[EntityDiff]> {
        self.final_diffs.as_deref()
    }

    /// State-service commit id, once committed.
    #[must_use]
    pub fn commit_id(&self) -> Option<&str> {
        self.commit_id.as_deref()
    }

    /// Generated narrative, once produced.
    #[must_use]
    pub fn narrative(&self) -> Option<&str> {
        self.narrative.as_deref()
    }

    /// Merges a stage's output into the context.
    ///
    /// # Errors
    ///
    /// Returns `GmError::Invariant` if the update would overwrite a field an
    /// earlier stage already assigned, or would replace `user_input` outside
    /// the single pre-rule-check replacement allowed on NPC turns. The
    /// context is left untouched when an error is returned.
    pub fn apply(&mut self, update: TurnUpdate) -> Result<(), GmError> {
        self.check_update(&update)?;

        let TurnUpdate {
            world_snapshot,
            active_entity_id,
            user_input,
            turn_seq,
            turn_id,
            rule_outcome,
            scenario_suggestion,
            final_diffs,
            commit_id,
            narrative,
        } = update;

        if let Some(input) = user_input {
            self.user_input = input;
            self.user_input_replaced = true;
        }
        fill(&mut self.world_snapshot, world_snapshot);
        fill(&mut self.active_entity_id, active_entity_id);
        fill(&mut self.turn_seq, turn_seq);
        fill(&mut self.turn_id, turn_id);
        fill(&mut self.rule_outcome, rule_outcome);
        fill(&mut self.scenario_suggestion, scenario_suggestion);
        fill(&mut self.final_diffs, final_diffs);
        fill(&mut self.commit_id, commit_id);
        fill(&mut self.narrative, narrative);
        Ok(())
    }

    fn check_update(&self, update: &TurnUpdate) -> Result<(), GmError> {
        if update.user_input.is_some() {
            if !self.is_npc_turn {
                return Err(overwrite("user_input", "player input is fixed"));
            }
            if self.user_input_replaced {
                return Err(overwrite("user_input", "already replaced once"));
            }
            if self.rule_outcome.is_some() {
                return Err(overwrite("user_input", "rule check already ran"));
            }
        }

        let assigned = [
            ("world_snapshot", update.world_snapshot.is_some(), self.world_snapshot.is_some()),
            ("active_entity_id", update.active_entity_id.is_some(), self.active_entity_id.is_some()),
            ("turn_seq", update.turn_seq.is_some(), self.turn_seq.is_some()),
            ("turn_id", update.turn_id.is_some(), self.turn_id.is_some()),
            ("rule_outcome", update.rule_outcome.is_some(), self.rule_outcome.is_some()),
            (
                "scenario_suggestion",
                update.scenario_suggestion.is_some(),
                self.scenario_suggestion.is_some(),
            ),
            ("final_diffs", update.final_diffs.is_some(), self.final_diffs.is_some()),
            ("commit_id", update.commit_id.is_some(), self.commit_id.is_some()),
            ("narrative", update.narrative.is_some(), self.narrative.is_some()),
        ];
        match assigned.iter().find(|(_, incoming, present)| *incoming && *present) {
            Some((field, ..)) => Err(overwrite(field, "already assigned by an earlier stage")),
            None => Ok(()),
        }
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn overwrite(field: &str, why: &str) -> GmError {
    GmError::Invariant(format!("cannot overwrite `{field}`: {why}"))
}

/// The fields one stage produced. Unset fields are left alone on merge.
#[derive(Debug, Clone, Default)]
pub struct TurnUpdate {
    /// Snapshot fetched from the state service.
    pub world_snapshot: Option<WorldSnapshot>,
    /// Selected actor.
    pub active_entity_id: Option<String>,
    /// Generated NPC action text.
    pub user_input: Option<String>,
    /// Assigned sequence number.
    pub turn_seq: Option<i64>,
    /// Assigned turn id.
    pub turn_id: Option<String>,
    /// Rules verdict.
    pub rule_outcome: Option<RuleOutcome>,
    /// Scenario verdict.
    pub scenario_suggestion: Option<ScenarioSuggestion>,
    /// Resolved diffs.
    pub final_diffs: Option<Vec<EntityDiff>>,
    /// Commit id.
    pub commit_id: Option<String>,
    /// Narrative text.
    pub narrative: Option<String>,
}

impl TurnUpdate {
    /// An update that changes nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Names of the fields this update sets, in context field order.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("world_snapshot", self.world_snapshot.is_some()),
            ("active_entity_id", self.active_entity_id.is_some()),
            ("user_input", self.user_input.is_some()),
            ("turn_seq", self.turn_seq.is_some()),
            ("turn_id", self.turn_id.is_some()),
            ("rule_outcome", self.rule_outcome.is_some()),
            ("scenario_suggestion", self.scenario_suggestion.is_some()),
            ("final_diffs", self.final_diffs.is_some()),
            ("commit_id", self.commit_id.is_some()),
            ("narrative", self.narrative.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}
