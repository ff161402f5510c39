//! The ten-stage turn pipeline.
//!
//! Stages run strictly in [`Stage::ORDER`]. Each stage reads the context and
//! returns a [`TurnUpdate`]; the pipeline merges it and reports to the
//! [`StageHook`]. Failures of the state fetch, history reads and the play-log
//! append are absorbed. Failures of the rule check, scenario check and
//! commit abort the turn before any narrative is generated. A narrative
//! failure after the commit still records the turn before surfacing.

use std::sync::Arc;

use gamemaster_core::context::{TurnContext, TurnUpdate};
use gamemaster_core::error::GmError;
use gamemaster_core::ports::{LlmService, RuleCheckRequest, RuleService, ScenarioService, StateService};
use gamemaster_core::snapshot::PLAYER_ENTITY_ID;

use crate::application::instrumentation::{Stage, StageHook, TracingStageHook};
use crate::application::sequencer::TurnSequencer;
use crate::domain::{prompts, resolution};

/// The four external collaborators of a turn.
#[derive(Clone)]
pub struct ServicePorts {
    /// Rules engine.
    pub rule: Arc<dyn RuleService>,
    /// Scenario engine.
    pub scenario: Arc<dyn ScenarioService>,
    /// State store.
    pub state: Arc<dyn StateService>,
    /// Language model.
    pub llm: Arc<dyn LlmService>,
}

/// Tunables of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Past exchanges shown to the model on NPC turns.
    pub history_window: u32,
    /// Narrative attempts made while the required slot is missing.
    pub narrative_max_attempts: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            history_window: 5,
            narrative_max_attempts: 3,
        }
    }
}

/// Runs one turn from a fresh context to a recorded result.
pub struct TurnPipeline {
    ports: ServicePorts,
    sequencer: TurnSequencer,
    hook: Arc<dyn StageHook>,
    settings: PipelineSettings,
}

impl TurnPipeline {
    /// Creates a pipeline that logs stages through `tracing`.
    #[must_use]
    pub fn new(ports: ServicePorts, sequencer: TurnSequencer, settings: PipelineSettings) -> Self {
        Self {
            ports,
            sequencer,
            hook: Arc::new(TracingStageHook),
            settings,
        }
    }

    /// Replaces the stage hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn StageHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Runs every stage against `context` and returns the completed context.
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage error: a rule, scenario or commit
    /// failure, a narrative-generation failure, or `GmError::Invariant` if a
    /// stage's output conflicts with the context. A turn that fails after
    /// its commit is still recorded, with an empty narrative.
    pub async fn run(&self, mut context: TurnContext) -> Result<TurnContext, GmError> {
        for stage in Stage::ORDER {
            self.hook.before(stage, &context);
            let merged = match self.run_stage(stage, &context).await {
                Ok(update) => {
                    let updated = update.changed_fields();
                    context.apply(update).map(|()| updated)
                }
                Err(e) => Err(e),
            };
            match merged {
                Ok(updated) => self.hook.after(stage, &context, &updated),
                Err(e) => {
                    self.hook.failed(stage, &context, &e);
                    if context.commit_id().is_some() {
                        self.record_unnarrated(context).await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(context)
    }

    /// Records a turn whose state commit went through but whose later stages
    /// failed, so its `turn_seq` is never handed out again.
    async fn record_unnarrated(&self, mut context: TurnContext) {
        if context.narrative().is_none() {
            let blank = TurnUpdate {
                narrative: Some(String::new()),
                ..TurnUpdate::none()
            };
            if let Err(e) = context.apply(blank) {
                tracing::error!(error = %e, "cannot mark committed turn as unnarrated");
                return;
            }
        }
        tracing::warn!(
            turn_id = context.turn_id().unwrap_or_default(),
            "recording committed turn without narrative"
        );
        self.save_log(&context).await;
    }

    async fn run_stage(&self, stage: Stage, context: &TurnContext) -> Result<TurnUpdate, GmError> {
        match stage {
            Stage::FetchState => Ok(self.fetch_state(context).await),
            Stage::SelectActiveEntity => Ok(self.select_active_entity(context).await),
            Stage::GenerateNpcInput => self.generate_npc_input(context).await,
            Stage::InitTurn => Ok(self.init_turn(context).await),
            Stage::CheckRule => self.check_rule(context).await,
            Stage::CheckScenario => self.check_scenario(context).await,
            Stage::ResolveConflicts => resolve_conflicts(context),
            Stage::CommitState => self.commit_state(context).await,
            Stage::GenerateNarrative => self.generate_narrative(context).await,
            Stage::SaveLog => Ok(self.save_log(context).await),
        }
    }

    async fn fetch_state(&self, context: &TurnContext) -> TurnUpdate {
        match self.ports.state.get_state(context.session_id()).await {
            Ok(snapshot) => TurnUpdate {
                world_snapshot: Some(snapshot),
                ..TurnUpdate::none()
            },
            Err(e) => {
                tracing::warn!(
                    session_id = context.session_id(),
                    error = %e,
                    "world snapshot unavailable, continuing without it"
                );
                TurnUpdate::none()
            }
        }
    }

    async fn select_active_entity(&self, context: &TurnContext) -> TurnUpdate {
        let actor = if context.is_npc_turn() {
            self.pick_npc(context).await
        } else {
            PLAYER_ENTITY_ID.to_owned()
        };
        TurnUpdate {
            active_entity_id: Some(actor),
            ..TurnUpdate::none()
        }
    }

    async fn pick_npc(&self, context: &TurnContext) -> String {
        let candidates = context
            .world_snapshot()
            .map(|snapshot| snapshot.npc_candidates())
            .unwrap_or_default();
        let Some(first) = candidates.first() else {
            tracing::warn!(
                session_id = context.session_id(),
                "no NPC candidates in snapshot, using generic actor"
            );
            return prompts::GENERIC_NPC_ID.to_owned();
        };

        let history = self
            .sequencer
            .history(context.session_id(), self.settings.history_window)
            .await;
        let request = prompts::select_actor(&candidates, &history);
        match self.ports.llm.chat(&request).await {
            Ok(answer) if !answer.trim().is_empty() => answer.trim().to_owned(),
            Ok(_) => {
                tracing::warn!(fallback = *first, "actor selection answered blank, using first candidate");
                (*first).to_owned()
            }
            Err(e) => {
                tracing::warn!(fallback = *first, error = %e, "actor selection failed, using first candidate");
                (*first).to_owned()
            }
        }
    }

    async fn generate_npc_input(&self, context: &TurnContext) -> Result<TurnUpdate, GmError> {
        if !context.is_npc_turn() {
            return Ok(TurnUpdate::none());
        }
        let actor = require(context.active_entity_id(), "active_entity_id")?;

        let history = self
            .sequencer
            .history(context.session_id(), self.settings.history_window)
            .await;
        let action = match self.ports.llm.chat(&prompts::npc_action(actor, &history)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_owned(),
            Ok(_) => {
                tracing::warn!(actor, "NPC action came back blank, using fallback");
                prompts::fallback_npc_action(actor)
            }
            Err(e) => {
                tracing::warn!(actor, error = %e, "NPC action generation failed, using fallback");
                prompts::fallback_npc_action(actor)
            }
        };
        Ok(TurnUpdate {
            user_input: Some(action),
            ..TurnUpdate::none()
        })
    }

    async fn init_turn(&self, context: &TurnContext) -> TurnUpdate {
        let seq = self.sequencer.next_seq(context.session_id()).await;
        TurnUpdate {
            turn_seq: Some(seq),
            turn_id: Some(format!("{}:{seq}", context.session_id())),
            ..TurnUpdate::none()
        }
    }

    async fn check_rule(&self, context: &TurnContext) -> Result<TurnUpdate, GmError> {
        let outcome = self
            .ports
            .rule
            .check(&RuleCheckRequest::from_context(context))
            .await?;
        Ok(TurnUpdate {
            rule_outcome: Some(outcome),
            ..TurnUpdate::none()
        })
    }

    async fn check_scenario(&self, context: &TurnContext) -> Result<TurnUpdate, GmError> {
        let rule = require(context.rule_outcome(), "rule_outcome")?;
        let suggestion = self
            .ports
            .scenario
            .check(context.user_input(), rule)
            .await?;
        Ok(TurnUpdate {
            scenario_suggestion: Some(suggestion),
            ..TurnUpdate::none()
        })
    }

    async fn commit_state(&self, context: &TurnContext) -> Result<TurnUpdate, GmError> {
        let turn_id = require(context.turn_id(), "turn_id")?;
        let diffs = require(context.final_diffs(), "final_diffs")?;
        let receipt = self.ports.state.commit(turn_id, diffs).await?;
        Ok(TurnUpdate {
            commit_id: Some(receipt.commit_id),
            ..TurnUpdate::none()
        })
    }

    async fn generate_narrative(&self, context: &TurnContext) -> Result<TurnUpdate, GmError> {
        let rule = require(context.rule_outcome(), "rule_outcome")?;
        let suggestion = require(context.scenario_suggestion(), "scenario_suggestion")?;
        let actor = context.active_entity_id().unwrap_or(PLAYER_ENTITY_ID);
        let request = prompts::narrate(actor, context.user_input(), rule);

        let max_attempts = self.settings.narrative_max_attempts.max(1);
        let mut narrative = String::new();
        for attempt in 1..=max_attempts {
            narrative = self.ports.llm.chat(&request).await?;
            if suggestion.is_satisfied_by(&narrative) {
                break;
            }
            tracing::warn!(
                turn_id = context.turn_id().unwrap_or_default(),
                slot = suggestion.narrative_slot.as_deref().unwrap_or_default(),
                attempt,
                max_attempts,
                "narrative is missing the required slot"
            );
        }
        Ok(TurnUpdate {
            narrative: Some(narrative),
            ..TurnUpdate::none()
        })
    }

    async fn save_log(&self, context: &TurnContext) -> TurnUpdate {
        if let Err(e) = self.sequencer.append(context).await {
            tracing::error!(
                turn_id = context.turn_id().unwrap_or_default(),
                error = %e,
                "failed to record turn in play log"
            );
        }
        TurnUpdate::none()
    }
}

fn resolve_conflicts(context: &TurnContext) -> Result<TurnUpdate, GmError> {
    let rule = require(context.rule_outcome(), "rule_outcome")?;
    let suggestion = require(context.scenario_suggestion(), "scenario_suggestion")?;
    Ok(TurnUpdate {
        final_diffs: Some(resolution::resolve(rule, suggestion)),
        ..TurnUpdate::none()
    })
}

fn require<'a, T: ?Sized>(value: Option<&'a T>, field: &str) -> Result<&'a T, GmError> {
    value.ok_or_else(|| GmError::Invariant(format!("`{field}` must be set before this stage")))
}
