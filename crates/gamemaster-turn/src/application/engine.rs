//! The game engine: public entry points for turns, history and health.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use gamemaster_core::clock::Clock;
use gamemaster_core::context::{TurnContext, TurnHierarchy};
use gamemaster_core::error::GmError;
use gamemaster_core::play_log::{PlayLogEntry, PlayLogRepository};
use serde::Serialize;

use crate::application::instrumentation::StageHook;
use crate::application::pipeline::{PipelineSettings, ServicePorts, TurnPipeline};
use crate::application::sequencer::TurnSequencer;

/// Scenario id and hierarchy tags stamped on new turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnDefaults {
    /// Scenario id sent to the rules engine.
    pub scenario_id: i64,
    /// Tags for player turns.
    pub player: TurnHierarchy,
    /// Tags for NPC turns.
    pub npc: TurnHierarchy,
}

impl Default for TurnDefaults {
    fn default() -> Self {
        let tags = |sequence_type: &str| TurnHierarchy {
            act_id: Some("act_1".to_owned()),
            sequence_id: Some("seq_1".to_owned()),
            sequence_type: Some(sequence_type.to_owned()),
            sequence_seq: Some(1),
        };
        Self {
            scenario_id: 0,
            player: tags("EXPLORATION"),
            npc: tags("COMBAT"),
        }
    }
}

/// Engine construction options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    /// Pipeline tunables.
    pub pipeline: PipelineSettings,
    /// Tags for new turns.
    pub defaults: TurnDefaults,
}

/// Result of an NPC turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcTurnResult {
    /// `{session_id}:{turn_seq}`.
    pub turn_id: String,
    /// Narrative of the NPC's action.
    pub narrative: String,
    /// State-service commit id.
    pub commit_id: String,
    /// Which NPC acted.
    pub active_entity_id: String,
    /// Always `true`.
    pub is_npc_turn: bool,
}

/// Result of a player turn, including the NPC turn that followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerTurnResult {
    /// `{session_id}:{turn_seq}`.
    pub turn_id: String,
    /// Narrative of the player's action.
    pub narrative: String,
    /// State-service commit id.
    pub commit_id: String,
    /// The NPC turn run right after.
    pub npc_turn: NpcTurnResult,
}

/// Aggregate health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Every service reported healthy.
    Ok,
    /// At least one service is unhealthy or unreachable.
    Degraded,
}

/// Per-service health: `"ok"`, `"error"` or `"error: <reason>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatuses {
    /// Rules engine.
    pub rule: String,
    /// Scenario engine.
    pub scenario: String,
    /// State store.
    pub state: String,
    /// Language model.
    pub llm: String,
}

/// Result of [`GameEngine::system_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemStatus {
    /// `ok` only if every service is `ok`.
    pub status: OverallStatus,
    /// Per-service detail.
    pub services: ServiceStatuses,
}

/// One async mutex per active session id. Entries die with their last
/// holder and are pruned on the next acquisition.
#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    fn handle(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = locks.get(session_id).and_then(Weak::upgrade) {
            return existing;
        }
        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(session_id.to_owned(), Arc::downgrade(&lock));
        lock
    }
}

/// Composition root for turn processing.
///
/// Turns of the same session are serialised, so `turn_seq` allocation never
/// races within one process; turns of different sessions run concurrently.
pub struct GameEngine {
    ports: ServicePorts,
    pipeline: TurnPipeline,
    sequencer: TurnSequencer,
    defaults: TurnDefaults,
    locks: SessionLocks,
}

impl GameEngine {
    /// Wires the engine from its ports, play log and clock.
    #[must_use]
    pub fn new(
        ports: ServicePorts,
        play_log: Arc<dyn PlayLogRepository>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let sequencer = TurnSequencer::new(play_log, clock);
        let pipeline = TurnPipeline::new(ports.clone(), sequencer.clone(), settings.pipeline);
        Self {
            ports,
            pipeline,
            sequencer,
            defaults: settings.defaults,
            locks: SessionLocks::default(),
        }
    }

    /// Replaces the stage hook used by the pipeline.
    #[must_use]
    pub fn with_stage_hook(mut self, hook: Arc<dyn StageHook>) -> Self {
        self.pipeline = self.pipeline.with_hook(hook);
        self
    }

    /// Runs a player turn followed by an NPC turn in the same session.
    ///
    /// # Errors
    ///
    /// Returns `GmError::Validation` for a blank session id or action, or the
    /// first fatal error of either turn. If the NPC turn fails the player
    /// turn stays committed and recorded.
    pub async fn process_player_turn(
        &self,
        session_id: &str,
        content: &str,
    ) -> Result<PlayerTurnResult, GmError> {
        validate_session_id(session_id)?;
        if content.trim().is_empty() {
            return Err(GmError::Validation("content must not be blank".to_owned()));
        }

        let lock = self.locks.handle(session_id);
        let _guard = lock.lock().await;

        let context = TurnContext::player(
            session_id,
            content,
            self.defaults.scenario_id,
            self.defaults.player.clone(),
        );
        let player = Finished::from_context(&self.pipeline.run(context).await?)?;
        let npc_turn = self.run_npc_turn(session_id).await?;

        Ok(PlayerTurnResult {
            turn_id: player.turn_id,
            narrative: player.narrative,
            commit_id: player.commit_id,
            npc_turn,
        })
    }

    /// Runs one NPC turn.
    ///
    /// # Errors
    ///
    /// Returns `GmError::Validation` for a blank session id, or the first
    /// fatal error of the turn.
    pub async fn process_npc_turn(&self, session_id: &str) -> Result<NpcTurnResult, GmError> {
        validate_session_id(session_id)?;
        let lock = self.locks.handle(session_id);
        let _guard = lock.lock().await;
        self.run_npc_turn(session_id).await
    }

    async fn run_npc_turn(&self, session_id: &str) -> Result<NpcTurnResult, GmError> {
        let context = TurnContext::npc(
            session_id,
            self.defaults.scenario_id,
            self.defaults.npc.clone(),
        );
        let finished = Finished::from_context(&self.pipeline.run(context).await?)?;
        Ok(NpcTurnResult {
            turn_id: finished.turn_id,
            narrative: finished.narrative,
            commit_id: finished.commit_id,
            active_entity_id: finished.active_entity_id,
            is_npc_turn: true,
        })
    }

    /// Every recorded turn of the session, by ascending `turn_seq`.
    ///
    /// # Errors
    ///
    /// Returns `GmError::Validation` for a blank session id, or the play
    /// log's error if it cannot be read.
    pub async fn get_session_history(&self, session_id: &str) -> Result<Vec<PlayLogEntry>, GmError> {
        validate_session_id(session_id)?;
        self.sequencer.session_entries(session_id).await
    }

    /// Health-checks all four services concurrently.
    pub async fn system_status(&self) -> SystemStatus {
        let (rule, scenario, state, llm) = tokio::join!(
            self.ports.rule.check_health(),
            self.ports.scenario.check_health(),
            self.ports.state.check_health(),
            self.ports.llm.check_health(),
        );
        let services = ServiceStatuses {
            rule: describe(rule),
            scenario: describe(scenario),
            state: describe(state),
            llm: describe(llm),
        };
        let all_ok = [&services.rule, &services.scenario, &services.state, &services.llm]
            .iter()
            .all(|status| status.as_str() == "ok");
        SystemStatus {
            status: if all_ok {
                OverallStatus::Ok
            } else {
                OverallStatus::Degraded
            },
            services,
        }
    }
}

fn validate_session_id(session_id: &str) -> Result<(), GmError> {
    if session_id.trim().is_empty() {
        return Err(GmError::Validation("session_id must not be blank".to_owned()));
    }
    Ok(())
}

fn describe(health: Result<bool, GmError>) -> String {
    match health {
        Ok(true) => "ok".to_owned(),
        Ok(false) => "error".to_owned(),
        Err(e) => format!("error: {e}"),
    }
}

/// The caller-visible fields of a completed turn.
struct Finished {
    turn_id: String,
    narrative: String,
    commit_id: String,
    active_entity_id: String,
}

impl Finished {
    fn from_context(context: &TurnContext) -> Result<Self, GmError> {
        let field = |value: Option<&str>, name: &str| {
            value
                .map(ToOwned::to_owned)
                .ok_or_else(|| GmError::Invariant(format!("completed turn has no `{name}`")))
        };
        Ok(Self {
            turn_id: field(context.turn_id(), "turn_id")?,
            narrative: field(context.narrative(), "narrative")?,
            commit_id: field(context.commit_id(), "commit_id")?,
            active_entity_id: field(context.active_entity_id(), "active_entity_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use gamemaster_core::diff::EntityDiff;
    use gamemaster_core::error::ServiceKind;
    use gamemaster_core::outcome::{RuleOutcome, ScenarioSuggestion};
    use gamemaster_core::ports::{
        ChatRequest, CommitReceipt, LlmService, RuleCheckRequest, RuleService, ScenarioService,
        StateService,
    };
    use gamemaster_core::snapshot::WorldSnapshot;
    use gamemaster_test_support::{
        FailingPlayLog, FixedClock, InMemoryPlayLog, RecordingStateService, ScriptedLlm,
        StubRuleService, StubScenarioService, diff, rule_outcome, scenario_suggestion, snapshot_of,
    };
    use serde_json::json;
    use tokio::sync::Barrier;

    use super::*;

    fn ports(state: RecordingStateService, llm: ScriptedLlm) -> ServicePorts {
        ServicePorts {
            rule: Arc::new(StubRuleService::returning(rule_outcome(vec![diff(
                "player",
                json!({"hp": -10}),
            )]))),
            scenario: Arc::new(StubScenarioService::returning(scenario_suggestion(
                vec![diff("player", json!({"hp": -5}))],
                None,
            ))),
            state: Arc::new(state),
            llm: Arc::new(llm),
        }
    }

    fn engine(ports: ServicePorts, log: Arc<dyn PlayLogRepository>) -> GameEngine {
        GameEngine::new(
            ports,
            log,
            Arc::new(FixedClock::at("2026-01-15T10:00:00Z")),
            EngineSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_player_turn_is_followed_by_npc_turn() {
        // Arrange
        let log = Arc::new(InMemoryPlayLog::new());
        let llm = ScriptedLlm::replying(&[
            "You strike the goblin.",
            "goblin",
            "I swing my club.",
            "The goblin swings wildly.",
        ]);
        let engine = engine(
            ports(RecordingStateService::new(snapshot_of(&["player", "goblin"])), llm),
            log.clone(),
        );

        // Act
        let result = engine.process_player_turn("s1", "I attack").await.unwrap();

        // Assert
        assert_eq!(result.turn_id, "s1:1");
        assert_eq!(result.narrative, "You strike the goblin.");
        assert_eq!(result.commit_id, "commit_s1:1");
        assert_eq!(result.npc_turn.turn_id, "s1:2");
        assert_eq!(result.npc_turn.active_entity_id, "goblin");
        assert_eq!(result.npc_turn.narrative, "The goblin swings wildly.");
        assert!(result.npc_turn.is_npc_turn);

        let rows = log.entries();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sequence_type.as_deref(), Some("EXPLORATION"));
        assert_eq!(rows[1].sequence_type.as_deref(), Some("COMBAT"));
        assert_eq!(rows[1].user_input, "I swing my club.");
    }

    #[tokio::test]
    async fn test_turn_seq_increases_across_turns() {
        // Arrange
        let log = Arc::new(InMemoryPlayLog::new());
        let engine = engine(
            ports(
                RecordingStateService::new(snapshot_of(&["player"])),
                ScriptedLlm::always("Time passes."),
            ),
            log.clone(),
        );

        // Act
        for _ in 0..3 {
            engine.process_npc_turn("s1").await.unwrap();
        }
        engine.process_npc_turn("s2").await.unwrap();

        // Assert
        let history = engine.get_session_history("s1").await.unwrap();
        let seqs: Vec<i64> = history.iter().map(|e| e.turn_seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(engine.get_session_history("s2").await.unwrap()[0].turn_seq, 1);
    }

    #[tokio::test]
    async fn test_concurrent_turns_in_one_session_get_distinct_seqs() {
        // Arrange
        let log = Arc::new(InMemoryPlayLog::new());
        let engine = Arc::new(engine(
            ports(
                RecordingStateService::new(snapshot_of(&["player"])),
                ScriptedLlm::always("Steel rings."),
            ),
            log.clone(),
        ));

        // Act
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.process_npc_turn("s1").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Assert
        let mut seqs: Vec<i64> = log.entries().iter().map(|e| e.turn_seq).collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (1..=8).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_commit_failure_surfaces_and_records_nothing() {
        // Arrange
        let log = Arc::new(InMemoryPlayLog::new());
        let llm = Arc::new(ScriptedLlm::always("never"));
        let mut ports = ports(
            RecordingStateService::new(snapshot_of(&["player"])).with_commit_status(500),
            ScriptedLlm::always("unused"),
        );
        ports.llm = llm.clone();
        let engine = engine(ports, log.clone());

        // Act
        let result = engine.process_player_turn("s1", "I attack").await;

        // Assert
        assert!(matches!(result, Err(GmError::Upstream { status: 500, .. })));
        assert_eq!(llm.call_count(), 0);
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_turn_ids_stay_unique_when_narration_fails_after_commit() {
        // Arrange
        let log = Arc::new(InMemoryPlayLog::new());
        let state = Arc::new(RecordingStateService::new(snapshot_of(&["player"])));
        let llm = ScriptedLlm::new(vec![
            Err(GmError::Transport {
                service: ServiceKind::Llm,
                message: "down".to_owned(),
            }),
            Ok("fine".to_owned()),
        ]);
        let mut ports = ports(RecordingStateService::new(snapshot_of(&["player"])), llm);
        ports.state = state.clone();
        let engine = engine(ports, log.clone());

        // Act
        let first = engine.process_player_turn("s1", "I attack").await;
        let second = engine.process_player_turn("s1", "I attack again").await;

        // Assert
        assert!(matches!(first, Err(GmError::Transport { .. })));
        assert_eq!(second.unwrap().turn_id, "s1:2");
        let committed: Vec<String> = state.commits().into_iter().map(|(id, _)| id).collect();
        assert_eq!(committed, vec!["s1:1", "s1:2", "s1:3"]);
        let seqs: Vec<i64> = log.entries().iter().map(|e| e.turn_seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        // Arrange
        let engine = engine(
            ports(
                RecordingStateService::new(snapshot_of(&["player"])),
                ScriptedLlm::always("unused"),
            ),
            Arc::new(InMemoryPlayLog::new()),
        );

        // Act & Assert
        assert!(matches!(
            engine.process_player_turn("s1", "   ").await,
            Err(GmError::Validation(_))
        ));
        assert!(matches!(
            engine.process_npc_turn("").await,
            Err(GmError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_history_read_failure_propagates() {
        // Arrange
        let engine = engine(
            ports(
                RecordingStateService::new(snapshot_of(&["player"])),
                ScriptedLlm::always("unused"),
            ),
            Arc::new(FailingPlayLog),
        );

        // Act
        let result = engine.get_session_history("s1").await;

        // Assert
        assert!(matches!(result, Err(GmError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_system_status_ok_when_all_healthy() {
        // Arrange
        let engine = engine(
            ports(
                RecordingStateService::new(snapshot_of(&["player"])),
                ScriptedLlm::always("unused"),
            ),
            Arc::new(InMemoryPlayLog::new()),
        );

        // Act
        let status = engine.system_status().await;

        // Assert
        assert_eq!(status.status, OverallStatus::Ok);
        assert_eq!(status.services.rule, "ok");
        assert_eq!(status.services.llm, "ok");
    }

    #[tokio::test]
    async fn test_system_status_degraded_reports_each_failure_mode() {
        // Arrange
        let state = RecordingStateService::new(snapshot_of(&["player"])).with_health(Ok(false));
        let llm = ScriptedLlm::always("unused").with_health(Err(GmError::Transport {
            service: ServiceKind::Llm,
            message: "connection refused".to_owned(),
        }));
        let engine = engine(ports(state, llm), Arc::new(InMemoryPlayLog::new()));

        // Act
        let status = engine.system_status().await;

        // Assert
        assert_eq!(status.status, OverallStatus::Degraded);
        assert_eq!(status.services.scenario, "ok");
        assert_eq!(status.services.state, "error");
        assert_eq!(
            status.services.llm,
            "error: llm service unreachable: connection refused"
        );
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "degraded");
    }

    /// Every health check waits until all four checks are in flight.
    struct GatedHealth(Arc<Barrier>);

    impl GatedHealth {
        async fn pass(&self) -> Result<bool, GmError> {
            self.0.wait().await;
            Ok(true)
        }
    }

    #[async_trait]
    impl RuleService for GatedHealth {
        async fn check(&self, _request: &RuleCheckRequest) -> Result<RuleOutcome, GmError> {
            Err(GmError::Invariant("not used".to_owned()))
        }

        async fn check_health(&self) -> Result<bool, GmError> {
            self.pass().await
        }
    }

    #[async_trait]
    impl ScenarioService for GatedHealth {
        async fn check(
            &self,
            _input_text: &str,
            _rule_outcome: &RuleOutcome,
        ) -> Result<ScenarioSuggestion, GmError> {
            Err(GmError::Invariant("not used".to_owned()))
        }

        async fn check_health(&self) -> Result<bool, GmError> {
            self.pass().await
        }
    }

    #[async_trait]
    impl StateService for GatedHealth {
        async fn get_state(&self, _session_id: &str) -> Result<WorldSnapshot, GmError> {
            Err(GmError::Invariant("not used".to_owned()))
        }

        async fn commit(&self, _turn_id: &str, _diffs: &[EntityDiff]) -> Result<CommitReceipt, GmError> {
            Err(GmError::Invariant("not used".to_owned()))
        }

        async fn check_health(&self) -> Result<bool, GmError> {
            self.pass().await
        }
    }

    #[async_trait]
    impl LlmService for GatedHealth {
        async fn chat(&self, _request: &ChatRequest) -> Result<String, GmError> {
            Err(GmError::Invariant("not used".to_owned()))
        }

        async fn check_health(&self) -> Result<bool, GmError> {
            self.pass().await
        }
    }

    #[tokio::test]
    async fn test_system_status_runs_health_checks_concurrently() {
        // Arrange
        let gate = Arc::new(GatedHealth(Arc::new(Barrier::new(4))));
        let ports = ServicePorts {
            rule: gate.clone(),
            scenario: gate.clone(),
            state: gate.clone(),
            llm: gate,
        };
        let engine = engine(ports, Arc::new(InMemoryPlayLog::new()));

        // Act
        let status = tokio::time::timeout(Duration::from_secs(5), engine.system_status()).await;

        // Assert
        let status = status.expect("health checks ran one after another");
        assert_eq!(status.status, OverallStatus::Ok);
    }

    #[test]
    fn test_session_locks_share_handle_while_held() {
        // Arrange
        let locks = SessionLocks::default();

        // Act
        let first = locks.handle("s1");
        let second = locks.handle("s1");
        let other = locks.handle("s2");

        // Assert
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_session_locks_are_pruned_once_released() {
        // Arrange
        let locks = SessionLocks::default();
        drop(locks.handle("s1"));

        // Act
        let _fresh = locks.handle("s2");

        // Assert
        let map = locks.locks.lock().unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("s2"));
    }
}
