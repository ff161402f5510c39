//! Fakes for the rule, scenario and state ports.

use std::sync::Mutex;

use async_trait::async_trait;
use gamemaster_core::diff::EntityDiff;
use gamemaster_core::error::{GmError, ServiceKind};
use gamemaster_core::outcome::{RuleOutcome, ScenarioSuggestion};
use gamemaster_core::ports::{
    CommitReceipt, RuleCheckRequest, RuleService, ScenarioService, StateService,
};
use gamemaster_core::snapshot::WorldSnapshot;

/// A rules engine that returns a configured verdict and records requests.
#[derive(Debug)]
pub struct StubRuleService {
    reply: Result<RuleOutcome, GmError>,
    requests: Mutex<Vec<RuleCheckRequest>>,
    health: Result<bool, GmError>,
}

impl StubRuleService {
    /// Answers every check with `outcome`.
    #[must_use]
    pub fn returning(outcome: RuleOutcome) -> Self {
        Self::with_reply(Ok(outcome))
    }

    /// Fails every check with `error`.
    #[must_use]
    pub fn failing(error: GmError) -> Self {
        Self::with_reply(Err(error))
    }

    fn with_reply(reply: Result<RuleOutcome, GmError>) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
            health: Ok(true),
        }
    }

    /// Overrides the health-check reply.
    #[must_use]
    pub fn with_health(mut self, health: Result<bool, GmError>) -> Self {
        self.health = health;
        self
    }

    /// Snapshot of every request received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<RuleCheckRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RuleService for StubRuleService {
    async fn check(&self, request: &RuleCheckRequest) -> Result<RuleOutcome, GmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }

    async fn check_health(&self) -> Result<bool, GmError> {
        self.health.clone()
    }
}

/// A scenario engine that returns a configured suggestion and records the
/// input text of every check.
#[derive(Debug)]
pub struct StubScenarioService {
    reply: Result<ScenarioSuggestion, GmError>,
    inputs: Mutex<Vec<String>>,
    health: Result<bool, GmError>,
}

impl StubScenarioService {
    /// Answers every check with `suggestion`.
    #[must_use]
    pub fn returning(suggestion: ScenarioSuggestion) -> Self {
        Self::with_reply(Ok(suggestion))
    }

    /// Fails every check with `error`.
    #[must_use]
    pub fn failing(error: GmError) -> Self {
        Self::with_reply(Err(error))
    }

    fn with_reply(reply: Result<ScenarioSuggestion, GmError>) -> Self {
        Self {
            reply,
            inputs: Mutex::new(Vec::new()),
            health: Ok(true),
        }
    }

    /// Overrides the health-check reply.
    #[must_use]
    pub fn with_health(mut self, health: Result<bool, GmError>) -> Self {
        self.health = health;
        self
    }

    /// Input texts received, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScenarioService for StubScenarioService {
    async fn check(
        &self,
        input_text: &str,
        _rule_outcome: &RuleOutcome,
    ) -> Result<ScenarioSuggestion, GmError> {
        self.inputs.lock().unwrap().push(input_text.to_owned());
        self.reply.clone()
    }

    async fn check_health(&self) -> Result<bool, GmError> {
        self.health.clone()
    }
}

/// A state store that serves a fixed snapshot and records every commit.
/// Commit ids are `commit_{turn_id}` unless a commit failure is configured.
#[derive(Debug)]
pub struct RecordingStateService {
    snapshot: Result<WorldSnapshot, GmError>,
    commit_error: Option<GmError>,
    commits: Mutex<Vec<(String, Vec<EntityDiff>)>>,
    health: Result<bool, GmError>,
}

impl RecordingStateService {
    /// Serves `snapshot` and accepts every commit.
    #[must_use]
    pub fn new(snapshot: WorldSnapshot) -> Self {
        Self {
            snapshot: Ok(snapshot),
            commit_error: None,
            commits: Mutex::new(Vec::new()),
            health: Ok(true),
        }
    }

    /// Makes snapshot fetches fail with a transport error.
    #[must_use]
    pub fn with_unreachable_snapshot(mut self) -> Self {
        self.snapshot = Err(GmError::Transport {
            service: ServiceKind::State,
            message: "connection refused".to_owned(),
        });
        self
    }

    /// Makes commits fail as if the service answered with `status`.
    #[must_use]
    pub fn with_commit_status(mut self, status: u16) -> Self {
        self.commit_error = Some(GmError::Upstream {
            service: ServiceKind::State,
            status,
            body: "{\"error\":\"Database unavailable\"}".to_owned(),
        });
        self
    }

    /// Makes commits fail with a transport error, as if the store were down.
    #[must_use]
    pub fn with_unreachable_commit(mut self) -> Self {
        self.commit_error = Some(GmError::Transport {
            service: ServiceKind::State,
            message: "connection refused".to_owned(),
        });
        self
    }

    /// Overrides the health-check reply.
    #[must_use]
    pub fn with_health(mut self, health: Result<bool, GmError>) -> Self {
        self.health = health;
        self
    }

    /// Every commit received, as `(turn_id, diffs)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn commits(&self) -> Vec<(String, Vec<EntityDiff>)> {
        self.commits.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateService for RecordingStateService {
    async fn get_state(&self, _session_id: &str) -> Result<WorldSnapshot, GmError> {
        self.snapshot.clone()
    }

    async fn commit(&self, turn_id: &str, diffs: &[EntityDiff]) -> Result<CommitReceipt, GmError> {
        self.commits
            .lock()
            .unwrap()
            .push((turn_id.to_owned(), diffs.to_vec()));
        match &self.commit_error {
            Some(error) => Err(error.clone()),
            None => Ok(CommitReceipt {
                commit_id: format!("commit_{turn_id}"),
                status: Some("success".to_owned()),
                timestamp: None,
            }),
        }
    }

    async fn check_health(&self) -> Result<bool, GmError> {
        self.health.clone()
    }
}
