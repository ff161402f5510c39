//! Ports to the external services a turn depends on.
//!
//! Each port pairs a business operation with a liveness check. Health
//! checks return `Ok(false)` when the service answered but reported itself
//! unhealthy, and `Err` when the check itself could not be completed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::TurnContext;
use crate::diff::EntityDiff;
use crate::error::GmError;
use crate::outcome::{RuleOutcome, ScenarioSuggestion};
use crate::snapshot::{Relation, SnapshotEntity, WorldSnapshot};

/// Payload sent to the rules engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCheckRequest {
    /// Session key.
    pub session_id: String,
    /// Scenario being played.
    pub scenario_id: i64,
    /// Entities in play.
    pub entities: Vec<SnapshotEntity>,
    /// Relations in play.
    pub relations: Vec<Relation>,
    /// The action text being judged.
    pub story: String,
    /// The acting participant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_entity_id: Option<String>,
}

impl RuleCheckRequest {
    /// Builds the request from the current turn: session, scenario, snapshot
    /// entities and relations, actor, and action text.
    #[must_use]
    pub fn from_context(context: &TurnContext) -> Self {
        let (entities, relations) = context
            .world_snapshot()
            .map(|snapshot| (snapshot.entities.clone(), snapshot.relations.clone()))
            .unwrap_or_default();
        Self {
            session_id: context.session_id().to_owned(),
            scenario_id: context.scenario_id(),
            entities,
            relations,
            story: context.user_input().to_owned(),
            actor_entity_id: context.active_entity_id().map(ToOwned::to_owned),
        }
    }
}

/// Acknowledgement of a state commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    /// Identifier of the committed change set.
    pub commit_id: String,
    /// Service-reported status.
    #[serde(default)]
    pub status: Option<String>,
    /// Service-reported commit time.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions to the model.
    System,
    /// Caller input.
    User,
    /// Model output.
    Assistant,
}

/// One message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system instruction.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat-completion request. The model name is a property of the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length cap, if any.
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Default sampling temperature.
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// A system instruction followed by one user message.
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

/// Rules engine.
#[async_trait]
pub trait RuleService: Send + Sync {
    /// Judges an action and proposes its mechanical effects.
    async fn check(&self, request: &RuleCheckRequest) -> Result<RuleOutcome, GmError>;

    /// Liveness probe.
    async fn check_health(&self) -> Result<bool, GmError>;
}

/// Scenario-consistency engine.
#[async_trait]
pub trait ScenarioService: Send + Sync {
    /// Checks an action and its rule verdict against the scenario.
    async fn check(
        &self,
        input_text: &str,
        rule_outcome: &RuleOutcome,
    ) -> Result<ScenarioSuggestion, GmError>;

    /// Liveness probe.
    async fn check_health(&self) -> Result<bool, GmError>;
}

/// World-state store.
#[async_trait]
pub trait StateService: Send + Sync {
    /// Current world snapshot for a session.
    async fn get_state(&self, session_id: &str) -> Result<WorldSnapshot, GmError>;

    /// Commits the resolved diffs of a turn.
    async fn commit(&self, turn_id: &str, diffs: &[EntityDiff]) -> Result<CommitReceipt, GmError>;

    /// Liveness probe.
    async fn check_health(&self) -> Result<bool, GmError>;
}

/// Language-model gateway.
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Returns the text of the first completion choice, or an empty string
    /// when the gateway returned no choices.
    async fn chat(&self, request: &ChatRequest) -> Result<String, GmError>;

    /// Liveness probe.
    async fn check_health(&self) -> Result<bool, GmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{TurnHierarchy, TurnUpdate};

    #[test]
    fn test_rule_request_carries_snapshot_and_story() {
        // Arrange
        let mut context = TurnContext::player("sess_1", "I kick the door.", 7, TurnHierarchy::default());
        context
            .apply(TurnUpdate {
                world_snapshot: Some(WorldSnapshot {
                    entities: vec![SnapshotEntity::named_by_id("ancient_door")],
                    ..WorldSnapshot::default()
                }),
                active_entity_id: Some("player".into()),
                ..TurnUpdate::none()
            })
            .unwrap();

        // Act
        let request = RuleCheckRequest::from_context(&context);

        // Assert
        assert_eq!(request.session_id, "sess_1");
        assert_eq!(request.scenario_id, 7);
        assert_eq!(request.story, "I kick the door.");
        assert_eq!(request.entities[0].entity_id, "ancient_door");
        assert_eq!(request.actor_entity_id.as_deref(), Some("player"));
    }

    #[test]
    fn test_rule_request_without_snapshot_has_no_entities() {
        let context = TurnContext::player("sess_1", "Look", 0, TurnHierarchy::default());

        let request = RuleCheckRequest::from_context(&context);

        assert!(request.entities.is_empty());
        assert!(request.relations.is_empty());
    }
}
