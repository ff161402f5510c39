//! Proposals returned by the rule and scenario services.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diff::EntityDiff;

/// Verdict from the rules engine on the feasibility and mechanical effects
/// of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Whether the action succeeds.
    pub success: bool,
    /// Human-readable explanation of the verdict.
    #[serde(default, alias = "description")]
    pub reason: String,
    /// Proposed entity changes, in the order the rules engine produced them.
    #[serde(default)]
    pub suggested_diffs: Vec<EntityDiff>,
    /// Numeric envelope per field. Advisory only: conflict resolution reads
    /// it but does not clamp scenario corrections against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_range: Option<Map<String, Value>>,
    /// Rules-engine phase the check ran in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_type: Option<String>,
    /// Relation changes proposed alongside the diffs. Carried for the
    /// scenario service; not committed by the turn engine.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_relations: Vec<Value>,
}

/// How binding a scenario suggestion is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    /// Must be honoured.
    Mandatory,
    /// Recommended.
    Advisory,
}

/// Verdict from the scenario engine, possibly overriding rule effects and
/// requiring narrative content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSuggestion {
    /// How binding the suggestion is.
    pub constraint_type: ConstraintType,
    /// Explanation of the suggestion.
    #[serde(default)]
    pub description: String,
    /// Corrections that win over the rule proposal field by field.
    #[serde(default)]
    pub correction_diffs: Vec<EntityDiff>,
    /// Substring the generated narrative must contain.
    #[serde(default)]
    pub narrative_slot: Option<String>,
}

impl ScenarioSuggestion {
    /// Whether `narrative` satisfies the required slot. Always true when no
    /// slot is set.
    #[must_use]
    pub fn is_satisfied_by(&self, narrative: &str) -> bool {
        self.narrative_slot
            .as_deref()
            .is_none_or(|slot| narrative.contains(slot))
    }
}
