//! Builders for the proposal and snapshot values most tests need.

use gamemaster_core::diff::EntityDiff;
use gamemaster_core::outcome::{ConstraintType, RuleOutcome, ScenarioSuggestion};
use gamemaster_core::snapshot::{SnapshotEntity, WorldSnapshot};
use serde_json::Value;

/// Builds an `EntityDiff` from a JSON object literal.
///
/// # Panics
///
/// Panics if `fields` is not a JSON object.
#[must_use]
pub fn diff(entity_id: &str, fields: Value) -> EntityDiff {
    match fields {
        Value::Object(map) => EntityDiff::new(entity_id, map),
        other => panic!("diff fields must be a JSON object, got {other}"),
    }
}

/// A successful rule outcome proposing `diffs`.
#[must_use]
pub fn rule_outcome(diffs: Vec<EntityDiff>) -> RuleOutcome {
    RuleOutcome {
        success: true,
        reason: "Rule Check".to_owned(),
        suggested_diffs: diffs,
        value_range: None,
        phase_type: None,
        suggested_relations: Vec::new(),
    }
}

/// An advisory scenario suggestion with `corrections` and an optional slot.
#[must_use]
pub fn scenario_suggestion(corrections: Vec<EntityDiff>, slot: Option<&str>) -> ScenarioSuggestion {
    ScenarioSuggestion {
        constraint_type: ConstraintType::Advisory,
        description: "Scenario Check".to_owned(),
        correction_diffs: corrections,
        narrative_slot: slot.map(ToOwned::to_owned),
    }
}

/// A snapshot listing `entity_ids` in order.
#[must_use]
pub fn snapshot_of(entity_ids: &[&str]) -> WorldSnapshot {
    WorldSnapshot {
        entities: entity_ids
            .iter()
            .map(|id| SnapshotEntity::named_by_id(*id))
            .collect(),
        relations: Vec::new(),
        environment: Some(Value::from("Dark Dungeon")),
    }
}
