//! Conflict resolution between the rules verdict and the scenario verdict.
//!
//! The scenario engine always wins on overlapping fields. `value_range` on
//! the rule outcome is not consulted: scenario corrections are applied even
//! when they fall outside the envelope the rules engine reported.

use std::collections::HashMap;

use gamemaster_core::diff::EntityDiff;
use gamemaster_core::outcome::{RuleOutcome, ScenarioSuggestion};

/// Reconciles both proposals into one ordered list of diffs.
///
/// Rule diffs are taken first, in order; a later rule diff for the same
/// entity replaces the earlier one but keeps its position. Scenario
/// corrections then either merge field by field into an entity already
/// present, overwriting its values, or are appended verbatim. The result
/// lists rule entities in rule order followed by scenario-only entities in
/// scenario order.
#[must_use]
pub fn resolve(rule: &RuleOutcome, scenario: &ScenarioSuggestion) -> Vec<EntityDiff> {
    let mut resolved: Vec<EntityDiff> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for proposal in &rule.suggested_diffs {
        match positions.get(proposal.entity_id.as_str()) {
            Some(&index) => resolved[index].diff.clone_from(&proposal.diff),
            None => {
                positions.insert(&proposal.entity_id, resolved.len());
                resolved.push(proposal.clone());
            }
        }
    }

    for correction in &scenario.correction_diffs {
        match positions.get(correction.entity_id.as_str()) {
            Some(&index) => {
                let fields = &mut resolved[index].diff;
                for (field, value) in &correction.diff {
                    fields.insert(field.clone(), value.clone());
                }
            }
            None => {
                positions.insert(&correction.entity_id, resolved.len());
                resolved.push(correction.clone());
            }
        }
    }

    resolved
}
