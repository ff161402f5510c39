//! Entity diffs: the atomic unit committed to the state service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name to new value.
pub type FieldChanges = Map<String, Value>;

/// A set of field changes to one game entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDiff {
    /// The entity being changed.
    pub entity_id: String,
    /// Field changes for that entity.
    #[serde(default)]
    pub diff: FieldChanges,
}

impl EntityDiff {
    /// Creates a diff for `entity_id`.
    #[must_use]
    pub fn new(entity_id: impl Into<String>, diff: FieldChanges) -> Self {
        Self {
            entity_id: entity_id.into(),
            diff,
        }
    }
}
