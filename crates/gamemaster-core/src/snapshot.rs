//! World snapshot as reported by the state service at the start of a turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity used for the human participant.
pub const PLAYER_ENTITY_ID: &str = "player";

/// Entities, relations and environment as of turn start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Known entities.
    #[serde(default)]
    pub entities: Vec<SnapshotEntity>,
    /// Known relations between entities.
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Free-form environment description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Value>,
}

impl WorldSnapshot {
    /// Entity ids that may act on an NPC turn: everything except the player,
    /// compared case-insensitively, in snapshot order.
    #[must_use]
    pub fn npc_candidates(&self) -> Vec<&str> {
        self.entities
            .iter()
            .map(|entity| entity.entity_id.as_str())
            .filter(|id| !id.eq_ignore_ascii_case(PLAYER_ENTITY_ID))
            .collect()
    }
}

/// One entity in the snapshot.
///
/// The state service may list entities either as bare id strings or as
/// `{entity_id, entity_name}` objects; a bare id doubles as its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EntityRepr")]
pub struct SnapshotEntity {
    /// Entity identifier.
    pub entity_id: String,
    /// Display name.
    pub entity_name: String,
}

impl SnapshotEntity {
    /// Creates an entity whose name equals its id.
    #[must_use]
    pub fn named_by_id(entity_id: impl Into<String>) -> Self {
        let entity_id = entity_id.into();
        Self {
            entity_name: entity_id.clone(),
            entity_id,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntityRepr {
    Id(String),
    Full {
        entity_id: String,
        #[serde(default)]
        entity_name: Option<String>,
    },
}

impl From<EntityRepr> for SnapshotEntity {
    fn from(repr: EntityRepr) -> Self {
        match repr {
            EntityRepr::Id(id) => Self::named_by_id(id),
            EntityRepr::Full {
                entity_id,
                entity_name,
            } => Self {
                entity_name: entity_name.unwrap_or_else(|| entity_id.clone()),
                entity_id,
            },
        }
    }
}

/// Directed relation between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Source entity.
    #[serde(default)]
    pub cause_entity_id: String,
    /// Target entity.
    #[serde(default)]
    pub effect_entity_id: String,
    /// Relation kind.
    #[serde(rename = "type", default)]
    pub relation_type: String,
}
