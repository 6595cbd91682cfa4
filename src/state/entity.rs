use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute key holding the human-readable entity name
pub const ATTR_FRIENDLY_NAME: &str = "friendly_name";

/// Entity is an addressable unit of state (e.g., "scene.movie", "lights.kitchen")
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    /// Unique entity identifier, "<domain>.<object>"
    pub entity_id: String,

    /// Current state value (e.g., "on", "off", "scening")
    pub state: String,

    /// String attributes (friendly_name, brightness, ...)
    pub attributes: HashMap<String, String>,

    /// Last time state or attributes actually changed
    pub last_changed: DateTime<Utc>,
}

impl Entity {
    /// Domain part of the entity id ("scene" for "scene.movie")
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or(&self.entity_id)
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            entity_id: self.entity_id.clone(),
            state: self.state.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

/// Point-in-time copy of one entity, the unit compared for change detection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: String,
    pub state: String,
    pub attributes: HashMap<String, String>,
}

impl EntitySnapshot {
    /// Friendly name attribute, falling back to the entity id
    pub fn friendly_name(&self) -> &str {
        self.attributes
            .get(ATTR_FRIENDLY_NAME)
            .map(String::as_str)
            .unwrap_or(&self.entity_id)
    }

}

/// Change feed message broadcast to subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateChanged {
    pub entity_id: String,
    pub old_state: Option<String>,
    pub new_state: String,
    pub timestamp: DateTime<Utc>,
}
