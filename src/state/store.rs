use crate::state::entity::{Entity, EntitySnapshot, StateChanged};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Read side of an entity state store, as consumed by the change tracker.
///
/// Implementations must return every entity currently held, in an order that
/// is stable for identical contents.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Point-in-time read of all entities
    async fn snapshot_all(&self) -> Vec<EntitySnapshot>;
}

/// Outcome of [`EntityStore::transition`]
#[derive(Clone, Debug)]
pub enum Transition {
    Changed(StateChanged),
    Unchanged,
    NotFound,
}

/// In-process entity store shared by the webhook and the local service invoker
pub struct EntityStore {
    /// Lock-free concurrent map for fast reads
    entities: Arc<DashMap<String, Entity>>,

    /// Broadcast channel for state change events
    change_tx: broadcast::Sender<StateChanged>,
}

impl EntityStore {
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(1000);

        Self {
            entities: Arc::new(DashMap::new()),
            change_tx,
        }
    }

    /// Set entity state and attributes (core state mutation).
    ///
    /// Creates the entity if absent. Returns the change event, or `None` when
    /// the write left state and attributes untouched.
    pub fn set_state(
        &self,
        entity_id: &str,
        state: &str,
        attributes: HashMap<String, String>,
    ) -> Option<StateChanged> {
        let now = Utc::now();

        let old_state = match self.entities.entry(entity_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entity = occupied.get_mut();
                if entity.state == state && entity.attributes == attributes {
                    return None;
                }
                let old = std::mem::replace(&mut entity.state, state.to_string());
                entity.attributes = attributes;
                entity.last_changed = now;
                Some(old)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Entity {
                    entity_id: entity_id.to_string(),
                    state: state.to_string(),
                    attributes,
                    last_changed: now,
                });
                None
            }
        };

        let change = StateChanged {
            entity_id: entity_id.to_string(),
            old_state,
            new_state: state.to_string(),
            timestamp: now,
        };

        debug!(
            entity_id = %entity_id,
            new_state = %state,
            "Entity state set"
        );

        // No subscribers is fine
        let _ = self.change_tx.send(change.clone());

        Some(change)
    }

    /// Set only the state value, keeping current attributes
    pub fn update_state(&self, entity_id: &str, state: &str) -> Option<StateChanged> {
        let attributes = self
            .entities
            .get(entity_id)
            .map(|e| e.attributes.clone())
            .unwrap_or_default();
        self.set_state(entity_id, state, attributes)
    }

    /// Compute and write a new state for an existing entity under one entry lock.
    ///
    /// `next` sees the current state, so read-modify-write operations such as
    /// toggle cannot interleave. Absent entities are never created.
    pub fn transition<F>(&self, entity_id: &str, next: F) -> Transition
    where
        F: FnOnce(&str) -> &str,
    {
        let now = Utc::now();

        let change = {
            let Some(mut entity) = self.entities.get_mut(entity_id) else {
                return Transition::NotFound;
            };
            let new_state = next(&entity.state).to_string();
            if entity.state == new_state {
                return Transition::Unchanged;
            }
            let old = std::mem::replace(&mut entity.state, new_state.clone());
            entity.last_changed = now;
            StateChanged {
                entity_id: entity_id.to_string(),
                old_state: Some(old),
                new_state,
                timestamp: now,
            }
        };

        debug!(
            entity_id = %entity_id,
            new_state = %change.new_state,
            "Entity state transitioned"
        );

        let _ = self.change_tx.send(change.clone());

        Transition::Changed(change)
    }

    /// Get entity by ID
    pub fn get(&self, entity_id: &str) -> Option<Entity> {
        self.entities.get(entity_id).map(|e| e.clone())
    }

    /// Get all entities, sorted by entity id
    pub fn all(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.entities.iter().map(|e| e.value().clone()).collect();
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        entities
    }

    /// Remove entity from the store
    pub fn remove(&self, entity_id: &str) -> Option<Entity> {
        let removed = self.entities.remove(entity_id).map(|(_, entity)| entity);

        if removed.is_some() {
            info!(entity_id = %entity_id, "Entity removed");
        }

        removed
    }

    /// Number of entities held
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Subscribe to the change feed
    pub fn subscribe(&self) -> broadcast::Receiver<StateChanged> {
        self.change_tx.subscribe()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for EntityStore {
    async fn snapshot_all(&self) -> Vec<EntitySnapshot> {
        self.all().iter().map(Entity::snapshot).collect()
    }
}
