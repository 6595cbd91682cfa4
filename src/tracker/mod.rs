// Time-window change tracking over a StateStore

use crate::state::{EntitySnapshot, StateStore};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;


/// One entity that changed inside a scope
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub entity_id: String,
    pub friendly_name: String,
    pub new_state: String,
}

impl From<&EntitySnapshot> for ChangeRecord {
    fn from(snapshot: &EntitySnapshot) -> Self {
        Self {
            entity_id: snapshot.entity_id.clone(),
            friendly_name: snapshot.friendly_name().to_string(),
            new_state: snapshot.state.clone(),
        }
    }
}

/// Records which entities changed between `open_scope` and `close_scope`.
///
/// The before/after reads cover the whole store, so a scope reports every
/// change that landed inside its time window, including changes made by
/// concurrent requests. No lock is held on the store while a scope is open.
#[derive(Clone)]
pub struct ChangeTracker {
    store: Arc<dyn StateStore>,

    /// Ids of open scopes
    open_scopes: Arc<DashSet<Uuid>>,
}

/// An open tracking scope.
///
/// Pass it back to [`ChangeTracker::close_scope`]. Dropping it without closing
/// (cancelled request, panic) still releases the scope registration.
pub struct ScopeHandle {
    registration: Registration,
    before: HashMap<String, EntitySnapshot>,
}

impl ScopeHandle {
    pub fn id(&self) -> Uuid {
        self.registration.id
    }
}

struct Registration {
    id: Uuid,
    open_scopes: Arc<DashSet<Uuid>>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.open_scopes.remove(&self.id);
    }
}

impl ChangeTracker {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            open_scopes: Arc::new(DashSet::new()),
        }
    }

    /// Opens a scope by taking the "before" snapshot
    pub async fn open_scope(&self) -> ScopeHandle {
        let id = Uuid::now_v7();

        // Registered before the read so cancellation mid-read still releases it
        self.open_scopes.insert(id);
        let registration = Registration {
            id,
            open_scopes: Arc::clone(&self.open_scopes),
        };

        let before = self
            .store
            .snapshot_all()
            .await
            .into_iter()
            .map(|snapshot| (snapshot.entity_id.clone(), snapshot))
            .collect();

        debug!(scope_id = %id, "Tracking scope opened");

        ScopeHandle {
            registration,
            before,
        }
    }

    /// Closes a scope and returns the entities that changed inside it.
    ///
    /// Records follow the store's enumeration order at close time. Entities
    /// that are new get a record; entities that disappeared do not.
    pub async fn close_scope(&self, handle: ScopeHandle) -> Vec<ChangeRecord> {
        let ScopeHandle {
            registration,
            before,
        } = handle;

        let after = self.store.snapshot_all().await;
        let changes = diff(&before, &after);

        debug!(
            scope_id = %registration.id,
            changes = changes.len(),
            "Tracking scope closed"
        );

        drop(registration);
        changes
    }

    /// Number of scopes currently open
    pub fn active_scopes(&self) -> usize {
        self.open_scopes.len()
    }
}

fn diff(before: &HashMap<String, EntitySnapshot>, after: &[EntitySnapshot]) -> Vec<ChangeRecord> {
    after
        .iter()
        .filter(|snapshot| before.get(&snapshot.entity_id) != Some(*snapshot))
        .map(ChangeRecord::from)
        .collect()
}
