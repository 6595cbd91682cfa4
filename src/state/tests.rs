use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

fn named(name: &str) -> HashMap<String, String> {
    HashMap::from([("friendly_name".to_string(), name.to_string())])
}

#[test]
fn test_set_state_creates_entity() {
    let store = EntityStore::new();

    let change = store
        .set_state("scene.movie", "scening", named("Movie"))
        .unwrap();

    assert_eq!(change.entity_id, "scene.movie");
    assert_eq!(change.old_state, None);
    assert_eq!(change.new_state, "scening");

    let entity = store.get("scene.movie").unwrap();
    assert_eq!(entity.state, "scening");
    assert_eq!(entity.attributes.get("friendly_name").unwrap(), "Movie");
}

#[test]
fn test_update_state_keeps_attributes() {
    let store = EntityStore::new();
    store.set_state("lights.kitchen", "off", named("Kitchen"));

    let change = store.update_state("lights.kitchen", "on").unwrap();
    assert_eq!(change.old_state, Some("off".to_string()));
    assert_eq!(change.new_state, "on");

    let entity = store.get("lights.kitchen").unwrap();
    assert_eq!(entity.state, "on");
    assert_eq!(entity.attributes.get("friendly_name").unwrap(), "Kitchen");
}

#[test]
fn test_identical_write_is_not_a_change() {
    let store = EntityStore::new();
    store.set_state("lights.hall", "on", named("Hall"));
    let before = store.get("lights.hall").unwrap().last_changed;

    let mut rx = store.subscribe();
    assert!(store.set_state("lights.hall", "on", named("Hall")).is_none());

    assert_eq!(store.get("lights.hall").unwrap().last_changed, before);
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[test]
fn test_attribute_change_is_broadcast() {
    let store = EntityStore::new();
    store.set_state("lights.hall", "on", named("Hall"));
    let mut rx = store.subscribe();

    let mut attributes = named("Hall");
    attributes.insert("brightness".to_string(), "128".to_string());
    store.set_state("lights.hall", "on", attributes);

    let change = rx.try_recv().unwrap();
    assert_eq!(change.entity_id, "lights.hall");
    assert_eq!(change.old_state.as_deref(), Some("on"));
}

#[test]
fn test_remove_entity() {
    let store = EntityStore::new();
    store.set_state("lights.porch", "on", HashMap::new());

    assert!(store.remove("lights.porch").is_some());
    assert!(store.get("lights.porch").is_none());
    assert!(store.remove("lights.porch").is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_snapshot_all_is_sorted() {
    let store = EntityStore::new();
    store.set_state("switch.fan", "off", HashMap::new());
    store.set_state("lights.kitchen", "on", HashMap::new());
    store.set_state("scene.movie", "scening", HashMap::new());

    let ids: Vec<String> = store
        .snapshot_all()
        .await
        .into_iter()
        .map(|s| s.entity_id)
        .collect();

    assert_eq!(ids, vec!["lights.kitchen", "scene.movie", "switch.fan"]);
}

#[test]
fn test_snapshot_friendly_name_falls_back_to_id() {
    let store = EntityStore::new();
    store.set_state("lights.attic", "off", HashMap::new());
    store.set_state("lights.den", "off", named("Den"));

    let attic = store.get("lights.attic").unwrap().snapshot();
    let den = store.get("lights.den").unwrap().snapshot();

    assert_eq!(attic.friendly_name(), "lights.attic");
    assert_eq!(den.friendly_name(), "Den");
}

#[test]
fn test_entity_domain() {
    let store = EntityStore::new();
    store.set_state("lights.den", "off", HashMap::new());
    store.set_state("sun", "up", HashMap::new());

    assert_eq!(store.get("lights.den").unwrap().domain(), "lights");
    assert_eq!(store.get("sun").unwrap().domain(), "sun");
}

#[test]
fn test_concurrent_writes_to_distinct_entities() {
    let store = Arc::new(EntityStore::new());
    let mut handles = vec![];

    for i in 0..10 {
        let store_clone = Arc::clone(&store);
        let handle = thread::spawn(move || {
            let entity_id = format!("lights.room_{}", i);
            store_clone.set_state(&entity_id, "on", HashMap::new());
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 10);
}

#[test]
fn test_transition_keeps_attributes() {
    let store = EntityStore::new();
    store.set_state("lights.kitchen", "off", named("Kitchen"));
    let mut rx = store.subscribe();

    let outcome = store.transition("lights.kitchen", |_| "on");

    let Transition::Changed(change) = outcome else {
        panic!("expected a change, got {:?}", outcome);
    };
    assert_eq!(change.old_state, Some("off".to_string()));
    assert_eq!(change.new_state, "on");
    assert_eq!(rx.try_recv().unwrap().new_state, "on");

    let entity = store.get("lights.kitchen").unwrap();
    assert_eq!(entity.state, "on");
    assert_eq!(entity.attributes.get("friendly_name").unwrap(), "Kitchen");
}

#[test]
fn test_transition_to_same_state_is_not_broadcast() {
    let store = EntityStore::new();
    store.set_state("lights.kitchen", "on", HashMap::new());
    let mut rx = store.subscribe();

    assert!(matches!(
        store.transition("lights.kitchen", |_| "on"),
        Transition::Unchanged
    ));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_transition_does_not_recreate_removed_entity() {
    let store = EntityStore::new();
    store.set_state("lights.kitchen", "off", HashMap::new());
    store.remove("lights.kitchen");

    assert!(matches!(
        store.transition("lights.kitchen", |_| "on"),
        Transition::NotFound
    ));
    assert!(store.get("lights.kitchen").is_none());
    assert!(store.is_empty());
}

#[test]
fn test_concurrent_toggles_are_not_lost() {
    let store = Arc::new(EntityStore::new());
    store.set_state("lights.kitchen", "off", HashMap::new());
    let mut rx = store.subscribe();
    let mut handles = vec![];

    for _ in 0..8 {
        let store_clone = Arc::clone(&store);
        let handle = thread::spawn(move || {
            for _ in 0..25 {
                store_clone.transition("lights.kitchen", |current| {
                    if current == "on" {
                        "off"
                    } else {
                        "on"
                    }
                });
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // 200 flips from "off" land back on "off", each one broadcast
    assert_eq!(store.get("lights.kitchen").unwrap().state, "off");
    let mut changes = 0;
    while rx.try_recv().is_ok() {
        changes += 1;
    }
    assert_eq!(changes, 200);
}
