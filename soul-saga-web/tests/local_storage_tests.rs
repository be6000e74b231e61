#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

use soul_saga_web::dom;
use soul_saga_web::game::{KvStore, LocalStorageStore, Saga, SagaConfig, SteppingClock};
use std::rc::Rc;

wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

fn fresh_store() -> LocalStorageStore {
    dom::local_storage().expect("localStorage").clear().expect("clear");
    LocalStorageStore::open().expect("open store")
}

#[wasm_bindgen_test]
fn store_round_trips_values() {
    let store = fresh_store();
    assert_eq!(store.get("soulReaperMissions").unwrap(), None);
    store.set("soulReaperMissions", "[]").unwrap();
    assert_eq!(store.get("soulReaperMissions").unwrap().as_deref(), Some("[]"));
}

#[wasm_bindgen_test]
fn saga_persists_into_local_storage() {
    let store = fresh_store();
    let mut saga = Saga::open(
        store.clone(),
        SagaConfig::default_config(),
        7,
        Rc::new(SteppingClock::from_epoch()),
    )
    .expect("open saga");
    assert_eq!(saga.missions().len(), 5);
    let id = saga.missions()[0].id.clone();
    saga.complete_mission(&id).unwrap();

    let reopened = Saga::open(
        store,
        SagaConfig::default_config(),
        8,
        Rc::new(SteppingClock::from_epoch()),
    )
    .expect("reopen saga");
    assert_eq!(reopened.ledger(), saga.ledger());
    assert!(reopened.missions()[0].completed);
}

#[wasm_bindgen_test]
fn handle_exposes_progress() {
    fresh_store();
    let mut handle = soul_saga_web::SagaHandle::new(None).expect("handle");
    let mission = handle.add_mission("Essay", "Task 2").expect("add");
    assert!(mission.is_object());
    assert_eq!(handle.xp(), 0);
    let missions = handle.missions().expect("missions");
    assert_eq!(js_sys::Array::from(&missions).length(), 6);
}
