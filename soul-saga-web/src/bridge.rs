//! JavaScript-facing handle over one saga session.
//!
//! Every state change is pushed to the optional `onEvent` callback as a
//! `{ kind, data }` object; the page decides how to render it.

use std::rc::Rc;

use anyhow::Context;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::dom;
use crate::game::{
    LocalStorageStore, MissionId, MissionPatch, NewMission, Presenter, Saga, SagaError, SagaEvent,
    SystemClock, WebDataLoader, derive_stream_seed, load_saga_config,
};

const SESSION_SEED_TAG: &[u8] = b"session";

/// Forwards saga events to a JavaScript callback.
struct CallbackPresenter {
    callback: js_sys::Function,
}

impl Presenter for CallbackPresenter {
    fn notify(&self, event: &SagaEvent) {
        let result = to_js(event).and_then(|value| self.callback.call1(&JsValue::NULL, &value));
        if let Err(err) = result {
            dom::console_error(&format!(
                "saga event handler failed: {}",
                dom::js_error_message(&err)
            ));
        }
    }
}

#[wasm_bindgen]
pub struct SagaHandle {
    saga: Saga<LocalStorageStore>,
}

#[wasm_bindgen]
impl SagaHandle {
    /// Open the saga stored in `localStorage`, seeding starter missions on first visit.
    ///
    /// # Errors
    /// Returns an error if storage is unavailable or the bundled configuration is invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(on_event: Option<js_sys::Function>) -> Result<Self, JsValue> {
        open_saga(on_event)
            .map(|saga| Self { saga })
            .map_err(|err| JsValue::from(js_sys::Error::new(&format!("{err:#}"))))
    }

    #[wasm_bindgen(js_name = addMission)]
    pub fn add_mission(&mut self, title: &str, description: &str) -> Result<JsValue, JsValue> {
        to_js(&self.saga.add_mission(title, description))
    }

    /// Add a mission from a `{ title, description?, type?, minutes? }` object.
    ///
    /// # Errors
    /// Returns an error if `mission` does not have that shape.
    #[wasm_bindgen(js_name = addMissionWith)]
    pub fn add_mission_with(&mut self, mission: JsValue) -> Result<JsValue, JsValue> {
        let new: NewMission = serde_wasm_bindgen::from_value(mission)?;
        to_js(&self.saga.add_mission_with(new))
    }

    /// Returns `null` when no mission has `id`.
    #[wasm_bindgen(js_name = editMission)]
    pub fn edit_mission(&mut self, id: &str, patch: JsValue) -> Result<JsValue, JsValue> {
        let patch: MissionPatch = serde_wasm_bindgen::from_value(patch)?;
        to_js(&self.saga.edit_mission(&MissionId::from(id), patch))
    }

    #[wasm_bindgen(js_name = deleteMission)]
    pub fn delete_mission(&mut self, id: &str) -> bool {
        self.saga.delete_mission(&MissionId::from(id))
    }

    /// Returns the completion outcome, or `null` for unknown or finished missions.
    #[wasm_bindgen(js_name = completeMission)]
    pub fn complete_mission(&mut self, id: &str) -> Result<JsValue, JsValue> {
        let outcome = self
            .saga
            .complete_mission(&MissionId::from(id))
            .map_err(saga_error)?;
        to_js(&outcome)
    }

    pub fn reorder(&mut self, ids: Vec<String>) {
        let ids: Vec<MissionId> = ids.into_iter().map(MissionId::from).collect();
        self.saga.reorder(&ids);
    }

    #[wasm_bindgen(js_name = addReward)]
    pub fn add_reward(&mut self, text: &str, rarity: &str) -> Result<JsValue, JsValue> {
        let reward = self.saga.grant_reward(text, rarity).map_err(saga_error)?;
        to_js(&reward)
    }

    /// Credit a finished study timer; returns the badges it unlocked.
    #[wasm_bindgen(js_name = logStudy)]
    pub fn log_study(&mut self, minutes: u32) -> Result<JsValue, JsValue> {
        to_js(&self.saga.log_study_session(minutes))
    }

    #[wasm_bindgen(js_name = recordMockTest)]
    pub fn record_mock_test(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.saga.record_mock_test())
    }

    #[wasm_bindgen(js_name = recordAction)]
    pub fn record_action(&mut self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.saga.record_player_action(text))
    }

    pub fn progress(&self) -> Result<JsValue, JsValue> {
        to_js(&self.saga.progress())
    }

    pub fn missions(&self) -> Result<JsValue, JsValue> {
        to_js(&self.saga.missions())
    }

    pub fn ledger(&self) -> Result<JsValue, JsValue> {
        to_js(&self.saga.ledger())
    }

    #[must_use]
    pub fn xp(&self) -> u32 {
        self.saga.xp()
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.saga.snapshot())
    }
}

fn open_saga(on_event: Option<js_sys::Function>) -> anyhow::Result<Saga<LocalStorageStore>> {
    let storage = LocalStorageStore::open().context("opening saga storage")?;
    let config = load_saga_config(&WebDataLoader);
    let saga = Saga::open(storage, config, session_seed(), Rc::new(SystemClock))
        .context("starting saga session")?;
    Ok(match on_event {
        Some(callback) => saga.with_presenter(CallbackPresenter { callback }),
        None => saga,
    })
}

fn session_seed() -> u64 {
    let entropy = js_sys::Math::random().to_bits() ^ js_sys::Date::now().to_bits().rotate_left(32);
    derive_stream_seed(entropy, SESSION_SEED_TAG)
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn saga_error(err: SagaError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}
