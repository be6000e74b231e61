//! Persistence port shared by every saga component.
//!
//! Writes are best effort: a failing backend is logged and the in-memory
//! operation still succeeds.

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{KEY_LOGS, KEY_MISSIONS, KEY_PROGRESSION, KEY_REWARDS};
use crate::error::SagaError;

/// Synchronous string key-value backend.
/// Platform-specific implementations should provide this
pub trait KvStore {
    type Error: std::error::Error + 'static;

    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write (unavailable, quota).
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;
}

/// Logical names of the persisted entries, one per component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    #[serde(default = "StorageKeys::default_missions")]
    pub missions: String,
    #[serde(default = "StorageKeys::default_rewards")]
    pub rewards: String,
    #[serde(default = "StorageKeys::default_progression")]
    pub progression: String,
    #[serde(default = "StorageKeys::default_logs")]
    pub logs: String,
}

impl StorageKeys {
    fn default_missions() -> String {
        KEY_MISSIONS.to_string()
    }

    fn default_rewards() -> String {
        KEY_REWARDS.to_string()
    }

    fn default_progression() -> String {
        KEY_PROGRESSION.to_string()
    }

    fn default_logs() -> String {
        KEY_LOGS.to_string()
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            missions: Self::default_missions(),
            rewards: Self::default_rewards(),
            progression: Self::default_progression(),
            logs: Self::default_logs(),
        }
    }
}

/// In-memory backend. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value currently stored under `key`.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KvStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn write_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), SagaError>
where
    S: KvStore,
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string(value).map_err(|e| SagaError::Persistence {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, &text).map_err(|e| SagaError::Persistence {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Serialize `value` under `key`, logging instead of failing.
///
/// Returns whether the write reached the backend.
pub(crate) fn persist_json<S, T>(store: &S, key: &str, value: &T) -> bool
where
    S: KvStore,
    T: Serialize + ?Sized,
{
    match write_json(store, key, value) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("{err}; keeping state in memory only");
            false
        }
    }
}

/// Key holding a copy of a stored value that failed to decode.
#[must_use]
pub fn backup_key(key: &str) -> String {
    format!("{key}.corrupt")
}

fn read_raw<S: KvStore>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(raw) => raw,
        Err(err) => {
            log::warn!("failed to read `{key}`: {err}");
            None
        }
    }
}

// Copies the undecodable value aside before the next write replaces it.
fn back_up(store: &impl KvStore, key: &str, raw: &str) {
    let backup = backup_key(key);
    match store.set(&backup, raw) {
        Ok(()) => log::warn!("copied unreadable `{key}` to `{backup}`"),
        Err(err) => log::warn!("failed to back up unreadable `{key}`: {err}"),
    }
}

/// Read and decode `key`. Missing and unreadable entries yield `None`; a
/// corrupt entry also yields `None` after being copied to [`backup_key`].
pub(crate) fn load_json<S, T>(store: &S, key: &str) -> Option<T>
where
    S: KvStore,
    T: DeserializeOwned,
{
    let raw = read_raw(store, key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("discarding corrupt `{key}` entry: {err}");
            back_up(store, key, &raw);
            None
        }
    }
}

/// Read a stored JSON array, decoding each element on its own.
///
/// Elements that fail to decode are skipped with a warning and the raw value
/// is copied to [`backup_key`], so the valid elements survive the next write.
/// A value that is not an array at all behaves like [`load_json`].
pub(crate) fn load_json_list<S, T>(store: &S, key: &str) -> Option<Vec<T>>
where
    S: KvStore,
    T: DeserializeOwned,
{
    let raw = read_raw(store, key)?;
    let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(values) => values,
        Err(err) => {
            log::warn!("discarding corrupt `{key}` entry: {err}");
            back_up(store, key, &raw);
            return None;
        }
    };
    let total = values.len();
    let items: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(err) => {
                log::warn!("skipping unreadable element {idx} of `{key}`: {err}");
                None
            }
        })
        .collect();
    if items.len() < total {
        back_up(store, key, &raw);
    }
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("quota exceeded")]
    struct QuotaExceeded;

    struct FullStore;

    impl KvStore for FullStore {
        type Error = QuotaExceeded;

        fn get(&self, _key: &str) -> Result<Option<String>, Self::Error> {
            Err(QuotaExceeded)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), Self::Error> {
            Err(QuotaExceeded)
        }
    }

    #[test]
    fn memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        assert!(persist_json(&store, "k", &vec![1, 2, 3]));
        let loaded: Option<Vec<u8>> = load_json(&other, "k");
        assert_eq!(loaded, Some(vec![1, 2, 3]));
    }

    #[test]
    fn failing_backend_is_reported_not_raised() {
        assert!(!persist_json(&FullStore, "k", &1));
        assert_eq!(load_json::<_, u8>(&FullStore, "k"), None);
    }

    #[test]
    fn corrupt_entries_load_as_absent() {
        let store = MemoryStore::new();
        store.set("k", "{not json").unwrap();
        assert_eq!(load_json::<_, Vec<u8>>(&store, "k"), None);
        assert_eq!(load_json::<_, Vec<u8>>(&store, "missing"), None);
    }

    #[test]
    fn corrupt_entry_is_backed_up() {
        let store = MemoryStore::new();
        store.set("k", "{not json").unwrap();
        assert_eq!(load_json::<_, u8>(&store, "k"), None);
        assert_eq!(store.raw(&backup_key("k")).as_deref(), Some("{not json"));
    }

    #[test]
    fn list_keeps_readable_elements() {
        let store = MemoryStore::new();
        store.set("k", r#"[1, "two", 3]"#).unwrap();
        assert_eq!(load_json_list::<_, u8>(&store, "k"), Some(vec![1, 3]));
        assert_eq!(store.raw("k.corrupt").as_deref(), Some(r#"[1, "two", 3]"#));

        store.set("clean", "[4, 5]").unwrap();
        assert_eq!(load_json_list::<_, u8>(&store, "clean"), Some(vec![4, 5]));
        assert_eq!(store.raw("clean.corrupt"), None);
    }

    #[test]
    fn non_array_list_loads_as_absent() {
        let store = MemoryStore::new();
        store.set("k", r#"{"oops":true}"#).unwrap();
        assert_eq!(load_json_list::<_, u8>(&store, "k"), None);
        assert!(store.raw("k.corrupt").is_some());
        assert_eq!(load_json_list::<_, u8>(&FullStore, "k"), None);
    }

    #[test]
    fn storage_keys_fill_missing_fields() {
        let keys: StorageKeys = serde_json::from_str(r#"{"missions":"custom"}"#).unwrap();
        assert_eq!(keys.missions, "custom");
        assert_eq!(keys.rewards, KEY_REWARDS);
        assert_eq!(keys.logs, KEY_LOGS);
    }
}
