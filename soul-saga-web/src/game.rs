//! Web-specific saga implementation
//!
//! This module provides browser implementations of the soul-saga-game traits
//! and re-exports the core saga types.

use serde::de::DeserializeOwned;
use web_sys::Storage;

// Re-export all types from soul-saga-game
pub use soul_saga_game::*;

use crate::dom;

/// Web-specific data loader backed by the bundled static assets
pub struct WebDataLoader;

#[derive(Debug, thiserror::Error)]
pub enum WebDataError {
    #[error("Unknown config: {0}")]
    UnknownConfig(String),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DataLoader for WebDataLoader {
    type Error = WebDataError;

    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned,
    {
        let json = match config_name {
            "saga" => include_str!("../static/assets/data/saga.json"),
            _ => return Err(WebDataError::UnknownConfig(config_name.to_string())),
        };
        serde_json::from_str(json).map_err(WebDataError::Json)
    }
}

/// Saga storage backed by `window.localStorage`
#[derive(Clone)]
pub struct LocalStorageStore {
    storage: Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum WebStorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LocalStorageStore {
    /// Bind to the page's `localStorage`.
    ///
    /// # Errors
    /// Returns an error if there is no window or storage access is denied.
    pub fn open() -> Result<Self, WebStorageError> {
        dom::local_storage()
            .map(|storage| Self { storage })
            .map_err(|e| WebStorageError::Unavailable(dom::js_error_message(&e)))
    }
}

impl KvStore for LocalStorageStore {
    type Error = WebStorageError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        self.storage
            .get_item(key)
            .map_err(|e| WebStorageError::Storage(dom::js_error_message(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.storage
            .set_item(key, value)
            .map_err(|e| WebStorageError::Storage(dom::js_error_message(&e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_saga_config_matches_defaults() {
        let config: SagaConfig = WebDataLoader.load_config("saga").unwrap();
        assert_eq!(config, SagaConfig::default_config());
        assert!(config.rewards.validate().is_ok());
    }

    #[test]
    fn unknown_config_is_rejected() {
        let result: Result<SagaConfig, _> = WebDataLoader.load_config("weather");
        assert!(matches!(result, Err(WebDataError::UnknownConfig(name)) if name == "weather"));
    }

    #[test]
    fn session_config_loads_through_loader() {
        let config = load_saga_config(&WebDataLoader);
        assert!(config.seed_default_missions);
        assert_eq!(config.storage_keys.missions, "soulReaperMissions");
    }
}
