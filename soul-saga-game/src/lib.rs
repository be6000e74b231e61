//! Soul Reaper Saga Core
//!
//! Platform-agnostic logic for the Soul Reaper Saga study tracker: missions,
//! weighted reward unlocks, XP and badges. Rendering and storage backends are
//! supplied by the host through the [`Presenter`] and [`KvStore`] traits.

pub mod battle_log;
pub mod clock;
pub mod constants;
pub mod error;
pub mod missions;
pub mod numbers;
pub mod progression;
pub mod rarity;
pub mod rewards;
pub mod saga;
pub mod seed;
pub mod storage;

// Re-export commonly used types
pub use battle_log::{BattleLog, LogEntry, LogKind};
pub use clock::{Clock, SharedClock, SteppingClock, SystemClock};
pub use error::SagaError;
pub use missions::{
    Mission, MissionId, MissionKind, MissionPatch, MissionStore, NewMission, Progress,
};
pub use progression::{BADGE_RULES, BadgeRule, Progression, ProgressionState};
pub use rarity::{Rarity, RarityThresholds};
pub use rewards::{Reward, RewardConfig, RewardEngine, RewardPool};
pub use saga::{CompletionOutcome, Presenter, Saga, SagaConfig, SagaEvent, SagaSnapshot};
pub use seed::derive_stream_seed;
pub use storage::{KvStore, MemoryStore, StorageKeys};

/// Trait for abstracting configuration loading
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + 'static;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Load the session configuration through `loader`, falling back to defaults.
pub fn load_saga_config<L: DataLoader>(loader: &L) -> SagaConfig {
    loader.load_config("saga").unwrap_or_else(|err| {
        log::warn!("using built-in saga configuration: {err}");
        SagaConfig::default_config()
    })
}
