//! Reward unlocks and the append-only reward ledger.
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::clock::SharedClock;
use crate::constants::{POOL_COMMON, POOL_EPIC, POOL_LEGENDARY, POOL_RARE};
use crate::error::SagaError;
use crate::rarity::{Rarity, RarityThresholds};
use crate::storage::{KvStore, load_json_list, persist_json};

/// A ledger entry. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub text: String,
    pub rarity: Rarity,
    /// Epoch milliseconds on the wire; older saves used the `time` key.
    #[serde(
        rename = "unlockedAt",
        alias = "time",
        with = "chrono::serde::ts_milliseconds"
    )]
    pub unlocked_at: DateTime<Utc>,
}

/// Candidate reward texts for each rarity. Tiers missing from JSON keep the built-in texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPool {
    pub common: Vec<String>,
    pub rare: Vec<String>,
    pub epic: Vec<String>,
    pub legendary: Vec<String>,
}

impl RewardPool {
    #[must_use]
    pub fn candidates(&self, rarity: Rarity) -> &[String] {
        match rarity {
            Rarity::Common => &self.common,
            Rarity::Rare => &self.rare,
            Rarity::Epic => &self.epic,
            Rarity::Legendary => &self.legendary,
        }
    }
}

impl Default for RewardPool {
    fn default() -> Self {
        fn owned(texts: [&str; 4]) -> Vec<String> {
            texts.iter().map(ToString::to_string).collect()
        }
        Self {
            common: owned(POOL_COMMON),
            rare: owned(POOL_RARE),
            epic: owned(POOL_EPIC),
            legendary: owned(POOL_LEGENDARY),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default)]
    pub thresholds: RarityThresholds,
    #[serde(default)]
    pub pool: RewardPool,
}

impl RewardConfig {
    /// Get default configuration
    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Reject threshold tables that overlap and empty pools a roll can reach.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Configuration` naming the offending threshold or rarity.
    pub fn validate(&self) -> Result<(), SagaError> {
        self.thresholds.validate()?;
        if let Some(rarity) = Rarity::ALL.into_iter().find(|rarity| {
            self.thresholds.is_reachable(*rarity) && self.pool.candidates(*rarity).is_empty()
        }) {
            return Err(SagaError::configuration(format!(
                "{rarity} rewards are reachable but the pool is empty"
            )));
        }
        Ok(())
    }
}

/// Draws rewards under the configured rarity distribution and records them.
pub struct RewardEngine<S: KvStore> {
    storage: S,
    key: String,
    config: RewardConfig,
    ledger: Vec<Reward>,
    rng: ChaCha20Rng,
    clock: SharedClock,
}

impl<S: KvStore> RewardEngine<S> {
    /// Validate `config` and load the stored ledger under `key`.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Configuration` if the thresholds or pools are invalid.
    pub fn open(
        storage: S,
        key: impl Into<String>,
        config: RewardConfig,
        rng: ChaCha20Rng,
        clock: SharedClock,
    ) -> Result<Self, SagaError> {
        config.validate()?;
        let key = key.into();
        let ledger: Vec<Reward> = load_json_list(&storage, &key).unwrap_or_default();
        log::debug!("loaded {} rewards from `{key}`", ledger.len());
        Ok(Self {
            storage,
            key,
            config,
            ledger,
            rng,
            clock,
        })
    }

    /// Roll a rarity, pick a text from its pool, and append the reward.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Configuration` if the rolled rarity has no candidates.
    pub fn unlock_random_reward(&mut self) -> Result<Reward, SagaError> {
        let rarity = self.config.thresholds.roll(&mut self.rng);
        let text = self
            .config
            .pool
            .candidates(rarity)
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| {
                SagaError::configuration(format!("rolled {rarity} but its reward pool is empty"))
            })?;
        Ok(self.record(text, rarity))
    }

    /// Record a reward without rolling.
    pub fn add_reward(&mut self, text: impl Into<String>, rarity: Rarity) -> Reward {
        self.record(text.into(), rarity)
    }

    /// Record a reward whose rarity arrives as a free-form tag.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::InvalidRarity` if `tag` is not one of the four tiers.
    pub fn add_reward_tagged(
        &mut self,
        text: impl Into<String>,
        tag: &str,
    ) -> Result<Reward, SagaError> {
        let rarity = tag.parse::<Rarity>()?;
        Ok(self.add_reward(text, rarity))
    }

    /// Chronological copy of the ledger.
    #[must_use]
    pub fn ledger(&self) -> Vec<Reward> {
        self.ledger.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    #[must_use]
    pub const fn config(&self) -> &RewardConfig {
        &self.config
    }

    fn record(&mut self, text: String, rarity: Rarity) -> Reward {
        let reward = Reward {
            text,
            rarity,
            unlocked_at: self.clock.now(),
        };
        self.ledger.push(reward.clone());
        persist_json(&self.storage, &self.key, &self.ledger);
        log::info!(
            "unlocked {} reward: {}",
            reward.rarity.as_str().to_ascii_uppercase(),
            reward.text
        );
        reward
    }
}
