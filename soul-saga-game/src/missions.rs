//! Mission list management and completion-driven reward dispatch.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::clock::SharedClock;
use crate::constants::{DEFAULT_MISSION_MINUTES, DEFAULT_MISSIONS, ID_LEN, MISSION_ID_PREFIX};
use crate::error::SagaError;
use crate::numbers::percent;
use crate::rewards::{Reward, RewardEngine};
use crate::seed::short_uid;
use crate::storage::{KvStore, load_json, load_json_list, persist_json};

/// Opaque mission identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MissionId(String);

impl MissionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MissionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// Early saves used numeric ids (timestamps and 1..=5 for the starter set).
impl<'de> Deserialize<'de> for MissionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Number(number) => Self(number.to_string()),
        })
    }
}

/// Study category a mission trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionKind {
    #[default]
    General,
    Listening,
    Reading,
    Writing,
    Speaking,
    Grammar,
}

fn default_minutes() -> u32 {
    DEFAULT_MISSION_MINUTES
}

const fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: MissionId,
    pub title: String,
    #[serde(default, alias = "desc")]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub order: usize,
    #[serde(default, rename = "type")]
    pub kind: MissionKind,
    #[serde(default = "default_minutes")]
    pub minutes: u32,
    #[serde(default = "unix_epoch", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMission {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: MissionKind,
    #[serde(default = "default_minutes")]
    pub minutes: u32,
}

impl NewMission {
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: MissionKind::General,
            minutes: DEFAULT_MISSION_MINUTES,
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: MissionKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn with_minutes(mut self, minutes: u32) -> Self {
        self.minutes = minutes;
        self
    }
}

/// Partial update. `None` leaves the field untouched; the id is never patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<MissionKind>,
    #[serde(default)]
    pub minutes: Option<u32>,
}

impl MissionPatch {
    fn apply(self, mission: &mut Mission) {
        if let Some(title) = self.title {
            mission.title = title;
        }
        if let Some(description) = self.description {
            mission.description = description;
        }
        if let Some(kind) = self.kind {
            mission.kind = kind;
        }
        if let Some(minutes) = self.minutes {
            mission.minutes = minutes;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub completed_count: usize,
    pub total_count: usize,
    pub percent: u8,
}

/// Key under which every id ever issued for the list at `key` is kept.
#[must_use]
pub fn issued_ids_key(key: &str) -> String {
    format!("{key}.issued")
}

/// Ordered mission list. Completing a mission unlocks a reward from the
/// composed [`RewardEngine`].
pub struct MissionStore<S: KvStore> {
    storage: S,
    key: String,
    missions: Vec<Mission>,
    /// Every id handed out by this list, deleted ones included.
    issued: BTreeSet<MissionId>,
    restored: bool,
    rewards: RewardEngine<S>,
    rng: ChaCha20Rng,
    clock: SharedClock,
}

impl<S: KvStore> MissionStore<S> {
    /// Load the stored mission list under `key`; a missing or corrupt entry starts empty.
    ///
    /// Duplicate ids and colliding `order` values from older saves are
    /// repaired on load.
    pub fn open(
        storage: S,
        key: impl Into<String>,
        rewards: RewardEngine<S>,
        rng: ChaCha20Rng,
        clock: SharedClock,
    ) -> Self {
        let key = key.into();
        let stored: Option<Vec<Mission>> = load_json_list(&storage, &key);
        let restored = stored.is_some();
        let issued: BTreeSet<MissionId> =
            load_json(&storage, &issued_ids_key(&key)).unwrap_or_default();
        let mut store = Self {
            storage,
            key,
            missions: Vec::new(),
            issued,
            restored,
            rewards,
            rng,
            clock,
        };
        store.adopt(stored.unwrap_or_default());
        log::debug!(
            "loaded {} missions from `{}`",
            store.missions.len(),
            store.key
        );
        store
    }

    /// Whether a mission list was found in storage when the store was opened.
    #[must_use]
    pub const fn was_restored(&self) -> bool {
        self.restored
    }

    /// Append the starter missions.
    pub fn seed_default_missions(&mut self) -> Vec<Mission> {
        DEFAULT_MISSIONS
            .iter()
            .map(|(title, description, kind)| {
                self.add_mission_with(NewMission::new(*title, *description).with_kind(*kind))
            })
            .collect()
    }

    pub fn add_mission(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Mission {
        self.add_mission_with(NewMission::new(title, description))
    }

    pub fn add_mission_with(&mut self, new: NewMission) -> Mission {
        let mission = Mission {
            id: self.fresh_id(),
            title: new.title,
            description: new.description,
            completed: false,
            order: self.next_order(),
            kind: new.kind,
            minutes: new.minutes,
            created_at: self.clock.now(),
        };
        log::debug!("mission added: {} ({})", mission.title, mission.id);
        self.missions.push(mission.clone());
        self.persist();
        mission
    }

    /// Apply `patch` to the mission with `id`. Returns `None` if it no longer exists.
    pub fn edit_mission(&mut self, id: &MissionId, patch: MissionPatch) -> Option<Mission> {
        let mission = self.missions.iter_mut().find(|m| &m.id == id)?;
        patch.apply(mission);
        let updated = mission.clone();
        self.persist();
        Some(updated)
    }

    /// Remove the mission with `id`. Remaining `order` values are left as-is.
    pub fn delete_mission(&mut self, id: &MissionId) -> bool {
        let Some(idx) = self.missions.iter().position(|m| &m.id == id) else {
            return false;
        };
        let removed = self.missions.remove(idx);
        log::debug!("mission deleted: {} ({})", removed.title, removed.id);
        self.persist();
        true
    }

    /// Mark the mission complete and unlock a reward.
    ///
    /// Unknown or already-completed missions are a no-op returning `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Configuration` if the reward draw lands on an empty pool.
    pub fn complete_mission(&mut self, id: &MissionId) -> Result<Option<Reward>, SagaError> {
        let Some(mission) = self.missions.iter_mut().find(|m| &m.id == id) else {
            return Ok(None);
        };
        if mission.completed {
            return Ok(None);
        }
        mission.completed = true;
        log::debug!("mission completed: {} ({})", mission.title, mission.id);
        self.persist();
        self.rewards.unlock_random_reward().map(Some)
    }

    /// Re-sort to match `ids`. Known ids come first in the given order; missions
    /// left out keep their relative order after them. Unknown and repeated ids
    /// are ignored. `order` fields are rewritten to the new positions.
    pub fn reorder(&mut self, ids: &[MissionId]) {
        let mut rank: HashMap<&MissionId, usize> = HashMap::new();
        for id in ids {
            let next = rank.len();
            rank.entry(id).or_insert(next);
        }
        let mut indexed: Vec<(usize, Mission)> = self.missions.drain(..).enumerate().collect();
        indexed.sort_by_key(|(position, mission)| match rank.get(&mission.id) {
            Some(requested) => (0, *requested),
            None => (1, *position),
        });
        self.missions = indexed
            .into_iter()
            .enumerate()
            .map(|(order, (_, mut mission))| {
                mission.order = order;
                mission
            })
            .collect();
        self.persist();
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        let total_count = self.missions.len();
        let completed_count = self.missions.iter().filter(|m| m.completed).count();
        Progress {
            completed_count,
            total_count,
            percent: percent(completed_count, total_count),
        }
    }

    /// Display-ordered copy of the mission list.
    #[must_use]
    pub fn missions(&self) -> Vec<Mission> {
        self.missions.clone()
    }

    #[must_use]
    pub fn get(&self, id: &MissionId) -> Option<Mission> {
        self.missions.iter().find(|m| &m.id == id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.missions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    #[must_use]
    pub const fn rewards(&self) -> &RewardEngine<S> {
        &self.rewards
    }

    pub fn rewards_mut(&mut self) -> &mut RewardEngine<S> {
        &mut self.rewards
    }

    fn fresh_id(&mut self) -> MissionId {
        loop {
            let id = MissionId(short_uid(&mut self.rng, MISSION_ID_PREFIX, ID_LEN));
            if self.issued.insert(id.clone()) {
                self.persist_issued();
                return id;
            }
        }
    }

    // Installs a loaded list, re-issuing duplicate ids and renumbering
    // colliding orders. Persists only when something changed.
    fn adopt(&mut self, mut missions: Vec<Mission>) {
        let known = self.issued.len();
        self.issued.extend(missions.iter().map(|m| m.id.clone()));
        let mut repaired = false;

        let mut seen = HashSet::new();
        for mission in &mut missions {
            if !seen.insert(mission.id.clone()) {
                let fresh = self.fresh_id();
                log::warn!(
                    "duplicate mission id {} on \"{}\"; re-issued as {fresh}",
                    mission.id,
                    mission.title
                );
                seen.insert(fresh.clone());
                mission.id = fresh;
                repaired = true;
            }
        }

        let mut orders = HashSet::new();
        if !missions.iter().all(|m| orders.insert(m.order)) {
            log::warn!("colliding mission orders in `{}`; renumbering", self.key);
            for (order, mission) in missions.iter_mut().enumerate() {
                mission.order = order;
            }
            repaired = true;
        }

        self.missions = missions;
        if self.issued.len() != known {
            self.persist_issued();
        }
        if repaired {
            self.persist();
        }
    }

    // Equal to the list length unless deletions left a higher rank behind.
    fn next_order(&self) -> usize {
        self.missions
            .iter()
            .map(|m| m.order + 1)
            .max()
            .unwrap_or(0)
            .max(self.missions.len())
    }

    fn persist(&self) {
        persist_json(&self.storage, &self.key, &self.missions);
    }

    fn persist_issued(&self) {
        persist_json(&self.storage, &issued_ids_key(&self.key), &self.issued);
    }
}
