//! Newest-first activity feed shown on the battle log page.
use chrono::{DateTime, Utc};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::clock::SharedClock;
use crate::constants::{ID_LEN, LOG_ID_PREFIX};
use crate::seed::short_uid;
use crate::storage::{KvStore, load_json_list, persist_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    #[default]
    System,
    Player,
    Reward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ts: DateTime<Utc>,
    pub who: String,
    pub text: String,
    #[serde(default, rename = "type")]
    pub kind: LogKind,
}

pub struct BattleLog<S: KvStore> {
    storage: S,
    key: String,
    capacity: usize,
    entries: Vec<LogEntry>,
    rng: ChaCha20Rng,
    clock: SharedClock,
}

impl<S: KvStore> BattleLog<S> {
    pub fn open(
        storage: S,
        key: impl Into<String>,
        capacity: usize,
        rng: ChaCha20Rng,
        clock: SharedClock,
    ) -> Self {
        let key = key.into();
        let mut entries: Vec<LogEntry> = load_json_list(&storage, &key).unwrap_or_default();
        entries.truncate(capacity);
        Self {
            storage,
            key,
            capacity,
            entries,
            rng,
            clock,
        }
    }

    /// Prepend an entry, dropping the oldest ones beyond capacity.
    pub fn record(
        &mut self,
        who: impl Into<String>,
        text: impl Into<String>,
        kind: LogKind,
    ) -> LogEntry {
        let entry = LogEntry {
            id: short_uid(&mut self.rng, LOG_ID_PREFIX, ID_LEN),
            ts: self.clock.now(),
            who: who.into(),
            text: text.into(),
            kind,
        };
        self.entries.insert(0, entry.clone());
        self.entries.truncate(self.capacity);
        persist_json(&self.storage, &self.key, &self.entries);
        entry
    }

    pub fn system(&mut self, text: impl Into<String>) -> LogEntry {
        self.record("System", text, LogKind::System)
    }

    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
