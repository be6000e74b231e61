//! Experience points and threshold badges.
use serde::{Deserialize, Serialize};

use crate::constants::{MOCK_XP_REWARD, XP_PER_MINUTE};
use crate::numbers::clamp_u64_to_u32;
use crate::storage::{KvStore, load_json, persist_json};

/// A badge earned once total XP reaches `xp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BadgeRule {
    pub id: &'static str,
    pub name: &'static str,
    pub xp: u32,
    pub icon: &'static str,
}

pub const BADGE_RULES: [BadgeRule; 3] = [
    BadgeRule {
        id: "novice",
        name: "Novice Edge",
        xp: 50,
        icon: "E",
    },
    BadgeRule {
        id: "shikai",
        name: "Shikai Unlocked",
        xp: 150,
        icon: "S",
    },
    BadgeRule {
        id: "bankai",
        name: "Bankai Master",
        xp: 350,
        icon: "B",
    },
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    #[serde(default)]
    pub xp: u32,
    /// Badge ids in the order they were earned.
    #[serde(default)]
    pub badges: Vec<String>,
}

pub struct Progression<S: KvStore> {
    storage: S,
    key: String,
    state: ProgressionState,
}

impl<S: KvStore> Progression<S> {
    pub fn open(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let state = load_json(&storage, &key).unwrap_or_default();
        Self {
            storage,
            key,
            state,
        }
    }

    /// Add `xp` and return the badges this award unlocked.
    pub fn award(&mut self, xp: u32) -> Vec<BadgeRule> {
        self.state.xp = self.state.xp.saturating_add(xp);
        let earned: Vec<BadgeRule> = BADGE_RULES
            .into_iter()
            .filter(|rule| self.state.xp >= rule.xp && !self.has_badge(rule.id))
            .collect();
        for rule in &earned {
            log::info!("badge earned: {} at {} XP", rule.name, self.state.xp);
            self.state.badges.push(rule.id.to_string());
        }
        persist_json(&self.storage, &self.key, &self.state);
        earned
    }

    pub fn award_study_minutes(&mut self, minutes: u32) -> Vec<BadgeRule> {
        let xp = clamp_u64_to_u32(u64::from(minutes) * u64::from(XP_PER_MINUTE));
        self.award(xp)
    }

    pub fn award_mock_test(&mut self) -> Vec<BadgeRule> {
        self.award(MOCK_XP_REWARD)
    }

    #[must_use]
    pub const fn xp(&self) -> u32 {
        self.state.xp
    }

    #[must_use]
    pub fn badges(&self) -> Vec<BadgeRule> {
        self.state
            .badges
            .iter()
            .filter_map(|id| BADGE_RULES.iter().find(|rule| rule.id == id.as_str()).copied())
            .collect()
    }

    #[must_use]
    pub fn has_badge(&self, id: &str) -> bool {
        self.state.badges.iter().any(|earned| earned == id)
    }

    /// Next badge still to earn, if any.
    #[must_use]
    pub fn next_badge(&self) -> Option<BadgeRule> {
        BADGE_RULES
            .into_iter()
            .find(|rule| !self.has_badge(rule.id))
    }

    #[must_use]
    pub fn state(&self) -> ProgressionState {
        self.state.clone()
    }
}
