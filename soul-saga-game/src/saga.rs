//! Session root composing missions, rewards, progression and the battle log.
//!
//! One `Saga` is built per page session and handed to whatever UI layer needs
//! it; there is no global instance.

use serde::{Deserialize, Serialize};

use crate::battle_log::{BattleLog, LogEntry, LogKind};
use crate::clock::SharedClock;
use crate::constants::{
    LOG_CAPACITY, STREAM_LOGS, STREAM_MISSIONS, STREAM_REWARDS, XP_MISSION_COMPLETE_BONUS,
    XP_PER_MINUTE,
};
use crate::error::SagaError;
use crate::missions::{Mission, MissionId, MissionPatch, MissionStore, NewMission, Progress};
use crate::progression::{BadgeRule, Progression};
use crate::rewards::{Reward, RewardConfig, RewardEngine};
use crate::seed::stream_rng;
use crate::storage::{KvStore, StorageKeys};

fn default_true() -> bool {
    true
}

const fn default_log_capacity() -> usize {
    LOG_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaConfig {
    #[serde(default)]
    pub rewards: RewardConfig,
    #[serde(default)]
    pub storage_keys: StorageKeys,
    /// Seed the starter missions when storage holds no mission list.
    #[serde(default = "default_true")]
    pub seed_default_missions: bool,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl SagaConfig {
    /// Get default configuration
    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            rewards: RewardConfig::default_config(),
            storage_keys: StorageKeys::default(),
            seed_default_missions: true,
            log_capacity: LOG_CAPACITY,
        }
    }
}

/// Change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum SagaEvent {
    MissionsChanged {
        missions: Vec<Mission>,
        progress: Progress,
    },
    RewardUnlocked(Reward),
    BadgeEarned(BadgeRule),
    XpChanged(u32),
    LogAppended(LogEntry),
}

/// Receives every state change; rendering is entirely its concern.
pub trait Presenter {
    fn notify(&self, event: &SagaEvent);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub reward: Reward,
    pub xp_gained: u32,
    pub new_badges: Vec<BadgeRule>,
    pub progress: Progress,
}

/// Everything needed for a full redraw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaSnapshot {
    pub missions: Vec<Mission>,
    pub ledger: Vec<Reward>,
    pub progress: Progress,
    pub xp: u32,
    pub badges: Vec<BadgeRule>,
    pub log: Vec<LogEntry>,
}

pub struct Saga<S: KvStore + Clone> {
    missions: MissionStore<S>,
    progression: Progression<S>,
    log: BattleLog<S>,
    presenter: Option<Box<dyn Presenter>>,
}

impl<S: KvStore + Clone> Saga<S> {
    /// Open every component on `storage`, seeding starter missions on first run.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Configuration` if the reward configuration is invalid.
    pub fn open(
        storage: S,
        config: SagaConfig,
        seed: u64,
        clock: SharedClock,
    ) -> Result<Self, SagaError> {
        let keys = config.storage_keys;
        let rewards = RewardEngine::open(
            storage.clone(),
            keys.rewards,
            config.rewards,
            stream_rng(seed, STREAM_REWARDS),
            clock.clone(),
        )?;
        let mut missions = MissionStore::open(
            storage.clone(),
            keys.missions,
            rewards,
            stream_rng(seed, STREAM_MISSIONS),
            clock.clone(),
        );
        if config.seed_default_missions && !missions.was_restored() {
            let seeded = missions.seed_default_missions();
            log::info!("first run: seeded {} starter missions", seeded.len());
        }
        let progression = Progression::open(storage.clone(), keys.progression);
        let log = BattleLog::open(
            storage,
            keys.logs,
            config.log_capacity,
            stream_rng(seed, STREAM_LOGS),
            clock,
        );
        Ok(Self {
            missions,
            progression,
            log,
            presenter: None,
        })
    }

    #[must_use]
    pub fn with_presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Some(Box::new(presenter));
        self
    }

    pub fn add_mission(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Mission {
        self.add_mission_with(NewMission::new(title, description))
    }

    pub fn add_mission_with(&mut self, new: NewMission) -> Mission {
        let mission = self.missions.add_mission_with(new);
        self.system_log(format!("Mission added: {}", mission.title));
        self.emit_missions();
        mission
    }

    pub fn edit_mission(&mut self, id: &MissionId, patch: MissionPatch) -> Option<Mission> {
        let mission = self.missions.edit_mission(id, patch)?;
        self.emit_missions();
        Some(mission)
    }

    pub fn delete_mission(&mut self, id: &MissionId) -> bool {
        let Some(title) = self.missions.get(id).map(|m| m.title) else {
            return false;
        };
        self.missions.delete_mission(id);
        self.system_log(format!("Mission removed: {title}"));
        self.emit_missions();
        true
    }

    /// Complete a mission, unlock its reward and award XP.
    ///
    /// Returns `Ok(None)` when the mission is unknown or was already completed.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Configuration` if the reward draw lands on an empty pool.
    pub fn complete_mission(
        &mut self,
        id: &MissionId,
    ) -> Result<Option<CompletionOutcome>, SagaError> {
        let Some(reward) = self.missions.complete_mission(id)? else {
            return Ok(None);
        };
        let minutes = self.missions.get(id).map_or(0, |m| m.minutes);
        let xp_gained = XP_MISSION_COMPLETE_BONUS
            .saturating_add(minutes.saturating_mul(XP_PER_MINUTE));
        let new_badges = self.award_xp(xp_gained);
        self.append_log(
            "System",
            format!("{} reward unlocked: {}", reward.rarity, reward.text),
            LogKind::Reward,
        );
        self.emit(&SagaEvent::RewardUnlocked(reward.clone()));
        self.emit_missions();
        Ok(Some(CompletionOutcome {
            reward,
            xp_gained,
            new_badges,
            progress: self.missions.progress(),
        }))
    }

    pub fn reorder(&mut self, ids_in_display_order: &[MissionId]) {
        self.missions.reorder(ids_in_display_order);
        self.emit_missions();
    }

    /// Grant a reward outside the mission flow.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::InvalidRarity` if `rarity` is not a known tier.
    pub fn grant_reward(
        &mut self,
        text: impl Into<String>,
        rarity: &str,
    ) -> Result<Reward, SagaError> {
        let reward = self.missions.rewards_mut().add_reward_tagged(text, rarity)?;
        self.append_log(
            "System",
            format!("{} reward granted: {}", reward.rarity, reward.text),
            LogKind::Reward,
        );
        self.emit(&SagaEvent::RewardUnlocked(reward.clone()));
        Ok(reward)
    }

    /// Credit a finished study timer.
    pub fn log_study_session(&mut self, minutes: u32) -> Vec<BadgeRule> {
        let before = self.progression.xp();
        let badges = self.progression.award_study_minutes(minutes);
        self.after_award(before, &badges);
        self.append_log("Player", format!("Studied for {minutes} min"), LogKind::Player);
        badges
    }

    pub fn record_mock_test(&mut self) -> Vec<BadgeRule> {
        let before = self.progression.xp();
        let badges = self.progression.award_mock_test();
        self.after_award(before, &badges);
        self.append_log("Player", "Completed a mock test", LogKind::Player);
        badges
    }

    pub fn record_player_action(&mut self, text: impl Into<String>) -> LogEntry {
        self.append_log("Player", text, LogKind::Player)
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.missions.progress()
    }

    #[must_use]
    pub fn missions(&self) -> Vec<Mission> {
        self.missions.missions()
    }

    #[must_use]
    pub fn ledger(&self) -> Vec<Reward> {
        self.missions.rewards().ledger()
    }

    #[must_use]
    pub const fn xp(&self) -> u32 {
        self.progression.xp()
    }

    #[must_use]
    pub fn badges(&self) -> Vec<BadgeRule> {
        self.progression.badges()
    }

    #[must_use]
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.log.entries()
    }

    #[must_use]
    pub fn snapshot(&self) -> SagaSnapshot {
        SagaSnapshot {
            missions: self.missions(),
            ledger: self.ledger(),
            progress: self.progress(),
            xp: self.xp(),
            badges: self.badges(),
            log: self.log_entries(),
        }
    }

    fn award_xp(&mut self, xp: u32) -> Vec<BadgeRule> {
        let before = self.progression.xp();
        let badges = self.progression.award(xp);
        self.after_award(before, &badges);
        badges
    }

    fn after_award(&mut self, before: u32, badges: &[BadgeRule]) {
        if self.progression.xp() != before {
            self.emit(&SagaEvent::XpChanged(self.progression.xp()));
        }
        for badge in badges {
            self.system_log(format!("Badge earned: {}", badge.name));
            self.emit(&SagaEvent::BadgeEarned(*badge));
        }
    }

    fn system_log(&mut self, text: String) {
        self.append_log("System", text, LogKind::System);
    }

    fn append_log(&mut self, who: &str, text: impl Into<String>, kind: LogKind) -> LogEntry {
        let entry = self.log.record(who, text, kind);
        self.emit(&SagaEvent::LogAppended(entry.clone()));
        entry
    }

    fn emit_missions(&self) {
        if self.presenter.is_some() {
            self.emit(&SagaEvent::MissionsChanged {
                missions: self.missions.missions(),
                progress: self.missions.progress(),
            });
        }
    }

    fn emit(&self, event: &SagaEvent) {
        if let Some(presenter) = &self.presenter {
            presenter.notify(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SteppingClock;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<SagaEvent>>>,
    }

    impl Presenter for Recorder {
        fn notify(&self, event: &SagaEvent) {
            self.events.borrow_mut().push(event.clone());
        }
    }

    fn blank_config() -> SagaConfig {
        SagaConfig {
            seed_default_missions: false,
            ..SagaConfig::default_config()
        }
    }

    fn open(storage: MemoryStore, config: SagaConfig) -> Saga<MemoryStore> {
        Saga::open(storage, config, 0x50_u64, Rc::new(SteppingClock::from_epoch())).unwrap()
    }

    #[test]
    fn first_run_seeds_starter_missions_once() {
        let storage = MemoryStore::new();
        let mut saga = open(storage.clone(), SagaConfig::default_config());
        assert_eq!(saga.missions().len(), 5);
        let first = saga.missions()[0].id.clone();
        saga.delete_mission(&first);

        let reopened = open(storage, SagaConfig::default_config());
        assert_eq!(reopened.missions().len(), 4);
    }

    #[test]
    fn completion_awards_bonus_plus_minutes() {
        let mut saga = open(MemoryStore::new(), blank_config());
        let mission = saga.add_mission_with(NewMission::new("Essay", "Task 2").with_minutes(20));
        let outcome = saga.complete_mission(&mission.id).unwrap().unwrap();
        assert_eq!(outcome.xp_gained, 50);
        assert_eq!(outcome.new_badges.len(), 1);
        assert_eq!(outcome.progress.percent, 100);
        assert_eq!(saga.xp(), 50);
        assert!(saga.complete_mission(&mission.id).unwrap().is_none());
        assert_eq!(saga.xp(), 50);
        assert_eq!(saga.ledger().len(), 1);
    }

    #[test]
    fn presenter_sees_reward_and_mission_snapshots() {
        let recorder = Recorder::default();
        let mut saga = open(MemoryStore::new(), blank_config()).with_presenter(recorder.clone());
        let mission = saga.add_mission("A", "");
        saga.complete_mission(&mission.id).unwrap();

        let events = recorder.events.borrow();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, SagaEvent::RewardUnlocked(_)))
        );
        let last_missions = events
            .iter()
            .rev()
            .find_map(|e| match e {
                SagaEvent::MissionsChanged { missions, .. } => Some(missions.clone()),
                _ => None,
            })
            .unwrap();
        assert!(last_missions[0].completed);
    }

    #[test]
    fn grant_reward_validates_rarity() {
        let mut saga = open(MemoryStore::new(), blank_config());
        assert!(matches!(
            saga.grant_reward("Cake", "ultra"),
            Err(SagaError::InvalidRarity(_))
        ));
        assert!(saga.ledger().is_empty());
        let reward = saga.grant_reward("Cake", "rare").unwrap();
        assert_eq!(saga.ledger(), vec![reward]);
    }

    #[test]
    fn log_is_newest_first_and_tracks_actions() {
        let mut saga = open(MemoryStore::new(), blank_config());
        saga.add_mission("A", "");
        saga.record_player_action("Started Saga");
        let log = saga.log_entries();
        assert_eq!(log[0].text, "Started Saga");
        assert_eq!(log[1].text, "Mission added: A");
    }

    #[test]
    fn study_and_mock_sessions_accumulate_badges() {
        let mut saga = open(MemoryStore::new(), blank_config());
        assert!(saga.log_study_session(20).is_empty());
        let earned = saga.record_mock_test();
        assert_eq!(earned.iter().map(|b| b.id).collect::<Vec<_>>(), vec!["novice"]);
        assert_eq!(saga.snapshot().badges.len(), 1);
    }

    #[test]
    fn invalid_reward_config_fails_open() {
        let mut config = blank_config();
        config.rewards.pool.common.clear();
        let result = Saga::open(
            MemoryStore::new(),
            config,
            1,
            Rc::new(SteppingClock::from_epoch()),
        );
        assert!(matches!(result, Err(SagaError::Configuration(_))));
    }

    #[test]
    fn config_json_defaults_missing_sections() {
        let config = SagaConfig::from_json(r#"{"seed_default_missions":false}"#).unwrap();
        assert!(!config.seed_default_missions);
        assert_eq!(config.log_capacity, LOG_CAPACITY);
        assert_eq!(config.storage_keys, StorageKeys::default());
    }
}
