//! Centralized tuning constants and first-run content for Soul Reaper Saga.
//!
//! Reward pools and thresholds here are only defaults; deployments can
//! replace them through `SagaConfig`.

use crate::missions::MissionKind;

// Storage keys -------------------------------------------------------------
pub(crate) const KEY_MISSIONS: &str = "soulReaperMissions";
pub(crate) const KEY_REWARDS: &str = "soulReaperRewards";
pub(crate) const KEY_PROGRESSION: &str = "srs_v2_progress";
pub(crate) const KEY_LOGS: &str = "srs_v2_logs";

// Rarity thresholds (cumulative upper bounds on a 0..100 roll) -------------
pub(crate) const THRESHOLD_COMMON: f64 = 60.0;
pub(crate) const THRESHOLD_RARE: f64 = 85.0;
pub(crate) const THRESHOLD_EPIC: f64 = 97.0;
pub(crate) const ROLL_CEILING: f64 = 100.0;

// Progression --------------------------------------------------------------
pub const XP_PER_MINUTE: u32 = 2;
pub const XP_MISSION_COMPLETE_BONUS: u32 = 10;
pub const MOCK_XP_REWARD: u32 = 40;

// Missions -----------------------------------------------------------------
pub(crate) const DEFAULT_MISSION_MINUTES: u32 = 15;
pub(crate) const MISSION_ID_PREFIX: &str = "m";
pub(crate) const ID_LEN: usize = 7;
pub(crate) const LOG_ID_PREFIX: &str = "log";

// Battle log ---------------------------------------------------------------
pub(crate) const LOG_CAPACITY: usize = 200;

// Seed stream tags ---------------------------------------------------------
pub(crate) const STREAM_REWARDS: &[u8] = b"rewards";
pub(crate) const STREAM_MISSIONS: &[u8] = b"missions";
pub(crate) const STREAM_LOGS: &[u8] = b"logs";

pub(crate) const DEFAULT_MISSIONS: [(&str, &str, MissionKind); 5] = [
    (
        "Defeat Captain Listening",
        "Complete 1 Listening test",
        MissionKind::Listening,
    ),
    (
        "Defeat Captain Reading",
        "Read 1 passage under 20 min",
        MissionKind::Reading,
    ),
    (
        "Defeat Captain Writing",
        "Write 1 Task 2 essay",
        MissionKind::Writing,
    ),
    (
        "Defeat Captain Speaking",
        "Record yourself answering Part 2",
        MissionKind::Speaking,
    ),
    (
        "Defeat Captain Grammar",
        "Master 10 conditionals",
        MissionKind::Grammar,
    ),
];

pub(crate) const POOL_COMMON: [&str; 4] = [
    "Motivation boost: +5% focus",
    "Aizen smirks: 'You're on the right path'",
    "Unlocked 1 random Kanji word",
    "Minor stamina recovery potion",
];

pub(crate) const POOL_RARE: [&str; 4] = [
    "Unlocked Captain's hidden technique",
    "Shadow training unlocked (double XP for 1 hour)",
    "Secret passage discovered in Seireitei",
    "Spirit core boost: +15% progress",
];

pub(crate) const POOL_EPIC: [&str; 4] = [
    "Zanpakutō Awakening (new ability discovered)",
    "Unlocked hidden Bleach soundtrack track",
    "Hallucination vision of final battle",
    "Aizen whispers forbidden knowledge",
];

pub(crate) const POOL_LEGENDARY: [&str; 4] = [
    "Final Form: +30% boost until next mission",
    "Immortalized in Soul Reaper Records",
    "Secret dialogue unlocked with Aizen",
    "Reality bends: you see beyond 7.5",
];
