//! Reward rarity tiers and the cumulative threshold table used to roll them.
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{ROLL_CEILING, THRESHOLD_COMMON, THRESHOLD_EPIC, THRESHOLD_RARE};
use crate::error::SagaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Self; 4] = [Self::Common, Self::Rare, Self::Epic, Self::Legendary];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = SagaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rarity| rarity.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SagaError::InvalidRarity(s.to_string()))
    }
}

/// Cumulative upper bounds on a roll in `[0, 100)`.
///
/// Intervals are half-open: `[0, common)`, `[common, rare)`, `[rare, epic)`,
/// `[epic, 100)`. Equal neighbouring bounds make a tier unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RarityThresholds {
    #[serde(default = "RarityThresholds::default_common")]
    pub common: f64,
    #[serde(default = "RarityThresholds::default_rare")]
    pub rare: f64,
    #[serde(default = "RarityThresholds::default_epic")]
    pub epic: f64,
}

impl RarityThresholds {
    const fn default_common() -> f64 {
        THRESHOLD_COMMON
    }

    const fn default_rare() -> f64 {
        THRESHOLD_RARE
    }

    const fn default_epic() -> f64 {
        THRESHOLD_EPIC
    }

    /// Check that bounds are finite, ascending and inside `[0, 100]`.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Configuration` describing the first violated bound.
    pub fn validate(&self) -> Result<(), SagaError> {
        let bounds = [
            ("common", self.common),
            ("rare", self.rare),
            ("epic", self.epic),
        ];
        let mut floor = 0.0;
        for (name, bound) in bounds {
            if !bound.is_finite() || bound < floor || bound > ROLL_CEILING {
                return Err(SagaError::configuration(format!(
                    "{name} threshold {bound} must lie between {floor} and {ROLL_CEILING}"
                )));
            }
            floor = bound;
        }
        Ok(())
    }

    /// Map a roll in `[0, 100)` to its tier, testing bounds in order.
    #[must_use]
    pub fn classify(&self, roll: f64) -> Rarity {
        if roll < self.common {
            Rarity::Common
        } else if roll < self.rare {
            Rarity::Rare
        } else if roll < self.epic {
            Rarity::Epic
        } else {
            Rarity::Legendary
        }
    }

    /// Draw a uniform roll in `[0, 100)` and classify it.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Rarity {
        self.classify(rng.gen_range(0.0..ROLL_CEILING))
    }

    /// Probability mass (in percent) assigned to `rarity`.
    #[must_use]
    pub fn share(&self, rarity: Rarity) -> f64 {
        let (low, high) = match rarity {
            Rarity::Common => (0.0, self.common),
            Rarity::Rare => (self.common, self.rare),
            Rarity::Epic => (self.rare, self.epic),
            Rarity::Legendary => (self.epic, ROLL_CEILING),
        };
        (high - low).max(0.0)
    }

    #[must_use]
    pub fn is_reachable(&self, rarity: Rarity) -> bool {
        self.share(rarity) > 0.0
    }
}

impl Default for RarityThresholds {
    fn default() -> Self {
        Self {
            common: THRESHOLD_COMMON,
            rare: THRESHOLD_RARE,
            epic: THRESHOLD_EPIC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_boundaries_are_half_open() {
        let t = RarityThresholds::default();
        assert_eq!(t.classify(0.0), Rarity::Common);
        assert_eq!(t.classify(59.999), Rarity::Common);
        assert_eq!(t.classify(60.0), Rarity::Rare);
        assert_eq!(t.classify(84.999), Rarity::Rare);
        assert_eq!(t.classify(85.0), Rarity::Epic);
        assert_eq!(t.classify(96.999), Rarity::Epic);
        assert_eq!(t.classify(97.0), Rarity::Legendary);
        assert_eq!(t.classify(99.999), Rarity::Legendary);
    }

    #[test]
    fn default_shares_sum_to_hundred() {
        let t = RarityThresholds::default();
        let shares: Vec<f64> = Rarity::ALL.iter().map(|r| t.share(*r)).collect();
        assert_eq!(shares, vec![60.0, 25.0, 12.0, 3.0]);
        assert!((shares.iter().sum::<f64>() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rolled_distribution_matches_default_shares() {
        use rand::SeedableRng;
        use rand::rngs::SmallRng;

        const DRAWS: usize = 100_000;
        let t = RarityThresholds::default();
        let mut rng = SmallRng::seed_from_u64(0x5EED);
        let mut counts = [0_usize; 4];
        for _ in 0..DRAWS {
            let rolled = t.roll(&mut rng);
            let idx = Rarity::ALL.iter().position(|r| *r == rolled).unwrap();
            counts[idx] += 1;
        }
        for (rarity, count) in Rarity::ALL.iter().zip(counts) {
            #[allow(clippy::cast_precision_loss)]
            let observed = 100.0 * count as f64 / DRAWS as f64;
            let expected = t.share(*rarity);
            assert!(
                (observed - expected).abs() <= 2.0,
                "{rarity}: observed {observed:.2}% vs expected {expected:.2}%"
            );
        }
    }

    #[test]
    fn roll_with_floor_rng_is_common() {
        use rand::rngs::mock::StepRng;

        let mut rng = StepRng::new(0, 0);
        assert_eq!(RarityThresholds::default().roll(&mut rng), Rarity::Common);
    }

    #[test]
    fn collapsed_tier_is_unreachable() {
        let t = RarityThresholds {
            common: 50.0,
            rare: 50.0,
            epic: 100.0,
        };
        assert!(t.validate().is_ok());
        assert!(!t.is_reachable(Rarity::Rare));
        assert!(!t.is_reachable(Rarity::Legendary));
        assert_eq!(t.classify(50.0), Rarity::Epic);
    }

    #[test]
    fn validate_rejects_descending_and_out_of_range() {
        let descending = RarityThresholds {
            common: 70.0,
            rare: 60.0,
            epic: 97.0,
        };
        assert!(matches!(
            descending.validate(),
            Err(SagaError::Configuration(_))
        ));
        let overflow = RarityThresholds {
            epic: 101.0,
            ..RarityThresholds::default()
        };
        assert!(overflow.validate().is_err());
        let nan = RarityThresholds {
            common: f64::NAN,
            ..RarityThresholds::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn parses_tags_case_insensitively() {
        assert_eq!("Epic".parse::<Rarity>().unwrap(), Rarity::Epic);
        assert_eq!(" legendary ".parse::<Rarity>().unwrap(), Rarity::Legendary);
        assert_eq!(
            "mythic".parse::<Rarity>(),
            Err(SagaError::InvalidRarity("mythic".to_string()))
        );
    }
}
