//! # Loot Table
//!
//! Tier selection and value draws for spawned loot objects.
//!
//! ## Roll
//!
//! ```text
//! roll ∈ [1, 100]
//!   roll <= common                 -> Common
//!   roll <= common + uncommon      -> Uncommon
//!   otherwise                      -> Rare
//! value ∈ [tier.min, tier.max] (inclusive, uniform)
//! ```
//!
//! Weights that do not sum to exactly 100 are replaced by 65/25/10.

use crate::error::{LootError, LootResult};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use shisha_shared::LootTier;

/// Spawn-weight percentages per tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierWeights {
    /// Common percentage.
    pub common: u32,
    /// Uncommon percentage.
    pub uncommon: u32,
    /// Rare percentage.
    pub rare: u32,
}

impl TierWeights {
    /// Substituted whenever configured weights do not sum to 100.
    pub const FALLBACK: Self = Self::new(65, 25, 10);

    /// Creates a weight triple.
    #[must_use]
    pub const fn new(common: u32, uncommon: u32, rare: u32) -> Self {
        Self {
            common,
            uncommon,
            rare,
        }
    }

    /// True when the three weights sum to exactly 100.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        u64::from(self.common) + u64::from(self.uncommon) + u64::from(self.rare) == 100
    }

    /// The weights actually used for rolling.
    #[must_use]
    pub fn effective(&self) -> Self {
        if self.is_valid() {
            *self
        } else {
            Self::FALLBACK
        }
    }

    /// Maps a roll in `[1, 100]` to a tier.
    #[must_use]
    pub fn tier_for_roll(&self, roll: u32) -> LootTier {
        let w = self.effective();
        if roll <= w.common {
            LootTier::Common
        } else if roll <= w.common + w.uncommon {
            LootTier::Uncommon
        } else {
            LootTier::Rare
        }
    }
}

impl Default for TierWeights {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Inclusive value range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lowest value.
    pub min: u32,
    /// Highest value.
    pub max: u32,
}

impl ValueRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Uniform draw. A `max` below `min` collapses to `min`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let max = self.max.max(self.min);
        rng.gen_range(self.min..=max)
    }

    /// Inclusive containment.
    #[must_use]
    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max.max(self.min)
    }
}

/// Outcome of one spawn roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RolledLoot {
    /// Raw roll in `[1, 100]`.
    pub roll: u32,
    /// Chosen tier.
    pub tier: LootTier,
    /// Drawn value.
    pub value: u32,
}

/// Weights and value ranges. Loaded from the `[loot]` config section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootTable {
    /// Tier weights.
    pub weights: TierWeights,
    /// Common value range.
    pub common: ValueRange,
    /// Uncommon value range.
    pub uncommon: ValueRange,
    /// Rare value range.
    pub rare: ValueRange,
}

impl Default for LootTable {
    fn default() -> Self {
        Self {
            weights: TierWeights::FALLBACK,
            common: ValueRange::new(20, 35),
            uncommon: ValueRange::new(40, 75),
            rare: ValueRange::new(80, 100),
        }
    }
}

impl LootTable {
    /// Parses a standalone loot table.
    ///
    /// # Errors
    ///
    /// [`LootError::InvalidConfig`] on malformed TOML.
    pub fn from_toml_str(source: &str) -> LootResult<Self> {
        toml::from_str(source).map_err(|e| LootError::InvalidConfig(e.to_string()))
    }

    /// Value range for a tier.
    #[must_use]
    pub const fn range(&self, tier: LootTier) -> ValueRange {
        match tier {
            LootTier::Common => self.common,
            LootTier::Uncommon => self.uncommon,
            LootTier::Rare => self.rare,
        }
    }

    /// Draws a value for an already-chosen tier.
    pub fn value_for<R: Rng + ?Sized>(&self, tier: LootTier, rng: &mut R) -> u32 {
        self.range(tier).sample(rng)
    }

    /// Rolls tier then value.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> RolledLoot {
        let roll = rng.gen_range(1..=100u32);
        let tier = self.weights.tier_for_roll(roll);
        let value = self.value_for(tier, rng);
        tracing::debug!("loot roll {} -> {} worth {}", roll, tier, value);
        RolledLoot { roll, tier, value }
    }

    /// Runs `iterations` seeded rolls and histograms the tiers.
    #[must_use]
    pub fn run_statistics(&self, seed: u64, iterations: u32) -> LootStatistics {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut stats = LootStatistics::new();
        for _ in 0..iterations {
            let rolled = self.roll(&mut rng);
            stats.total_rolls += 1;
            stats.tier_counts[usize::from(rolled.tier.index())] += 1;
            stats.value_sum += u64::from(rolled.value);
        }
        stats
    }
}

/// Statistics from loot table simulation.
#[derive(Clone, Debug, Default)]
pub struct LootStatistics {
    /// Total number of rolls performed.
    pub total_rolls: u64,
    /// Roll counts by tier index.
    pub tier_counts: [u64; 3],
    /// Sum of all drawn values.
    pub value_sum: u64,
}

impl LootStatistics {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of rolls that landed on `tier`, as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tier_rate_percent(&self, tier: LootTier) -> f64 {
        if self.total_rolls == 0 {
            0.0
        } else {
            (self.tier_counts[usize::from(tier.index())] as f64 / self.total_rolls as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        let weights = TierWeights::new(50, 30, 20);
        assert_eq!(weights.tier_for_roll(45), LootTier::Common);
        assert_eq!(weights.tier_for_roll(50), LootTier::Common);
        assert_eq!(weights.tier_for_roll(51), LootTier::Uncommon);
        assert_eq!(weights.tier_for_roll(75), LootTier::Uncommon);
        assert_eq!(weights.tier_for_roll(80), LootTier::Uncommon);
        assert_eq!(weights.tier_for_roll(81), LootTier::Rare);
        assert_eq!(weights.tier_for_roll(95), LootTier::Rare);
    }

    #[test]
    fn test_bad_weights_fall_back() {
        let weights = TierWeights::new(50, 50, 50);
        assert_eq!(weights.effective(), TierWeights::FALLBACK);
        assert_eq!(weights.tier_for_roll(65), LootTier::Common);
        assert_eq!(weights.tier_for_roll(66), LootTier::Uncommon);
        assert_eq!(weights.tier_for_roll(91), LootTier::Rare);
    }

    #[test]
    fn test_overflowing_weights_fall_back() {
        let weights = TierWeights::new(u32::MAX, 1, 0);
        assert!(!weights.is_valid());
    }

    #[test]
    fn test_values_stay_in_tier_range() {
        let table = LootTable::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..5_000 {
            let rolled = table.roll(&mut rng);
            assert!(table.range(rolled.tier).contains(rolled.value));
            assert!((1..=100).contains(&rolled.roll));
        }
    }

    #[test]
    fn test_inverted_range_collapses_to_min() {
        let range = ValueRange::new(30, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(range.sample(&mut rng), 30);
    }

    #[test]
    fn test_tier_distribution_matches_weights() {
        let table = LootTable {
            weights: TierWeights::new(50, 30, 20),
            ..LootTable::default()
        };
        let stats = table.run_statistics(42, 100_000);

        assert_eq!(stats.total_rolls, 100_000);
        assert!((stats.tier_rate_percent(LootTier::Common) - 50.0).abs() < 1.0);
        assert!((stats.tier_rate_percent(LootTier::Uncommon) - 30.0).abs() < 1.0);
        assert!((stats.tier_rate_percent(LootTier::Rare) - 20.0).abs() < 1.0);
    }

    #[test]
    fn test_fallback_distribution_is_deterministic() {
        let table = LootTable {
            weights: TierWeights::new(10, 10, 10),
            ..LootTable::default()
        };
        let a = table.run_statistics(7, 50_000);
        let b = table.run_statistics(7, 50_000);

        assert_eq!(a.tier_counts, b.tier_counts);
        assert!((a.tier_rate_percent(LootTier::Common) - 65.0).abs() < 1.5);
        assert!((a.tier_rate_percent(LootTier::Rare) - 10.0).abs() < 1.0);
    }

    #[test]
    fn test_table_from_toml() {
        let table = LootTable::from_toml_str(
            r#"
            weights = { common = 70, uncommon = 20, rare = 10 }
            rare = { min = 90, max = 120 }
            "#,
        )
        .unwrap();

        assert_eq!(table.weights, TierWeights::new(70, 20, 10));
        assert_eq!(table.rare, ValueRange::new(90, 120));
        assert_eq!(table.common, ValueRange::new(20, 35));
    }
}
