//! # Config Snapshot
//!
//! Every tunable the authority and the followers read, loaded once at
//! startup and passed by reference from then on.
//!
//! ```toml
//! [movement]
//! wander_radius = 50.0
//! wander_time_min = 5.0
//! wander_time_max = 45.0
//!
//! [idle]
//! loot_chance = 0.05
//!
//! [loot]
//! weights = { common = 65, uncommon = 25, rare = 10 }
//! ```
//!
//! Missing keys take their defaults. Out-of-range values are clamped by
//! [`ConfigSnapshot::sanitized`], never rejected.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use shisha_economy::LootTable;
use std::path::Path;

/// Movement, wandering and departure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Agents roam at all.
    pub wander_enabled: bool,
    /// Wander around the spawn point instead of the current position.
    pub anchored_wandering: bool,
    /// Wander radius.
    pub wander_radius: f32,
    /// Roaming top speed.
    pub max_speed: f32,
    /// Roaming top acceleration.
    pub max_acceleration: f32,
    /// Shortest roaming stretch before idling (seconds).
    pub wander_time_min: f32,
    /// Longest roaming stretch before idling (seconds).
    pub wander_time_max: f32,
    /// Speed multiplier while running away.
    pub flee_speed_multiplier: f32,
    /// Acceleration multiplier while running away.
    pub flee_acceleration_multiplier: f32,
    /// Highest observed speed still animated as a walk.
    pub walk_speed_threshold: f32,
    /// Leave once unseen at the end of the day.
    pub leave_at_day_end: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            wander_enabled: true,
            anchored_wandering: true,
            wander_radius: 50.0,
            max_speed: 4.0,
            max_acceleration: 5.0,
            wander_time_min: 5.0,
            wander_time_max: 45.0,
            flee_speed_multiplier: 2.25,
            flee_acceleration_multiplier: 2.5,
            walk_speed_threshold: 2.0,
            leave_at_day_end: true,
        }
    }
}

/// Damage handling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Agents can die.
    pub killable: bool,
    /// Health at spawn.
    pub starting_health: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            killable: true,
            starting_health: 3,
        }
    }
}

/// The loot-producing idle action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Idle may produce loot.
    pub loot_enabled: bool,
    /// Probability of producing loot on each idle entry.
    pub loot_chance: f32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            loot_enabled: true,
            loot_chance: 0.05,
        }
    }
}

/// Ambient and footstep audio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Shortest gap between ambient clips (seconds).
    pub ambient_time_min: f32,
    /// Longest gap between ambient clips (seconds).
    pub ambient_time_max: f32,
    /// Ambient volume in `[0, 1]`.
    pub ambient_volume: f32,
    /// Footstep volume in `[0, 1]`.
    pub footstep_volume: f32,
    /// Gap between footsteps while moving (seconds).
    pub footstep_interval: f32,
    /// Ambient clip pool. The authority only needs its length.
    pub ambient_clips: Vec<String>,
    /// Footstep clip pool.
    pub footstep_clips: Vec<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ambient_time_min: 7.5,
            ambient_time_max: 30.0,
            ambient_volume: 0.4,
            footstep_volume: 0.7,
            footstep_interval: 0.5,
            ambient_clips: vec![
                "ambient_hum".to_owned(),
                "ambient_chirp".to_owned(),
                "ambient_sigh".to_owned(),
            ],
            footstep_clips: vec![
                "step_soft".to_owned(),
                "step_heavy".to_owned(),
            ],
        }
    }
}

impl AudioConfig {
    /// Ambient volume as played back.
    #[must_use]
    pub fn ambient_playback_volume(&self) -> f32 {
        self.ambient_volume.clamp(0.0, 1.0) * 2.0
    }

    /// Footstep volume as played back.
    #[must_use]
    pub fn footstep_playback_volume(&self) -> f32 {
        self.footstep_volume.clamp(0.0, 1.0) * 2.0
    }
}

/// All tunables for one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    /// Movement and wandering.
    pub movement: MovementConfig,
    /// Damage handling.
    pub combat: CombatConfig,
    /// Idle loot action.
    pub idle: IdleConfig,
    /// Audio cadence and pools.
    pub audio: AudioConfig,
    /// Loot weights and value ranges.
    pub loot: LootTable,
}

/// Clamps, mapping NaN/inf to `fallback`.
fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

impl ConfigSnapshot {
    /// Parses a snapshot. The result is not yet sanitized.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a snapshot file. The result is not yet sanitized.
    ///
    /// # Errors
    ///
    /// I/O or parse failure.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Returns a copy with every value forced into its legal range.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let mut out = self.clone();

        let m = &mut out.movement;
        let dm = &defaults.movement;
        m.wander_radius = clamp_finite(m.wander_radius, 1.0, 500.0, dm.wander_radius);
        m.max_speed = clamp_finite(m.max_speed, 0.1, 100.0, dm.max_speed);
        m.max_acceleration = clamp_finite(m.max_acceleration, 0.1, 100.0, dm.max_acceleration);
        m.wander_time_min = clamp_finite(m.wander_time_min, 0.0, 500.0, dm.wander_time_min);
        m.wander_time_max =
            clamp_finite(m.wander_time_max, m.wander_time_min, 1000.0, m.wander_time_min);
        m.flee_speed_multiplier =
            clamp_finite(m.flee_speed_multiplier, 0.0, 100.0, dm.flee_speed_multiplier);
        m.flee_acceleration_multiplier = clamp_finite(
            m.flee_acceleration_multiplier,
            0.0,
            100.0,
            dm.flee_acceleration_multiplier,
        );
        m.walk_speed_threshold =
            clamp_finite(m.walk_speed_threshold, 0.01, 100.0, dm.walk_speed_threshold);

        out.combat.starting_health = out.combat.starting_health.max(1);
        out.idle.loot_chance = clamp_finite(out.idle.loot_chance, 0.0, 1.0, 0.0);

        let a = &mut out.audio;
        let da = &defaults.audio;
        a.ambient_time_min = clamp_finite(a.ambient_time_min, 0.0, 500.0, da.ambient_time_min);
        a.ambient_time_max =
            clamp_finite(a.ambient_time_max, a.ambient_time_min, 1000.0, a.ambient_time_min);
        a.ambient_volume = clamp_finite(a.ambient_volume, 0.0, 1.0, da.ambient_volume);
        a.footstep_volume = clamp_finite(a.footstep_volume, 0.0, 1.0, da.footstep_volume);
        a.footstep_interval = clamp_finite(a.footstep_interval, 0.05, 60.0, da.footstep_interval);

        if out != *self {
            tracing::warn!("config values out of range were clamped");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_product_values() {
        let config = ConfigSnapshot::default();
        assert_eq!(config.movement.wander_radius, 50.0);
        assert_eq!(config.movement.max_speed, 4.0);
        assert_eq!(config.movement.max_acceleration, 5.0);
        assert_eq!(config.idle.loot_chance, 0.05);
        assert_eq!(config.combat.starting_health, 3);
        assert_eq!(config.loot.weights.common, 65);
        assert_eq!(config, config.sanitized());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConfigSnapshot::from_toml_str(
            r"
            [movement]
            wander_time_min = 5.0
            wander_time_max = 5.0

            [combat]
            starting_health = 10
            ",
        )
        .unwrap();

        assert_eq!(config.movement.wander_time_max, 5.0);
        assert_eq!(config.movement.wander_radius, 50.0);
        assert_eq!(config.combat.starting_health, 10);
        assert!(config.combat.killable);
    }

    #[test]
    fn test_sanitized_clamps_ranges() {
        let mut config = ConfigSnapshot::default();
        config.movement.wander_radius = 0.0;
        config.movement.max_speed = 500.0;
        config.movement.wander_time_min = 20.0;
        config.movement.wander_time_max = 10.0;
        config.idle.loot_chance = 3.0;
        config.audio.ambient_volume = -1.0;
        config.audio.ambient_time_max = f32::NAN;
        config.combat.starting_health = -4;

        let clean = config.sanitized();
        assert_eq!(clean.movement.wander_radius, 1.0);
        assert_eq!(clean.movement.max_speed, 100.0);
        assert_eq!(clean.movement.wander_time_max, 20.0);
        assert_eq!(clean.idle.loot_chance, 1.0);
        assert_eq!(clean.audio.ambient_volume, 0.0);
        assert_eq!(clean.audio.ambient_time_max, clean.audio.ambient_time_min);
        assert_eq!(clean.combat.starting_health, 1);
    }

    #[test]
    fn test_playback_volume_doubles() {
        let audio = AudioConfig::default();
        assert!((audio.ambient_playback_volume() - 0.8).abs() < 1e-6);
        assert!((audio.footstep_playback_volume() - 1.4).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(matches!(
            ConfigSnapshot::from_toml_str("[movement\nwander_radius = "),
            Err(ConfigError::Parse(_))
        ));
    }
}
