//! Replicated enumerations.
//!
//! Both enums travel as a single byte. Decoding an unknown byte yields
//! `None`; callers turn that into a wire error rather than guessing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavior state of an agent, as decided by the authority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BehaviourState {
    /// Wandering between navigable points.
    #[default]
    Roaming = 0,
    /// Standing still, playing an idle or loot animation.
    Idle = 1,
    /// Fleeing from an aggressor after non-lethal damage.
    RunningAway = 2,
    /// Terminal.
    Dead = 3,
}

impl BehaviourState {
    /// Wire byte.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a wire byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Roaming),
            1 => Some(Self::Idle),
            2 => Some(Self::RunningAway),
            3 => Some(Self::Dead),
            _ => None,
        }
    }

    /// Human-readable name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Roaming => "Roaming",
            Self::Idle => "Idle",
            Self::RunningAway => "RunningAway",
            Self::Dead => "Dead",
        }
    }

    /// True once nothing can leave this state.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Dead)
    }
}

impl fmt::Display for BehaviourState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Quality tier of a loot object. Determines its value range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LootTier {
    /// Tier 0.
    Common = 0,
    /// Tier 1.
    Uncommon = 1,
    /// Tier 2.
    Rare = 2,
}

impl LootTier {
    /// Every tier, in index order.
    pub const ALL: [Self; 3] = [Self::Common, Self::Uncommon, Self::Rare];

    /// Tier index (0, 1 or 2).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Parses a tier index.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Common),
            1 => Some(Self::Uncommon),
            2 => Some(Self::Rare),
            _ => None,
        }
    }

    /// Human-readable name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
        }
    }
}

impl fmt::Display for LootTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_bytes_rejected() {
        assert_eq!(BehaviourState::from_u8(4), None);
        assert_eq!(LootTier::from_u8(3), None);
    }

    #[test]
    fn test_only_dead_is_terminal() {
        let terminal: Vec<_> = (0..4)
            .filter_map(BehaviourState::from_u8)
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![BehaviourState::Dead]);
    }
}
