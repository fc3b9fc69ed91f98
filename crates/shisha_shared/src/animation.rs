//! # Symbolic Animation Parameters
//!
//! The authority never talks to an animator. It emits these enums and the
//! follower's presentation sink maps them to whatever the renderer uses.
//!
//! ```text
//! Authority ──AnimationTrigger/PresentationFlag──> Follower ──name()──> Animator
//! ```

use serde::{Deserialize, Serialize};

/// One-shot animation triggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnimationTrigger {
    /// First idle variant.
    Idle1 = 0,
    /// Second idle variant.
    Idle2 = 1,
    /// Loot-producing idle variant.
    Poo = 2,
    /// Snap back into the walk cycle after idling.
    ForceWalk = 3,
    /// Flinch on non-lethal damage.
    GotHit = 4,
}

impl AnimationTrigger {
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
            0 => Some(Self::Idle1),
            1 => Some(Self::Idle2),
            2 => Some(Self::Poo),
            3 => Some(Self::ForceWalk),
            4 => Some(Self::GotHit),
            _ => None,
        }
    }

    /// Animator parameter name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle1 => "Idle1",
            Self::Idle2 => "Idle2",
            Self::Poo => "Poo",
            Self::ForceWalk => "ForceWalk",
            Self::GotHit => "GotHit",
        }
    }
}

/// Boolean presentation flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PresentationFlag {
    /// Walk cycle.
    Walk = 0,
    /// Run cycle.
    Run = 1,
    /// Death pose.
    Dead = 2,
}

impl PresentationFlag {
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
            0 => Some(Self::Walk),
            1 => Some(Self::Run),
            2 => Some(Self::Dead),
            _ => None,
        }
    }

    /// Animator parameter name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Walk => "Walk",
            Self::Run => "Run",
            Self::Dead => "Dead",
        }
    }
}

/// Float presentation parameters. Only followers set these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationFloat {
    /// Walk playback multiplier.
    WalkSpeed,
    /// Run playback multiplier.
    RunSpeed,
}

impl AnimationFloat {
    /// Animator parameter name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WalkSpeed => "WalkSpeed",
            Self::RunSpeed => "RunSpeed",
        }
    }
}
