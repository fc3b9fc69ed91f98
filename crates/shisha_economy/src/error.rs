//! # Economy Error Types
//!
//! All errors that can occur in the loot system.

use thiserror::Error;

/// Errors that can occur in the loot system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LootError {
    /// Value does not fit the save token's value field.
    #[error("loot value {value} exceeds save token maximum {max}")]
    ValueTooLarge {
        /// Offending value.
        value: u32,
        /// Largest encodable value.
        max: u32,
    },

    /// Save tokens are never negative.
    #[error("negative save token {0}")]
    NegativeToken(i32),

    /// Reserved bits were set.
    #[error("save token {0:#010x} has reserved bits set")]
    ReservedBitsSet(i32),

    /// Save format this build does not understand.
    #[error("save token {token:#010x} uses unknown format version {version}")]
    UnknownSaveVersion {
        /// Raw token.
        token: i32,
        /// Decoded version field.
        version: u32,
    },

    /// Tier field outside 0..=2.
    #[error("save token {token:#010x} carries invalid tier {tier}")]
    InvalidTier {
        /// Raw token.
        token: i32,
        /// Decoded tier field.
        tier: u8,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for loot operations.
pub type LootResult<T> = Result<T, LootError>;
