//! # Save Tokens
//!
//! One `i32` per loot object, with fixed bit fields:
//!
//! ```text
//!  31 30 29      26 25 24 23                              0
//! ┌──┬──┬──────────┬─────┬─────────────────────────────────┐
//! │ 0│ 0│ version  │ tier│ value                           │
//! └──┴──┴──────────┴─────┴─────────────────────────────────┘
//! ```
//!
//! The legacy digit-concatenation format is not accepted.

use crate::error::{LootError, LootResult};
use shisha_shared::LootTier;

/// Format written by this build.
pub const SAVE_FORMAT_VERSION: u32 = 1;

const VALUE_BITS: u32 = 24;
const VALUE_MASK: u32 = (1 << VALUE_BITS) - 1;
const TIER_SHIFT: u32 = 24;
const TIER_MASK: u32 = 0b11;
const VERSION_SHIFT: u32 = 26;
const VERSION_MASK: u32 = 0b1111;
const RESERVED_MASK: u32 = 0b11 << 30;

/// Largest value a token can carry.
pub const MAX_SAVED_VALUE: u32 = VALUE_MASK;

/// Persisted tier + value pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SaveToken(i32);

impl SaveToken {
    /// Packs a tier and value.
    ///
    /// # Errors
    ///
    /// [`LootError::ValueTooLarge`] above [`MAX_SAVED_VALUE`].
    pub fn encode(tier: LootTier, value: u32) -> LootResult<Self> {
        if value > MAX_SAVED_VALUE {
            return Err(LootError::ValueTooLarge {
                value,
                max: MAX_SAVED_VALUE,
            });
        }
        let bits = (SAVE_FORMAT_VERSION << VERSION_SHIFT)
            | (u32::from(tier.index()) << TIER_SHIFT)
            | value;
        // Top two bits are always clear, so the cast is lossless.
        Ok(Self(i32::from_ne_bytes(bits.to_ne_bytes())))
    }

    /// Unpacks the tier and value.
    ///
    /// # Errors
    ///
    /// Negative token, reserved bits, unknown version or invalid tier.
    pub fn decode(self) -> LootResult<(LootTier, u32)> {
        let token = self.0;
        if token < 0 {
            return Err(LootError::NegativeToken(token));
        }
        let bits = u32::from_ne_bytes(token.to_ne_bytes());
        if bits & RESERVED_MASK != 0 {
            return Err(LootError::ReservedBitsSet(token));
        }
        let version = (bits >> VERSION_SHIFT) & VERSION_MASK;
        if version != SAVE_FORMAT_VERSION {
            return Err(LootError::UnknownSaveVersion { token, version });
        }
        // Masked to two bits, always fits.
        let tier_bits = ((bits >> TIER_SHIFT) & TIER_MASK) as u8;
        let tier = LootTier::from_u8(tier_bits).ok_or(LootError::InvalidTier {
            token,
            tier: tier_bits,
        })?;
        Ok((tier, bits & VALUE_MASK))
    }

    /// Wraps a raw token read from save data.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw token for save data.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loot::LootTable;

    #[test]
    fn test_round_trip_across_configured_ranges() {
        let table = LootTable::default();
        for tier in LootTier::ALL {
            let range = table.range(tier);
            for value in range.min..=range.max {
                let token = SaveToken::encode(tier, value).unwrap();
                assert_eq!(token.decode(), Ok((tier, value)));
            }
        }
    }

    #[test]
    fn test_edge_values_round_trip() {
        for value in [0, 1, 9, 10, 99, 100, 1_000, MAX_SAVED_VALUE] {
            let token = SaveToken::encode(LootTier::Rare, value).unwrap();
            assert_eq!(token.decode(), Ok((LootTier::Rare, value)));
        }
    }

    #[test]
    fn test_oversized_value_rejected() {
        assert!(matches!(
            SaveToken::encode(LootTier::Common, MAX_SAVED_VALUE + 1),
            Err(LootError::ValueTooLarge { .. })
        ));
    }

    #[test]
    fn test_legacy_digit_tokens_rejected() {
        // "1" ++ "27" from the old format.
        assert!(matches!(
            SaveToken::from_raw(127).decode(),
            Err(LootError::UnknownSaveVersion { version: 0, .. })
        ));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert_eq!(
            SaveToken::from_raw(-5).decode(),
            Err(LootError::NegativeToken(-5))
        );
        assert_eq!(
            SaveToken::from_raw(1 << 30).decode(),
            Err(LootError::ReservedBitsSet(1 << 30))
        );
        let bad_tier = (1 << 26) | (3 << 24) | 40;
        assert!(matches!(
            SaveToken::from_raw(bad_tier).decode(),
            Err(LootError::InvalidTier { tier: 3, .. })
        ));
    }
}
