//! # SHISHA Economy
//!
//! Loot objects spawned by agents: what tier and value they get, how they
//! are saved, and how they move from the agent into the world.
//!
//! ## Modules
//!
//! - `loot`: tier weights, value ranges, the spawn roll
//! - `save`: structured `i32` save tokens
//! - `lifecycle`: the attached/free state machine
//!
//! ## Determinism
//!
//! Nothing in this crate owns an RNG. Callers pass a seeded one in, so the
//! same seed always produces the same loot.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod lifecycle;
pub mod loot;
pub mod save;

pub use error::{LootError, LootResult};
pub use lifecycle::{Attachment, DetachCause, LootObject, Parent, FALL_TIME_RANGE};
pub use loot::{LootStatistics, LootTable, RolledLoot, TierWeights, ValueRange};
pub use save::{SaveToken, MAX_SAVED_VALUE, SAVE_FORMAT_VERSION};
