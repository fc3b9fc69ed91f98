//! # SHISHA Shared
//!
//! Vocabulary used by both the authority and its followers.
//!
//! ## CRITICAL RULE
//!
//! This crate holds types only. Anything that decides behavior belongs in
//! `shisha` (authority) and anything that moves bytes belongs in
//! `shisha_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod animation;
pub mod constants;
pub mod ids;
pub mod math;
pub mod state;

pub use animation::{AnimationFloat, AnimationTrigger, PresentationFlag};
pub use constants::{
    DEATH_BURST_RADIUS, DEATH_DESPAWN_SECS, DEATH_SETTLE_SECS, DEPARTURE_POLL_SECS,
    FLEE_ARRIVAL_EPSILON, HIT_COOLDOWN_SECS, TICK_RATE,
};
pub use ids::{ActorId, AgentId, LootId, NetObjectId};
pub use math::{lerp, Quaternion, Transform, Vec3};
pub use state::{BehaviourState, LootTier};
