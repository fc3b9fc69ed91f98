//! # Simulation Constants
//!
//! Values both sides must agree on. Tunables that a server operator may
//! change live in the config snapshot instead.

/// Simulation ticks per second on the authority.
pub const TICK_RATE: u32 = 60;

/// Distance at which a fleeing agent counts as arrived.
pub const FLEE_ARRIVAL_EPSILON: f32 = 3.0;

/// Minimum time between two processed hits (seconds).
pub const HIT_COOLDOWN_SECS: f32 = 0.03;

/// Radius around a corpse in which the death burst places loot.
pub const DEATH_BURST_RADIUS: f32 = 2.0;

/// Delay from entering `Dead` until the corpse poofs and drops loot (seconds).
pub const DEATH_SETTLE_SECS: f32 = 1.1;

/// Delay from the loot burst until the agent is removed (seconds).
pub const DEATH_DESPAWN_SECS: f32 = 0.5;

/// Interval between unseen-departure checks (seconds).
pub const DEPARTURE_POLL_SECS: f32 = 1.0;
