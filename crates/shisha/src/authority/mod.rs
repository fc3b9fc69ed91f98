//! # Authority
//!
//! Everything that only runs on the authoritative process: the agent model,
//! the behaviour machine, the mover abstraction and the host that wires them
//! to replication, loot and timers.
//!
//! ```text
//! ┌──────────────────────────── AgentHost ────────────────────────────┐
//! │  BehaviourMachine ──AgentCommand──> replication / loot / timers   │
//! │        │                                                          │
//! │   NavigationHandle     NavOracle     ActorDirectory               │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

mod agent;
mod directory;
mod host;
mod machine;
mod navigation;

pub use agent::{Agent, LOOT_PLACEHOLDER_OFFSET};
pub use directory::{ActorDirectory, ActorRoster};
pub use host::{AgentHost, SpawnParams};
pub use machine::{AgentCommand, BehaviourMachine, HitOutcome, WANDER_ARRIVAL_EPSILON};
pub use navigation::{NavigationHandle, SimulatedNavAgent};
