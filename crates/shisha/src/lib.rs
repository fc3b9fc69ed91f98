//! # SHISHA - Networked NPC Authority Core
//!
//! A small wandering creature replicated from one authority to any number
//! of followers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────── AUTHORITY ────────────────┐        ┌──────── FOLLOWER ────────┐
//! │ TickLoop ──> AgentHost                    │        │ FollowerSession          │
//! │               ├─ BehaviourMachine         │ frames │  ├─ VariableMirror       │
//! │               ├─ NavOracle / find_node    │───────>│  └─ FollowerPresenter    │
//! │               ├─ LootObject lifecycle     │<───────│        └─ PresentationSink│
//! │               └─ ReplicationAuthority     │requests│                          │
//! └───────────────────────────────────────────┘        └──────────────────────────┘
//! ```
//!
//! Only the authority evaluates behaviour. Followers reflect replicated
//! variables and one-shot events and nothing else.
//!
//! ## Example
//!
//! ```rust,ignore
//! use shisha::{AgentHost, ConfigSnapshot, SpawnParams};
//!
//! let mut host = AgentHost::new(&config, oracle, directory, nodes, seed);
//! host.attach_channel(&hub)?;
//! let id = host.spawn(position, SpawnParams::default())?;
//! host.tick(1.0 / 60.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod authority;
pub mod config;
pub mod error;
pub mod follower;
pub mod tick;

pub use authority::{
    ActorDirectory, ActorRoster, Agent, AgentCommand, AgentHost, BehaviourMachine, HitOutcome,
    NavigationHandle, SimulatedNavAgent, SpawnParams,
};
pub use config::{AudioConfig, CombatConfig, ConfigSnapshot, IdleConfig, MovementConfig};
pub use error::{ConfigError, SpawnError};
pub use follower::{
    AudioSource, FollowerPresenter, FollowerSession, LootParent, PresentationSink, RecordingSink,
    SinkCall,
};
pub use tick::{TickLoop, TickStats};
