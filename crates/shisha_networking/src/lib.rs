//! # SHISHA Networking - Replication Channel
//!
//! Authority-to-follower replication for NPC agents.
//!
//! ## Primitives
//!
//! - **Persisted variable**: the authority writes, every connected follower
//!   is notified, and a follower joining later can resync the current value.
//! - **One-shot event**: delivered to the followers connected when it fires,
//!   never resent. Scoped to one agent id.
//! - **Upstream request**: a follower asks the authority to act (for example
//!   detaching loot it grabbed). The authority decides.
//!
//! ## Authority Model
//!
//! ```text
//! AUTHORITY                        FOLLOWER
//!   |                                 |
//!   |--- Variable(state=Idle, v7) --->| <- mirror applies if v7 is newer
//!   |--- Event(Idle1) --------------->| <- presenter fires trigger
//!   |<-- Request(DetachLoot) ---------|
//!   |                                 |
//! ```
//!
//! Followers NEVER infer state. They reflect what was replicated.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod hub;
pub mod mirror;
pub mod protocol;

pub use error::{ReplicationError, ReplicationResult, WireError, WireResult};
pub use hub::{FollowerId, FollowerLink, ReplicationAuthority, ReplicationHub};
pub use mirror::{MirrorChange, VariableMirror};
pub use protocol::{
    AgentEvent, Message, PersistedValue, Scope, Upstream, VariableKey, SCHEMA_VERSION,
};
