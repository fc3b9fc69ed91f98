//! # Replication Protocol
//!
//! Versioned frames on top of a little-endian field codec.
//!
//! - `wire`: field-level writer/reader
//! - `messages`: the schema (variables, events, retire, requests)

pub mod messages;
pub mod wire;

pub use messages::{
    AgentEvent, Message, PersistedValue, Scope, Upstream, VariableKey, FRAME_HEADER_LEN,
    SCHEMA_VERSION,
};
pub use wire::{WireReader, WireWriter};
