//! # Error Types
//!
//! Failures surfaced by the agent host and the config loader. Everything
//! that happens after an agent exists is logged instead of returned: a
//! dropped replication write must never stop the simulation.

use shisha_networking::ReplicationError;
use thiserror::Error;

/// Why an agent could not be spawned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// The host has no replication channel attached.
    #[error("no replication channel attached to the host")]
    NoChannel,

    /// The replication channel was closed.
    #[error("replication channel is closed")]
    ChannelClosed,

    /// Spawn position contains NaN or infinity.
    #[error("spawn position is not finite")]
    InvalidPosition,

    /// Replication rejected the spawn.
    #[error("replication error: {0}")]
    Replication(#[from] ReplicationError),
}

/// Config loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for the snapshot.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}
