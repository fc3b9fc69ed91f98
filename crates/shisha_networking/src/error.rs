//! # Replication Error Types

use shisha_shared::NetObjectId;
use thiserror::Error;

/// Frame decoding failures. A malformed frame is never coerced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Ran out of bytes.
    #[error("truncated frame: needed {needed} more bytes, {remaining} left")]
    Truncated {
        /// Bytes the field needed.
        needed: usize,
        /// Bytes that were left.
        remaining: usize,
    },

    /// Schema version this build does not speak.
    #[error("unsupported schema version {0}")]
    UnsupportedSchema(u8),

    /// Unknown frame kind byte.
    #[error("unknown frame kind {0}")]
    UnknownKind(u8),

    /// Declared payload length disagrees with the bytes present.
    #[error("payload length mismatch: header says {declared}, frame holds {actual}")]
    LengthMismatch {
        /// Length in the header.
        declared: u32,
        /// Bytes actually present after the header.
        actual: usize,
    },

    /// A tag or enum byte outside its range.
    #[error("invalid value {value} for {field}")]
    InvalidValue {
        /// Field being decoded.
        field: &'static str,
        /// Offending byte.
        value: u8,
    },

    /// Payload had bytes left after the last field.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

/// Result type for wire decoding.
pub type WireResult<T> = Result<T, WireError>;

/// Replication failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    /// The hub was shut down.
    #[error("replication hub is closed")]
    HubClosed,

    /// A second authority handle was requested.
    #[error("replication hub already has an authority")]
    AuthorityTaken,

    /// Operation on an object that was never registered or was retired.
    #[error("unknown network object {0}")]
    UnknownObject(NetObjectId),

    /// Wire failure.
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;
