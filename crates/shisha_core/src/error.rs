//! # Navigation Error Types

use thiserror::Error;

/// Errors from navigation searches.
///
/// An empty or fully unreachable candidate set is not an error; it is a
/// [`crate::PathValidity::Invalid`] outcome the caller must handle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    /// A search parameter was negative or not a number.
    #[error("invalid search parameter {name}: {value}")]
    InvalidParam {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },

    /// A position handed to the search was not finite.
    #[error("non-finite position passed to navigation search")]
    NonFinitePosition,
}

/// Result type for navigation operations.
pub type NavResult<T> = Result<T, NavError>;
