//! # Navigation
//!
//! The [`NavOracle`] seam, the valid-node search built on it, and a
//! reference oracle.

mod field;
mod oracle;
mod search;

pub use field::{Aabb, ObstacleField};
pub use oracle::{NavOracle, NavPath, PathStatus};
pub use search::{classify_path, find_node, PathValidity, SearchMode, SearchOutcome, SearchParams};
