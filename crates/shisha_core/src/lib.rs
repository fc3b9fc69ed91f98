//! # SHISHA Core
//!
//! Navigation queries and simulation-time scheduling for the authority.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    find_node()    ┌──────────────┐
//! │  Behaviour   │──────────────────>│  nav::search │
//! │  (authority) │                   └──────┬───────┘
//! └──────┬───────┘                          │ compute_path / linecast
//!        │ schedule()                ┌──────▼───────┐
//! ┌──────▼───────┐                   │  NavOracle   │ (external navmesh,
//! │ DelayedTasks │                   └──────────────┘  or ObstacleField)
//! └──────────────┘
//! ```
//!
//! Nothing here owns a navmesh. The oracle is a trait so the real engine
//! can plug in; [`nav::ObstacleField`] exists for tests and headless runs.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod nav;
pub mod schedule;

pub use error::{NavError, NavResult};
pub use nav::{
    find_node, Aabb, NavOracle, NavPath, ObstacleField, PathStatus, PathValidity, SearchMode,
    SearchOutcome, SearchParams,
};
pub use schedule::{DelayedTasks, TaskHandle};
