//! # Follower
//!
//! Presentation side of a replicated agent. Followers reflect what the
//! authority replicated and never evaluate behaviour themselves.

mod presenter;
mod session;
mod sink;

pub use presenter::{
    FollowerPresenter, MAX_RUN_ANIMATION_MULTIPLIER, MAX_WALK_ANIMATION_MULTIPLIER,
    RUN_ANIMATION_DIVISOR, SPEED_SMOOTHING,
};
pub use session::{FollowerSession, PumpStats};
pub use sink::{AudioSource, LootParent, PresentationSink, RecordingSink, SinkCall};
