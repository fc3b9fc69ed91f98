//! Navigation queries consumed from the outside world.

use shisha_shared::Vec3;
use std::sync::Arc;

/// Whether a computed path actually reaches its goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStatus {
    /// The path ends at the requested goal (or the closest point the
    /// backend snapped it to).
    Complete,
    /// The backend gave up part way.
    Partial,
}

/// A computed path as a list of corner points.
#[derive(Clone, Debug, PartialEq)]
pub struct NavPath {
    /// Corner points, starting at the query origin.
    pub corners: Vec<Vec3>,
    /// Completeness reported by the backend.
    pub status: PathStatus,
}

impl NavPath {
    /// Creates a path.
    #[must_use]
    pub fn new(corners: Vec<Vec3>, status: PathStatus) -> Self {
        Self { corners, status }
    }

    /// Straight two-point complete path.
    #[must_use]
    pub fn straight(from: Vec3, to: Vec3) -> Self {
        Self::new(vec![from, to], PathStatus::Complete)
    }

    /// True when the backend reported a complete path.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == PathStatus::Complete
    }

    /// Last corner.
    #[must_use]
    pub fn end(&self) -> Option<Vec3> {
        self.corners.last().copied()
    }

    /// Consecutive corner pairs.
    pub fn segments(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        self.corners.windows(2).map(|w| (w[0], w[1]))
    }

    /// Summed segment length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.segments().map(|(a, b)| a.distance(b)).sum()
    }
}

/// Navigation backend.
///
/// Implementations are read-only from the authority's point of view; the
/// authority queries them single-threaded.
pub trait NavOracle {
    /// Computes a path between two positions. `None` means no path at all.
    fn compute_path(&self, from: Vec3, to: Vec3) -> Option<NavPath>;

    /// True when the segment hits the designated obstruction layer.
    fn linecast_blocked(&self, from: Vec3, to: Vec3) -> bool;

    /// Nearest navigable point to `point`, no farther than `max_distance`.
    fn nearest_navigable(&self, point: Vec3, max_distance: f32) -> Option<Vec3>;
}

impl<T: NavOracle + ?Sized> NavOracle for Arc<T> {
    fn compute_path(&self, from: Vec3, to: Vec3) -> Option<NavPath> {
        (**self).compute_path(from, to)
    }

    fn linecast_blocked(&self, from: Vec3, to: Vec3) -> bool {
        (**self).linecast_blocked(from, to)
    }

    fn nearest_navigable(&self, point: Vec3, max_distance: f32) -> Option<Vec3> {
        (**self).nearest_navigable(point, max_distance)
    }
}
