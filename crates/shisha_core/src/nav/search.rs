//! # Valid-Node Search
//!
//! Picks a navigation target out of a candidate node set.
//!
//! ```text
//! candidates ──drop within buffer──> sort by distance ──classify each──> first Valid
//!                                                          │
//!                                   first non-Invalid is obstructed + fallback allowed
//!                                                          │
//!                                          rescan from there without linecasts
//!                                          (result reported ValidButObstructed)
//! ```

use super::oracle::NavOracle;
use crate::error::{NavError, NavResult};
use shisha_shared::Vec3;

/// Classification of one candidate path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathValidity {
    /// No path, or the path does not reach the candidate.
    Invalid,
    /// Reachable, but the path end strays from the candidate or a segment
    /// crosses the obstruction layer.
    ValidButObstructed,
    /// Reachable and clear.
    Valid,
}

/// Ordering of candidates relative to the reference position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Nearest first.
    Closest,
    /// Farthest first.
    Farthest,
}

/// Search tunables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchParams {
    /// Candidates closer than this to the reference are dropped.
    pub buffer_distance: f32,
    /// Maximum allowed gap between path end and candidate.
    pub deviation_tolerance: f32,
    /// Retry without line-of-sight checks when the first reachable
    /// candidate is obstructed.
    pub allow_obstructed_fallback: bool,
}

impl SearchParams {
    /// Parameters used when fleeing from an aggressor.
    pub const FLEE: Self = Self {
        buffer_distance: 5.0,
        deviation_tolerance: 1.5,
        allow_obstructed_fallback: true,
    };

    /// Rejects negative or NaN distances.
    ///
    /// # Errors
    ///
    /// [`NavError::InvalidParam`] naming the offending field.
    pub fn validate(&self) -> NavResult<()> {
        for (name, value) in [
            ("buffer_distance", self.buffer_distance),
            ("deviation_tolerance", self.deviation_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(NavError::InvalidParam { name, value });
            }
        }
        Ok(())
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::FLEE
    }
}

/// Outcome of [`find_node`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchOutcome {
    /// Overall classification.
    pub validity: PathValidity,
    /// Chosen node, `None` exactly when `validity` is `Invalid`.
    pub node: Option<Vec3>,
}

impl SearchOutcome {
    /// Nothing usable.
    pub const INVALID: Self = Self {
        validity: PathValidity::Invalid,
        node: None,
    };

    /// True unless the search came back empty.
    #[inline]
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.node.is_some()
    }
}

/// Classifies the path from `from` to `candidate`.
pub fn classify_path<O: NavOracle + ?Sized>(
    oracle: &O,
    from: Vec3,
    candidate: Vec3,
    deviation_tolerance: f32,
    check_line_of_sight: bool,
) -> PathValidity {
    let Some(path) = oracle.compute_path(from, candidate) else {
        return PathValidity::Invalid;
    };
    if !path.is_complete() {
        return PathValidity::Invalid;
    }
    let Some(end) = path.end() else {
        return PathValidity::Invalid;
    };

    if end.distance(candidate) > deviation_tolerance {
        return PathValidity::ValidButObstructed;
    }
    if check_line_of_sight && path.segments().any(|(a, b)| oracle.linecast_blocked(a, b)) {
        return PathValidity::ValidButObstructed;
    }
    PathValidity::Valid
}

/// Finds the closest or farthest usable node relative to `reference`.
///
/// Paths are computed from `agent_position`. See the module docs for the
/// fallback rule.
///
/// # Errors
///
/// Invalid `params`, or a non-finite agent/reference position. Non-finite
/// candidates are skipped.
pub fn find_node<O: NavOracle + ?Sized>(
    oracle: &O,
    agent_position: Vec3,
    reference: Vec3,
    candidates: &[Vec3],
    mode: SearchMode,
    params: &SearchParams,
) -> NavResult<SearchOutcome> {
    params.validate()?;
    if !agent_position.is_finite() || !reference.is_finite() {
        return Err(NavError::NonFinitePosition);
    }

    let buffer_sq = params.buffer_distance * params.buffer_distance;
    let mut ordered: Vec<(f32, Vec3)> = candidates
        .iter()
        .copied()
        .filter(|node| node.is_finite())
        .map(|node| (node.distance_squared(reference), node))
        .filter(|(dist_sq, _)| *dist_sq >= buffer_sq)
        .collect();

    // Stable sort keeps caller order among equidistant nodes.
    match mode {
        SearchMode::Closest => ordered.sort_by(|a, b| a.0.total_cmp(&b.0)),
        SearchMode::Farthest => ordered.sort_by(|a, b| b.0.total_cmp(&a.0)),
    }

    let mut first_obstructed = None;
    for (index, &(_, node)) in ordered.iter().enumerate() {
        match classify_path(oracle, agent_position, node, params.deviation_tolerance, true) {
            PathValidity::Valid => {
                return Ok(SearchOutcome {
                    validity: PathValidity::Valid,
                    node: Some(node),
                });
            }
            PathValidity::ValidButObstructed => {
                if params.allow_obstructed_fallback {
                    first_obstructed = Some(index);
                    break;
                }
            }
            PathValidity::Invalid => {}
        }
    }

    if let Some(start) = first_obstructed {
        tracing::debug!(
            "first reachable node obstructed, rescanning {} candidates without linecasts",
            ordered.len() - start
        );
        for &(_, node) in &ordered[start..] {
            let validity =
                classify_path(oracle, agent_position, node, params.deviation_tolerance, false);
            if validity == PathValidity::Valid {
                return Ok(SearchOutcome {
                    validity: PathValidity::ValidButObstructed,
                    node: Some(node),
                });
            }
        }
    }

    Ok(SearchOutcome::INVALID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::oracle::{NavPath, PathStatus};

    #[derive(Clone, Copy)]
    enum Reply {
        Clear,
        Blocked,
        Partial,
        None,
        Strays,
    }

    /// Oracle with a canned reply per candidate x coordinate.
    struct Scripted {
        replies: Vec<(f32, Reply)>,
    }

    impl Scripted {
        fn reply(&self, to: Vec3) -> Reply {
            self.replies
                .iter()
                .find(|(x, _)| (*x - to.x).abs() < 1e-3)
                .map_or(Reply::None, |(_, r)| *r)
        }
    }

    impl NavOracle for Scripted {
        fn compute_path(&self, from: Vec3, to: Vec3) -> Option<NavPath> {
            match self.reply(to) {
                Reply::Clear | Reply::Blocked => Some(NavPath::straight(from, to)),
                Reply::Partial => Some(NavPath::new(vec![from, to], PathStatus::Partial)),
                Reply::Strays => Some(NavPath::straight(from, to + Vec3::new(0.0, 0.0, 10.0))),
                Reply::None => None,
            }
        }

        fn linecast_blocked(&self, _from: Vec3, to: Vec3) -> bool {
            matches!(self.reply(to), Reply::Blocked)
        }

        fn nearest_navigable(&self, point: Vec3, _max_distance: f32) -> Option<Vec3> {
            Some(point)
        }
    }

    fn nodes(xs: &[f32]) -> Vec<Vec3> {
        xs.iter().map(|&x| Vec3::new(x, 0.0, 0.0)).collect()
    }

    fn params(fallback: bool) -> SearchParams {
        SearchParams {
            buffer_distance: 2.0,
            deviation_tolerance: 1.0,
            allow_obstructed_fallback: fallback,
        }
    }

    #[test]
    fn test_farthest_valid_wins() {
        let oracle = Scripted {
            replies: vec![(10.0, Reply::Clear), (20.0, Reply::Clear), (30.0, Reply::None)],
        };
        let out = find_node(
            &oracle,
            Vec3::ZERO,
            Vec3::ZERO,
            &nodes(&[10.0, 20.0, 30.0]),
            SearchMode::Farthest,
            &params(true),
        )
        .unwrap();

        assert_eq!(out.validity, PathValidity::Valid);
        assert_eq!(out.node, Some(Vec3::new(20.0, 0.0, 0.0)));
    }

    #[test]
    fn test_closest_skips_buffer_and_partial() {
        let oracle = Scripted {
            replies: vec![(1.0, Reply::Clear), (5.0, Reply::Partial), (8.0, Reply::Clear)],
        };
        let out = find_node(
            &oracle,
            Vec3::ZERO,
            Vec3::ZERO,
            &nodes(&[8.0, 1.0, 5.0]),
            SearchMode::Closest,
            &params(true),
        )
        .unwrap();

        assert_eq!(out.node, Some(Vec3::new(8.0, 0.0, 0.0)));
    }

    #[test]
    fn test_obstructed_fallback_reports_obstructed() {
        let oracle = Scripted {
            replies: vec![(30.0, Reply::Blocked), (20.0, Reply::Strays), (10.0, Reply::Clear)],
        };
        let out = find_node(
            &oracle,
            Vec3::ZERO,
            Vec3::ZERO,
            &nodes(&[10.0, 20.0, 30.0]),
            SearchMode::Farthest,
            &params(true),
        )
        .unwrap();

        // Node 30 becomes Valid once linecasts are off.
        assert_eq!(out.validity, PathValidity::ValidButObstructed);
        assert_eq!(out.node, Some(Vec3::new(30.0, 0.0, 0.0)));
    }

    #[test]
    fn test_without_fallback_obstructed_nodes_are_skipped() {
        let oracle = Scripted {
            replies: vec![(30.0, Reply::Blocked), (20.0, Reply::Strays), (10.0, Reply::Clear)],
        };
        let out = find_node(
            &oracle,
            Vec3::ZERO,
            Vec3::ZERO,
            &nodes(&[10.0, 20.0, 30.0]),
            SearchMode::Farthest,
            &params(false),
        )
        .unwrap();

        assert_eq!(out.validity, PathValidity::Valid);
        assert_eq!(out.node, Some(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_fallback_still_rejects_deviating_paths() {
        let oracle = Scripted {
            replies: vec![(20.0, Reply::Strays), (10.0, Reply::Partial)],
        };
        let out = find_node(
            &oracle,
            Vec3::ZERO,
            Vec3::ZERO,
            &nodes(&[10.0, 20.0]),
            SearchMode::Farthest,
            &params(true),
        )
        .unwrap();

        assert_eq!(out, SearchOutcome::INVALID);
    }

    #[test]
    fn test_empty_candidates_is_invalid_not_error() {
        let oracle = Scripted { replies: vec![] };
        let out = find_node(
            &oracle,
            Vec3::ZERO,
            Vec3::ZERO,
            &[],
            SearchMode::Closest,
            &params(true),
        )
        .unwrap();
        assert!(!out.is_usable());
    }

    #[test]
    fn test_negative_buffer_rejected() {
        let oracle = Scripted { replies: vec![] };
        let bad = SearchParams {
            buffer_distance: -1.0,
            ..params(true)
        };
        let err = find_node(&oracle, Vec3::ZERO, Vec3::ZERO, &[], SearchMode::Closest, &bad);
        assert!(matches!(err, Err(NavError::InvalidParam { name: "buffer_distance", .. })));
    }
}
