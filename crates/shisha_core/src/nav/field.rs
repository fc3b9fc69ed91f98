//! Reference oracle: a rectangular walkable area with box obstacles.
//!
//! All queries work in the horizontal (x, z) plane. Paths are straight
//! lines; a blocking box on the way yields a partial path that stops in
//! front of it. Obstruction boxes only affect linecasts.

use super::oracle::{NavOracle, NavPath, PathStatus};
use shisha_shared::Vec3;

/// Axis-aligned box, tested on x and z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from any two opposite corners.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Square of half-extent `half` centred on `center`.
    #[must_use]
    pub fn around(center: Vec3, half: f32) -> Self {
        let h = Vec3::new(half, half, half);
        Self::new(center - h, center + h)
    }

    /// Containment on x/z.
    #[must_use]
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.z && p.z <= self.max.z
    }

    /// Clamps `p` into the box on x/z.
    #[must_use]
    pub fn clamp(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y,
            p.z.clamp(self.min.z, self.max.z),
        )
    }

    /// Entry parameter `t` in `[0, 1]` where segment `a -> b` first
    /// touches the box, if it does.
    #[must_use]
    pub fn segment_entry(&self, a: Vec3, b: Vec3) -> Option<f32> {
        let d = b - a;
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;

        for (origin, dir, lo, hi) in [
            (a.x, d.x, self.min.x, self.max.x),
            (a.z, d.z, self.min.z, self.max.z),
        ] {
            if dir.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
            } else {
                let inv = 1.0 / dir;
                let mut t0 = (lo - origin) * inv;
                let mut t1 = (hi - origin) * inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_min = t_min.max(t0);
                t_max = t_max.min(t1);
                if t_min > t_max {
                    return None;
                }
            }
        }
        Some(t_min)
    }

    /// Point just outside the nearest face, on x/z.
    fn push_out(&self, p: Vec3, margin: f32) -> Vec3 {
        let candidates = [
            (p.x - self.min.x, Vec3::new(self.min.x - margin, p.y, p.z)),
            (self.max.x - p.x, Vec3::new(self.max.x + margin, p.y, p.z)),
            (p.z - self.min.z, Vec3::new(p.x, p.y, self.min.z - margin)),
            (self.max.z - p.z, Vec3::new(p.x, p.y, self.max.z + margin)),
        ];
        candidates
            .iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(p, |(_, out)| *out)
    }
}

/// Walkable rectangle with blocking and obstruction boxes.
#[derive(Clone, Debug)]
pub struct ObstacleField {
    bounds: Aabb,
    blocking: Vec<Aabb>,
    obstructions: Vec<Aabb>,
}

impl ObstacleField {
    /// Gap kept between a partial path end and the obstacle it stopped at.
    const STANDOFF: f32 = 0.05;

    /// Open field covering `bounds`.
    #[must_use]
    pub fn new(bounds: Aabb) -> Self {
        Self {
            bounds,
            blocking: Vec::new(),
            obstructions: Vec::new(),
        }
    }

    /// Adds a non-walkable box.
    #[must_use]
    pub fn with_blocking(mut self, area: Aabb) -> Self {
        self.blocking.push(area);
        self
    }

    /// Adds a box on the line-of-sight layer only.
    #[must_use]
    pub fn with_obstruction(mut self, area: Aabb) -> Self {
        self.obstructions.push(area);
        self
    }

    /// Walkable area.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Inside bounds and outside every blocking box.
    #[must_use]
    pub fn is_walkable(&self, p: Vec3) -> bool {
        self.bounds.contains(p) && !self.blocking.iter().any(|b| b.contains(p))
    }

    /// Walkable lattice points, usable as a candidate node set.
    #[must_use]
    pub fn grid_nodes(&self, spacing: f32) -> Vec<Vec3> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Vec::new();
        }
        let mut nodes = Vec::new();
        let mut x = self.bounds.min.x;
        while x <= self.bounds.max.x {
            let mut z = self.bounds.min.z;
            while z <= self.bounds.max.z {
                let p = Vec3::new(x, self.bounds.min.y, z);
                if self.is_walkable(p) {
                    nodes.push(p);
                }
                z += spacing;
            }
            x += spacing;
        }
        nodes
    }
}

impl NavOracle for ObstacleField {
    fn compute_path(&self, from: Vec3, to: Vec3) -> Option<NavPath> {
        if !self.is_walkable(from) || !self.is_walkable(to) {
            return None;
        }

        let first_hit = self
            .blocking
            .iter()
            .filter_map(|b| b.segment_entry(from, to))
            .min_by(f32::total_cmp);

        match first_hit {
            Some(t) => {
                let length = from.distance(to).max(f32::EPSILON);
                let stop_t = (t - Self::STANDOFF / length).max(0.0);
                let stop = from + (to - from) * stop_t;
                Some(NavPath::new(vec![from, stop], PathStatus::Partial))
            }
            None => Some(NavPath::straight(from, to)),
        }
    }

    fn linecast_blocked(&self, from: Vec3, to: Vec3) -> bool {
        self.obstructions
            .iter()
            .any(|b| b.segment_entry(from, to).is_some())
    }

    fn nearest_navigable(&self, point: Vec3, max_distance: f32) -> Option<Vec3> {
        let mut candidate = self.bounds.clamp(point);
        if let Some(area) = self.blocking.iter().find(|b| b.contains(candidate)) {
            candidate = self.bounds.clamp(area.push_out(candidate, Self::STANDOFF));
        }
        (self.is_walkable(candidate) && candidate.distance(point) <= max_distance)
            .then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> ObstacleField {
        ObstacleField::new(Aabb::new(Vec3::new(-50.0, 0.0, -50.0), Vec3::new(50.0, 0.0, 50.0)))
            .with_blocking(Aabb::new(Vec3::new(10.0, 0.0, -5.0), Vec3::new(12.0, 0.0, 5.0)))
            .with_obstruction(Aabb::new(Vec3::new(-12.0, 0.0, -5.0), Vec3::new(-10.0, 0.0, 5.0)))
    }

    #[test]
    fn test_open_path_is_complete() {
        let path = field()
            .compute_path(Vec3::ZERO, Vec3::new(0.0, 0.0, 20.0))
            .unwrap();
        assert!(path.is_complete());
        assert_eq!(path.end(), Some(Vec3::new(0.0, 0.0, 20.0)));
    }

    #[test]
    fn test_blocking_box_yields_partial_path() {
        let path = field()
            .compute_path(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(path.status, PathStatus::Partial);
        assert!(path.end().unwrap().x < 10.0);
    }

    #[test]
    fn test_outside_bounds_has_no_path() {
        assert!(field()
            .compute_path(Vec3::ZERO, Vec3::new(80.0, 0.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_obstruction_only_affects_linecast() {
        let f = field();
        let target = Vec3::new(-20.0, 0.0, 0.0);
        assert!(f.compute_path(Vec3::ZERO, target).unwrap().is_complete());
        assert!(f.linecast_blocked(Vec3::ZERO, target));
        assert!(!f.linecast_blocked(Vec3::ZERO, Vec3::new(0.0, 0.0, -20.0)));
    }

    #[test]
    fn test_nearest_navigable_pushes_out_of_blocks() {
        let f = field();
        let inside = Vec3::new(10.5, 0.0, 0.0);
        let p = f.nearest_navigable(inside, 2.0).unwrap();
        assert!(f.is_walkable(p));
        assert!(f.nearest_navigable(Vec3::new(90.0, 0.0, 0.0), 5.0).is_none());
    }

    #[test]
    fn test_grid_nodes_skip_blocked_cells() {
        let nodes = field().grid_nodes(5.0);
        assert!(!nodes.is_empty());
        assert!(nodes.iter().all(|n| field().is_walkable(*n)));
    }
}
