//! # Navigation Handle
//!
//! The agent's mover. In an engine this wraps the navmesh agent; here
//! [`SimulatedNavAgent`] follows oracle paths corner to corner so headless
//! runs and tests behave the same way.

use shisha_core::NavOracle;
use shisha_shared::Vec3;
use std::collections::VecDeque;
use std::sync::Arc;

/// What the behaviour machine may ask of a mover.
pub trait NavigationHandle {
    /// Current position.
    fn position(&self) -> Vec3;

    /// Teleports without pathing. Clears the destination.
    fn warp(&mut self, position: Vec3);

    /// Starts moving towards `destination`. Returns `false` when no path
    /// exists; the previous route is dropped either way.
    fn set_destination(&mut self, destination: Vec3) -> bool;

    /// Drops the current route.
    fn stop(&mut self);

    /// True while a route is being followed.
    fn has_destination(&self) -> bool;

    /// Speed cap.
    fn speed(&self) -> f32;

    /// Sets the speed cap.
    fn set_speed(&mut self, speed: f32);

    /// Acceleration cap.
    fn acceleration(&self) -> f32;

    /// Sets the acceleration cap.
    fn set_acceleration(&mut self, acceleration: f32);

    /// Enables or disables movement entirely.
    fn set_enabled(&mut self, enabled: bool);

    /// True while movement is enabled.
    fn is_enabled(&self) -> bool;

    /// Advances movement by `dt` seconds.
    fn step(&mut self, dt: f32);
}

/// Oracle-driven mover with linear acceleration.
pub struct SimulatedNavAgent {
    oracle: Arc<dyn NavOracle + Send + Sync>,
    position: Vec3,
    route: VecDeque<Vec3>,
    speed: f32,
    acceleration: f32,
    velocity: f32,
    enabled: bool,
}

impl SimulatedNavAgent {
    /// Corner reach distance.
    const CORNER_EPSILON: f32 = 0.01;

    /// Mover standing at `position`.
    #[must_use]
    pub fn new(oracle: Arc<dyn NavOracle + Send + Sync>, position: Vec3) -> Self {
        Self {
            oracle,
            position,
            route: VecDeque::new(),
            speed: 0.0,
            acceleration: 0.0,
            velocity: 0.0,
            enabled: true,
        }
    }

    /// Current scalar velocity.
    #[must_use]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }
}

impl NavigationHandle for SimulatedNavAgent {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn warp(&mut self, position: Vec3) {
        self.position = position;
        self.route.clear();
        self.velocity = 0.0;
    }

    fn set_destination(&mut self, destination: Vec3) -> bool {
        self.route.clear();
        let Some(path) = self.oracle.compute_path(self.position, destination) else {
            return false;
        };
        // First corner is the start point.
        self.route.extend(path.corners.iter().skip(1).copied());
        !self.route.is_empty()
    }

    fn stop(&mut self) {
        self.route.clear();
        self.velocity = 0.0;
    }

    fn has_destination(&self) -> bool {
        !self.route.is_empty()
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    fn acceleration(&self) -> f32 {
        self.acceleration
    }

    fn set_acceleration(&mut self, acceleration: f32) {
        self.acceleration = acceleration.max(0.0);
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.stop();
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn step(&mut self, dt: f32) {
        if !self.enabled || dt <= 0.0 {
            return;
        }
        let target_velocity = if self.route.is_empty() { 0.0 } else { self.speed };
        let delta = self.acceleration * dt;
        self.velocity = if self.velocity < target_velocity {
            (self.velocity + delta).min(target_velocity)
        } else {
            (self.velocity - delta).max(target_velocity)
        };

        let mut budget = self.velocity * dt;
        while budget > 0.0 {
            let Some(&corner) = self.route.front() else {
                break;
            };
            let gap = self.position.distance(corner);
            if gap <= budget + Self::CORNER_EPSILON {
                self.position = corner;
                budget -= gap;
                self.route.pop_front();
            } else {
                self.position = self.position.move_towards(corner, budget);
                budget = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shisha_core::{Aabb, ObstacleField};

    fn mover() -> SimulatedNavAgent {
        let field = ObstacleField::new(Aabb::new(
            Vec3::new(-50.0, 0.0, -50.0),
            Vec3::new(50.0, 0.0, 50.0),
        ));
        SimulatedNavAgent::new(Arc::new(field), Vec3::ZERO)
    }

    #[test]
    fn test_accelerates_then_arrives() {
        let mut nav = mover();
        nav.set_speed(4.0);
        nav.set_acceleration(8.0);
        assert!(nav.set_destination(Vec3::new(10.0, 0.0, 0.0)));

        nav.step(0.25);
        assert!((nav.velocity() - 2.0).abs() < 1e-5);
        assert!((nav.position().x - 0.5).abs() < 1e-5);

        for _ in 0..40 {
            nav.step(0.25);
        }
        assert_eq!(nav.position(), Vec3::new(10.0, 0.0, 0.0));
        assert!(!nav.has_destination());
    }

    #[test]
    fn test_outside_destination_has_no_route() {
        let mut nav = mover();
        assert!(!nav.set_destination(Vec3::new(500.0, 0.0, 0.0)));
        assert!(!nav.has_destination());
    }

    #[test]
    fn test_disabled_mover_stays_put() {
        let mut nav = mover();
        nav.set_speed(4.0);
        nav.set_acceleration(100.0);
        nav.set_destination(Vec3::new(10.0, 0.0, 0.0));
        nav.set_enabled(false);
        nav.step(1.0);
        assert_eq!(nav.position(), Vec3::ZERO);
    }
}
