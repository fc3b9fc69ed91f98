//! Actor lookups. Agents only ever hold an [`ActorId`]; whether that actor
//! still exists, and where it is, is asked here.

use parking_lot::RwLock;
use shisha_shared::{ActorId, Vec3};
use std::collections::BTreeMap;

/// Resolves actor references and answers visibility questions.
pub trait ActorDirectory {
    /// Current position, or `None` when the actor is gone.
    fn position(&self, actor: ActorId) -> Option<Vec3>;

    /// True when some actor can currently see `point`.
    fn is_visible(&self, point: Vec3) -> bool;
}

/// Thread-safe actor positions with a fixed sight range.
pub struct ActorRoster {
    sight_range: f32,
    actors: RwLock<BTreeMap<ActorId, Vec3>>,
}

impl ActorRoster {
    /// Empty roster.
    #[must_use]
    pub fn new(sight_range: f32) -> Self {
        Self {
            sight_range,
            actors: RwLock::new(BTreeMap::new()),
        }
    }

    /// Adds or moves an actor.
    pub fn upsert(&self, actor: ActorId, position: Vec3) {
        self.actors.write().insert(actor, position);
    }

    /// Removes an actor. Returns whether it was present.
    pub fn remove(&self, actor: ActorId) -> bool {
        self.actors.write().remove(&actor).is_some()
    }

    /// Actor count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.read().len()
    }

    /// True with no actors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.read().is_empty()
    }
}

impl ActorDirectory for ActorRoster {
    fn position(&self, actor: ActorId) -> Option<Vec3> {
        self.actors.read().get(&actor).copied()
    }

    fn is_visible(&self, point: Vec3) -> bool {
        let range_sq = self.sight_range * self.sight_range;
        self.actors
            .read()
            .values()
            .any(|p| p.distance_squared(point) <= range_sq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_resolves_and_forgets() {
        let roster = ActorRoster::new(10.0);
        roster.upsert(ActorId(1), Vec3::new(3.0, 0.0, 4.0));
        assert_eq!(roster.position(ActorId(1)), Some(Vec3::new(3.0, 0.0, 4.0)));
        assert_eq!(roster.position(ActorId(2)), None);

        assert!(roster.remove(ActorId(1)));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_visibility_uses_sight_range() {
        let roster = ActorRoster::new(10.0);
        roster.upsert(ActorId(1), Vec3::ZERO);
        assert!(roster.is_visible(Vec3::new(6.0, 0.0, 8.0)));
        assert!(!roster.is_visible(Vec3::new(6.0, 0.0, 8.1)));
    }
}
