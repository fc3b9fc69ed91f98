//! Follower-side read-only copy of one object's persisted variables.
//!
//! Values are applied only when their version is newer than what the
//! mirror holds, so a resync racing a live write converges either way.

use crate::protocol::{PersistedValue, VariableKey};
use shisha_shared::{AgentId, BehaviourState, LootId, NetObjectId};
use std::collections::BTreeMap;

/// A change the mirror accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MirrorChange {
    /// Value held before, if any.
    pub previous: Option<PersistedValue>,
    /// Value now held.
    pub current: PersistedValue,
}

/// Version-gated variable store.
#[derive(Clone, Debug, Default)]
pub struct VariableMirror {
    values: BTreeMap<VariableKey, (u64, PersistedValue)>,
}

impl VariableMirror {
    /// Empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `value` at `version`. Returns the change, or `None` when the
    /// mirror already holds this version or a newer one.
    pub fn apply(&mut self, version: u64, value: PersistedValue) -> Option<MirrorChange> {
        let key = value.key();
        if let Some((held, _)) = self.values.get(&key) {
            if *held >= version {
                return None;
            }
        }
        let previous = self.values.insert(key, (version, value)).map(|(_, v)| v);
        Some(MirrorChange {
            previous,
            current: value,
        })
    }

    /// Current value of a slot.
    #[must_use]
    pub fn get(&self, key: VariableKey) -> Option<PersistedValue> {
        self.values.get(&key).map(|(_, v)| *v)
    }

    /// Version of a slot.
    #[must_use]
    pub fn version(&self, key: VariableKey) -> Option<u64> {
        self.values.get(&key).map(|(v, _)| *v)
    }

    /// Mirrored agent identity.
    #[must_use]
    pub fn identity(&self) -> Option<AgentId> {
        match self.get(VariableKey::Identity) {
            Some(PersistedValue::Identity(id)) => Some(id),
            _ => None,
        }
    }

    /// Mirrored loot identity.
    #[must_use]
    pub fn loot_identity(&self) -> Option<LootId> {
        match self.get(VariableKey::LootIdentity) {
            Some(PersistedValue::LootIdentity(id)) => Some(id),
            _ => None,
        }
    }

    /// Agent object holding the mirrored loot, if any.
    #[must_use]
    pub fn loot_owner(&self) -> Option<NetObjectId> {
        match self.get(VariableKey::LootOwner) {
            Some(PersistedValue::LootOwner(owner)) => owner,
            _ => None,
        }
    }

    /// Mirrored behaviour state.
    #[must_use]
    pub fn behaviour_state(&self) -> Option<BehaviourState> {
        match self.get(VariableKey::BehaviourState) {
            Some(PersistedValue::BehaviourState(state)) => Some(state),
            _ => None,
        }
    }

    /// Number of slots held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing has been mirrored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_versions_ignored() {
        let mut mirror = VariableMirror::new();
        let idle = PersistedValue::BehaviourState(BehaviourState::Idle);
        let roaming = PersistedValue::BehaviourState(BehaviourState::Roaming);

        assert!(mirror.apply(4, idle).is_some());
        assert!(mirror.apply(3, roaming).is_none());
        assert!(mirror.apply(4, roaming).is_none());
        assert_eq!(mirror.behaviour_state(), Some(BehaviourState::Idle));
    }

    #[test]
    fn test_change_reports_previous() {
        let mut mirror = VariableMirror::new();
        mirror.apply(1, PersistedValue::Dead(false));
        let change = mirror.apply(2, PersistedValue::Dead(true)).unwrap();
        assert_eq!(change.previous, Some(PersistedValue::Dead(false)));
        assert_eq!(mirror.version(VariableKey::Dead), Some(2));
    }
}
