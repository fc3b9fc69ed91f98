//! # Follower Session
//!
//! One follower's view of the authority: decodes frames from its
//! [`FollowerLink`], keeps a version-gated mirror per network object and
//! routes everything to the presenter bound to that object.
//!
//! ```text
//! FollowerLink ──frames──> decode ──┬── Variable(Agent) ──> mirror ──> presenter
//!                                   ├── Variable(Loot)  ──> loot mirror ──> owner presenter
//!                                   │     (LootOwner attaches, LootAttached=false releases)
//!                                   ├── Event           ──> presenter
//!                                   └── Retire          ──> drop views
//! ```

use super::presenter::FollowerPresenter;
use super::sink::PresentationSink;
use crate::authority::ActorDirectory;
use crate::config::ConfigSnapshot;
use shisha_networking::{
    AgentEvent, FollowerId, FollowerLink, Message, PersistedValue, ReplicationHub,
    ReplicationResult, Scope, Upstream, VariableMirror,
};
use shisha_shared::{AgentId, LootId, NetObjectId, Vec3};
use std::collections::BTreeMap;
use std::sync::Arc;

struct AgentView<S> {
    mirror: VariableMirror,
    presenter: FollowerPresenter,
    sink: S,
}

/// Per-pump counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Messages decoded.
    pub messages: usize,
    /// Frames that failed to decode.
    pub malformed: usize,
    /// Variable updates dropped as stale.
    pub stale: usize,
}

/// Follower side of the replication channel.
pub struct FollowerSession<S: PresentationSink + Default> {
    link: FollowerLink,
    config: ConfigSnapshot,
    directory: Arc<dyn ActorDirectory + Send + Sync>,
    seed: u64,
    agents: BTreeMap<NetObjectId, AgentView<S>>,
    loot: BTreeMap<NetObjectId, VariableMirror>,
    loot_owners: BTreeMap<LootId, NetObjectId>,
}

impl<S: PresentationSink + Default> FollowerSession<S> {
    /// Joins `hub` and asks for the current persisted values.
    ///
    /// # Errors
    ///
    /// Closed hub.
    pub fn join(
        hub: &ReplicationHub,
        config: &ConfigSnapshot,
        directory: Arc<dyn ActorDirectory + Send + Sync>,
        seed: u64,
    ) -> ReplicationResult<Self> {
        let link = hub.join()?;
        let resynced = link.request_resync()?;
        tracing::info!("follower {:?} joined, {} values resynced", link.id(), resynced);
        Ok(Self {
            link,
            config: config.clone(),
            directory,
            seed,
            agents: BTreeMap::new(),
            loot: BTreeMap::new(),
            loot_owners: BTreeMap::new(),
        })
    }

    /// Link id.
    #[must_use]
    pub const fn id(&self) -> FollowerId {
        self.link.id()
    }

    /// Applies everything queued on the link.
    pub fn pump(&mut self) -> PumpStats {
        let mut stats = PumpStats::default();
        for decoded in self.link.receive() {
            match decoded {
                Ok(message) => {
                    stats.messages += 1;
                    if !self.route(message) {
                        stats.stale += 1;
                    }
                }
                Err(err) => {
                    stats.malformed += 1;
                    tracing::warn!("follower {:?} dropped malformed frame: {}", self.link.id(), err);
                }
            }
        }
        stats
    }

    fn route(&mut self, message: Message) -> bool {
        match message {
            Message::Variable {
                object,
                scope: Scope::Agent(agent),
                version,
                value,
            } => {
                let directory = Arc::clone(&self.directory);
                let view = self.view(object);
                if view.presenter.identity().is_some_and(|own| own != agent) {
                    tracing::debug!("{} ignored variable for foreign agent {}", object, agent);
                    return true;
                }
                let Some(change) = view.mirror.apply(version, value) else {
                    return false;
                };
                view.presenter
                    .on_variable(agent, change, &*directory, &mut view.sink);
                true
            }
            Message::Variable {
                object,
                scope: Scope::Loot(loot),
                version,
                value,
            } => {
                let mirror = self.loot.entry(object).or_default();
                let Some(change) = mirror.apply(version, value) else {
                    return false;
                };
                match change.current {
                    PersistedValue::LootOwner(Some(owner)) => self.attach_loot(loot, owner),
                    PersistedValue::LootAttached(false) => self.release_loot(loot),
                    PersistedValue::LootOwner(None) => {
                        self.release_loot(loot);
                        self.loot_owners.remove(&loot);
                    }
                    _ => {}
                }
                true
            }
            Message::Event {
                object,
                agent,
                event,
            } => {
                if let AgentEvent::LootSpawned { loot, .. } = event {
                    self.loot_owners.insert(loot, object);
                }
                let view = self.view(object);
                view.presenter.on_event(agent, event, &mut view.sink);
                true
            }
            Message::Retire { object } => {
                if self.agents.remove(&object).is_some() {
                    tracing::debug!("follower {:?} retired agent object {}", self.link.id(), object);
                }
                self.loot.remove(&object);
                self.loot_owners.retain(|_, owner| *owner != object);
                true
            }
            Message::Request { object, .. } => {
                tracing::debug!("follower ignored request echo on {}", object);
                true
            }
        }
    }

    fn view(&mut self, object: NetObjectId) -> &mut AgentView<S> {
        let config = &self.config;
        let seed = self.seed;
        self.agents.entry(object).or_insert_with(|| AgentView {
            mirror: VariableMirror::new(),
            presenter: FollowerPresenter::new(object, config, seed),
            sink: S::default(),
        })
    }

    fn attach_loot(&mut self, loot: LootId, owner: NetObjectId) {
        self.loot_owners.insert(loot, owner);
        if let Some(view) = self.agents.get_mut(&owner) {
            view.presenter.attach_loot(loot, &mut view.sink);
        }
    }

    fn release_loot(&mut self, loot: LootId) {
        let Some(owner) = self.loot_owners.get(&loot) else {
            return;
        };
        if let Some(view) = self.agents.get_mut(owner) {
            view.presenter.release_loot(loot, &mut view.sink);
        }
    }

    // =========================================================================
    // Local actions
    // =========================================================================

    /// Asks the authority to detach `loot` because this follower grabbed
    /// it. `Ok(false)` when the loot object is unknown here.
    ///
    /// # Errors
    ///
    /// Closed hub.
    pub fn grab_loot(&self, loot: LootId) -> ReplicationResult<bool> {
        let Some(object) = self
            .loot
            .iter()
            .find(|(_, mirror)| mirror.loot_identity() == Some(loot))
            .map(|(object, _)| *object)
        else {
            return Ok(false);
        };
        self.link.send_request(object, Upstream::DetachLoot { loot })?;
        tracing::debug!("follower {:?} grabbed loot {}", self.link.id(), loot);
        Ok(true)
    }

    /// Per-frame presentation update for one agent object.
    pub fn update(&mut self, object: NetObjectId, position: Vec3, dt: f32) -> bool {
        let Some(view) = self.agents.get_mut(&object) else {
            return false;
        };
        view.presenter.update(position, dt, &mut view.sink);
        true
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Presenter bound to `object`.
    #[must_use]
    pub fn presenter(&self, object: NetObjectId) -> Option<&FollowerPresenter> {
        self.agents.get(&object).map(|view| &view.presenter)
    }

    /// Presenter that adopted `agent`.
    #[must_use]
    pub fn presenter_for(&self, agent: AgentId) -> Option<&FollowerPresenter> {
        self.agents
            .values()
            .map(|view| &view.presenter)
            .find(|presenter| presenter.identity() == Some(agent))
    }

    /// Mirror of an agent object.
    #[must_use]
    pub fn mirror(&self, object: NetObjectId) -> Option<&VariableMirror> {
        self.agents.get(&object).map(|view| &view.mirror)
    }

    /// Mirror of a loot object.
    #[must_use]
    pub fn loot_mirror(&self, object: NetObjectId) -> Option<&VariableMirror> {
        self.loot.get(&object)
    }

    /// Sink of an agent object.
    #[must_use]
    pub fn sink(&self, object: NetObjectId) -> Option<&S> {
        self.agents.get(&object).map(|view| &view.sink)
    }

    /// Mutable sink of an agent object.
    pub fn sink_mut(&mut self, object: NetObjectId) -> Option<&mut S> {
        self.agents.get_mut(&object).map(|view| &mut view.sink)
    }

    /// Agent objects known to this follower.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Loot objects known to this follower.
    #[must_use]
    pub fn loot_count(&self) -> usize {
        self.loot.len()
    }
}
