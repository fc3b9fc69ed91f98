//! # Agent Host
//!
//! Owns every live agent and loot object on the authority and drives them
//! once per tick.
//!
//! ## Tick Order
//!
//! ```text
//! tick(dt)
//!   1. behaviour machine per agent, then its mover
//!   2. loot late-update (attached loot follows its placeholder)
//!   3. delayed tasks (death settle, despawn, departure polls)
//!   4. upstream follower requests (loot grabs)
//! ```
//!
//! Replication failures after spawn are logged and skipped. The simulation
//! keeps running with or without followers.

use super::agent::Agent;
use super::directory::ActorDirectory;
use super::machine::{AgentCommand, BehaviourMachine, HitOutcome};
use super::navigation::{NavigationHandle, SimulatedNavAgent};
use crate::config::ConfigSnapshot;
use crate::error::SpawnError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shisha_core::{DelayedTasks, NavOracle};
use shisha_economy::{DetachCause, LootObject, RolledLoot};
use shisha_networking::{
    AgentEvent, PersistedValue, ReplicationAuthority, ReplicationError, ReplicationHub, Scope,
    Upstream,
};
use shisha_shared::{
    ActorId, AgentId, LootId, LootTier, NetObjectId, Transform, Vec3, DEATH_BURST_RADIUS,
    DEATH_DESPAWN_SECS, DEATH_SETTLE_SECS, DEPARTURE_POLL_SECS,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-spawn overrides of the config snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnParams {
    /// Starting health. Defaults to the configured value.
    pub health: Option<i32>,
    /// Killable flag. Defaults to the configured value.
    pub killable: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HostTask {
    DeathBurst(AgentId),
    Despawn(AgentId),
    DeparturePoll,
}

impl HostTask {
    fn agent(&self) -> Option<AgentId> {
        match self {
            Self::DeathBurst(id) | Self::Despawn(id) => Some(*id),
            Self::DeparturePoll => None,
        }
    }
}

/// Authority-side owner of agents and loot.
pub struct AgentHost {
    config: ConfigSnapshot,
    oracle: Arc<dyn NavOracle + Send + Sync>,
    directory: Arc<dyn ActorDirectory + Send + Sync>,
    flee_nodes: Vec<Vec3>,
    channel: Option<ReplicationAuthority>,
    world_seed: u64,
    id_rng: ChaCha8Rng,
    agents: BTreeMap<AgentId, Agent>,
    loot: BTreeMap<LootId, LootObject>,
    tasks: DelayedTasks<HostTask>,
    departing: bool,
}

impl AgentHost {
    /// Creates a host with no replication channel. The config is sanitized
    /// here.
    #[must_use]
    pub fn new(
        config: &ConfigSnapshot,
        oracle: Arc<dyn NavOracle + Send + Sync>,
        directory: Arc<dyn ActorDirectory + Send + Sync>,
        flee_nodes: Vec<Vec3>,
        world_seed: u64,
    ) -> Self {
        Self {
            config: config.sanitized(),
            oracle,
            directory,
            flee_nodes,
            channel: None,
            world_seed,
            id_rng: ChaCha8Rng::seed_from_u64(world_seed),
            agents: BTreeMap::new(),
            loot: BTreeMap::new(),
            tasks: DelayedTasks::new(),
            departing: false,
        }
    }

    /// Takes the writer handle of `hub`.
    ///
    /// # Errors
    ///
    /// Closed hub, or another authority already holds it.
    pub fn attach_channel(&mut self, hub: &ReplicationHub) -> Result<(), ReplicationError> {
        self.channel = Some(hub.authority()?);
        tracing::info!("agent host attached to replication channel");
        Ok(())
    }

    /// Sanitized config in use.
    #[must_use]
    pub const fn config(&self) -> &ConfigSnapshot {
        &self.config
    }

    // =========================================================================
    // Spawn / Despawn
    // =========================================================================

    /// Spawns an agent with a simulated mover.
    ///
    /// # Errors
    ///
    /// See [`Self::spawn_with_navigation`].
    pub fn spawn(&mut self, position: Vec3, params: SpawnParams) -> Result<AgentId, SpawnError> {
        let nav = SimulatedNavAgent::new(Arc::clone(&self.oracle), position);
        self.spawn_with_navigation(params, Box::new(nav))
    }

    /// Spawns an agent driven by `nav`, standing where `nav` stands.
    ///
    /// # Errors
    ///
    /// [`SpawnError::NoChannel`] / [`SpawnError::ChannelClosed`] without a
    /// live channel, [`SpawnError::InvalidPosition`] for non-finite
    /// positions. Nothing is created on error.
    pub fn spawn_with_navigation(
        &mut self,
        params: SpawnParams,
        nav: Box<dyn NavigationHandle>,
    ) -> Result<AgentId, SpawnError> {
        let Some(channel) = self.channel.as_ref() else {
            tracing::error!("cannot spawn agent: no replication channel");
            return Err(SpawnError::NoChannel);
        };
        if !channel.is_open() {
            tracing::error!("cannot spawn agent: replication channel closed");
            return Err(SpawnError::ChannelClosed);
        }
        if !nav.position().is_finite() {
            return Err(SpawnError::InvalidPosition);
        }

        let id = AgentId::from_random_bytes(self.id_rng.gen());
        let object = register_announced(channel, |object| {
            channel.fire(object, id, AgentEvent::SyncIdentifier)?;
            channel.write(object, Scope::Agent(id), PersistedValue::Identity(id))?;
            channel.fire(object, id, AgentEvent::ConfigInitialized)
        })?;

        let mut agent = Agent::new(
            id,
            object,
            self.world_seed,
            params.health.unwrap_or(self.config.combat.starting_health),
            params.killable.unwrap_or(self.config.combat.killable),
            nav,
        );
        tracing::info!(
            "spawned agent {} on {} at {:?} (health {})",
            id,
            object,
            agent.position(),
            agent.health()
        );

        let mut out = Vec::new();
        self.machine().initialize(&mut agent, &mut out);
        self.agents.insert(id, agent);
        self.apply(id, out);
        Ok(id)
    }

    /// Removes an agent immediately. Pending timers for it are cancelled and
    /// attached loot is released.
    pub fn despawn(&mut self, id: AgentId) -> bool {
        let cancelled = self.tasks.cancel_where(|task| task.agent() == Some(id));
        let Some(agent) = self.agents.remove(&id) else {
            return false;
        };
        if let Some(loot) = agent.attached_loot {
            self.release_loot(loot, DetachCause::OwnerGone);
        }
        if let Some(channel) = &self.channel {
            if let Err(err) = channel.retire_object(agent.object) {
                tracing::warn!("failed to retire {} for agent {}: {}", agent.object, id, err);
            }
        }
        tracing::info!("despawned agent {} ({} pending tasks cancelled)", id, cancelled);
        true
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Advances the whole host by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        let ids: Vec<AgentId> = self.agents.keys().copied().collect();
        for id in ids {
            let mut out = Vec::new();
            {
                let machine = BehaviourMachine::new(
                    &self.config,
                    &*self.oracle,
                    &*self.directory,
                    &self.flee_nodes,
                );
                let Some(agent) = self.agents.get_mut(&id) else {
                    continue;
                };
                machine.tick(agent, dt, &mut out);
                agent.nav.step(dt);
            }
            self.apply(id, out);
        }

        self.late_update_loot();

        for task in self.tasks.advance(dt) {
            self.run_task(task);
        }

        self.handle_requests();
    }

    /// Applies damage. `None` for an unknown agent.
    pub fn hit(&mut self, id: AgentId, force: i32, attacker: Option<ActorId>) -> Option<HitOutcome> {
        let mut out = Vec::new();
        let outcome = {
            let machine = BehaviourMachine::new(
                &self.config,
                &*self.oracle,
                &*self.directory,
                &self.flee_nodes,
            );
            let agent = self.agents.get_mut(&id)?;
            machine.hit(agent, force, attacker, &mut out)
        };
        self.apply(id, out);
        Some(outcome)
    }

    /// Idle animation finished on `id`.
    pub fn idle_complete(&mut self, id: AgentId) -> bool {
        let mut out = Vec::new();
        let resumed = {
            let machine = BehaviourMachine::new(
                &self.config,
                &*self.oracle,
                &*self.directory,
                &self.flee_nodes,
            );
            let Some(agent) = self.agents.get_mut(&id) else {
                return false;
            };
            machine.idle_complete(agent, &mut out)
        };
        self.apply(id, out);
        resumed
    }

    /// Drop animation finished on `id`: the attached loot falls free.
    pub fn drop_loot(&mut self, id: AgentId) -> bool {
        let Some(loot) = self.agents.get(&id).and_then(Agent::attached_loot) else {
            return false;
        };
        self.release_loot(loot, DetachCause::Dropped)
    }

    /// Starts polling for an unseen moment to leave. No-op when departure is
    /// disabled or already running.
    pub fn begin_day_end(&mut self) -> bool {
        if !self.config.movement.leave_at_day_end || self.departing {
            return false;
        }
        self.departing = true;
        self.tasks.schedule(DEPARTURE_POLL_SECS, HostTask::DeparturePoll);
        tracing::info!("day end: {} agents will leave when unseen", self.agents.len());
        true
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// One agent.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Every live agent, ordered by id.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// One loot object.
    #[must_use]
    pub fn loot(&self, id: LootId) -> Option<&LootObject> {
        self.loot.get(&id)
    }

    /// Every loot object spawned by this host.
    pub fn loot_objects(&self) -> impl Iterator<Item = &LootObject> {
        self.loot.values()
    }

    /// Live agent count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// True with no live agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Timers still pending.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn machine(&self) -> BehaviourMachine<'_> {
        BehaviourMachine::new(
            &self.config,
            &*self.oracle,
            &*self.directory,
            &self.flee_nodes,
        )
    }

    fn apply(&mut self, id: AgentId, commands: Vec<AgentCommand>) {
        for command in commands {
            match command {
                AgentCommand::Persist(value) => self.persist(id, value),
                AgentCommand::Fire(event) => self.fire(id, event),
                AgentCommand::SpawnAttachedLoot(rolled) => self.spawn_attached_loot(id, rolled),
                AgentCommand::DropAttachedLoot => {
                    if let Some(loot) = self.agents.get(&id).and_then(Agent::attached_loot) {
                        self.release_loot(loot, DetachCause::OwnerGone);
                    }
                }
                AgentCommand::BeginDeathSettle => {
                    self.tasks.schedule(DEATH_SETTLE_SECS, HostTask::DeathBurst(id));
                }
            }
        }
    }

    fn persist(&self, id: AgentId, value: PersistedValue) {
        let (Some(channel), Some(agent)) = (&self.channel, self.agents.get(&id)) else {
            return;
        };
        if let Err(err) = channel.write(agent.object, Scope::Agent(id), value) {
            tracing::warn!("agent {} failed to persist {:?}: {}", id, value.key(), err);
        }
    }

    fn fire(&self, id: AgentId, event: AgentEvent) {
        let (Some(channel), Some(agent)) = (&self.channel, self.agents.get(&id)) else {
            return;
        };
        if let Err(err) = channel.fire(agent.object, id, event) {
            tracing::warn!("agent {} failed to fire {:?}: {}", id, event, err);
        }
    }

    /// Registers a loot object and writes its variables. `owner` is the
    /// agent object holding it, `None` for loot spawned free.
    fn register_loot(
        &self,
        loot: LootId,
        tier: LootTier,
        value: u32,
        owner: Option<NetObjectId>,
    ) -> Option<NetObjectId> {
        let channel = self.channel.as_ref()?;
        let written = register_announced(channel, |object| {
            let scope = Scope::Loot(loot);
            channel.write(object, scope, PersistedValue::LootIdentity(loot))?;
            channel.write(object, scope, PersistedValue::LootTier(tier))?;
            channel.write(object, scope, PersistedValue::LootValue(value))?;
            channel.write(object, scope, PersistedValue::LootAttached(owner.is_some()))?;
            channel.write(object, scope, PersistedValue::LootOwner(owner))?;
            Ok(())
        });
        match written {
            Ok(object) => Some(object),
            Err(err) => {
                tracing::warn!("failed to replicate loot {}: {}", loot, err);
                None
            }
        }
    }

    fn spawn_attached_loot(&mut self, owner: AgentId, rolled: RolledLoot) {
        let Some(agent) = self.agents.get_mut(&owner) else {
            return;
        };
        let previous = agent.attached_loot;
        let loot_id = LootId::from_random_bytes(agent.rng.gen());
        let placeholder = agent.placeholder();
        let owner_object = agent.object;

        if let Some(previous) = previous {
            self.release_loot(previous, DetachCause::Dropped);
        }
        let registered =
            self.register_loot(loot_id, rolled.tier, rolled.value, Some(owner_object));
        let Some(object) = registered else {
            return;
        };

        let loot = LootObject::spawn_attached(
            loot_id,
            object,
            owner,
            placeholder,
            rolled.tier,
            rolled.value,
        );
        self.loot.insert(loot_id, loot);
        if let Some(agent) = self.agents.get_mut(&owner) {
            agent.attached_loot = Some(loot_id);
        }
        self.fire(
            owner,
            AgentEvent::LootSpawned {
                loot: loot_id,
                object,
                tier: rolled.tier,
                value: rolled.value,
            },
        );
        tracing::info!(
            "agent {} produced {} loot {} worth {}",
            owner,
            rolled.tier,
            loot_id,
            rolled.value
        );
    }

    /// Moves an attached loot object to `Free` and tells followers.
    fn release_loot(&mut self, loot_id: LootId, cause: DetachCause) -> bool {
        let Some(loot) = self.loot.get_mut(&loot_id) else {
            return false;
        };
        let Some(owner) = loot.owner() else {
            return false;
        };
        let detached = match self.agents.get_mut(&owner) {
            Some(agent) => {
                agent.attached_loot = None;
                loot.force_detach(cause, &mut agent.rng)
            }
            None => loot.force_detach(cause, &mut self.id_rng),
        };
        if !detached {
            return false;
        }

        let object = loot.object();
        if let Some(channel) = &self.channel {
            let scope = Scope::Loot(loot_id);
            let written = channel
                .write(object, scope, PersistedValue::LootAttached(false))
                .and_then(|_| channel.write(object, scope, PersistedValue::LootOwner(None)));
            if let Err(err) = written {
                tracing::warn!("failed to replicate detach of loot {}: {}", loot_id, err);
            }
        }
        self.fire(owner, AgentEvent::LootDropped { loot: loot_id });
        true
    }

    fn late_update_loot(&mut self) {
        let mut orphaned = Vec::new();
        for loot in self.loot.values_mut() {
            let Some(owner) = loot.owner() else {
                continue;
            };
            match self.agents.get(&owner) {
                Some(agent) => {
                    loot.late_update(Some(agent.placeholder()));
                }
                None => orphaned.push(loot.id()),
            }
        }
        for loot in orphaned {
            self.release_loot(loot, DetachCause::OwnerGone);
        }
    }

    fn run_task(&mut self, task: HostTask) {
        match task {
            HostTask::DeathBurst(id) => {
                self.death_burst(id);
                self.tasks.schedule(DEATH_DESPAWN_SECS, HostTask::Despawn(id));
            }
            HostTask::Despawn(id) => {
                self.despawn(id);
            }
            HostTask::DeparturePoll => self.poll_departure(),
        }
    }

    /// One free loot object per tier around the corpse.
    fn death_burst(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        let corpse = agent.nav.position();
        let mut drops = Vec::with_capacity(LootTier::ALL.len());
        for tier in LootTier::ALL {
            let angle = agent.rng.gen_range(0.0..std::f32::consts::TAU);
            let distance = DEATH_BURST_RADIUS * agent.rng.gen::<f32>().sqrt();
            let probe = corpse + Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);
            let position = self
                .oracle
                .nearest_navigable(probe, DEATH_BURST_RADIUS)
                .unwrap_or(corpse);
            let value = self.config.loot.value_for(tier, &mut agent.rng);
            let loot_id = LootId::from_random_bytes(agent.rng.gen());
            drops.push((loot_id, tier, value, position));
        }

        for (loot_id, tier, value, position) in drops {
            let Some(object) = self.register_loot(loot_id, tier, value, None) else {
                continue;
            };
            let Some(agent) = self.agents.get_mut(&id) else {
                return;
            };
            let loot = LootObject::spawn_free(
                loot_id,
                object,
                tier,
                value,
                Transform::at(position),
                &mut agent.rng,
            );
            self.loot.insert(loot_id, loot);
            tracing::info!("agent {} death burst: {} loot worth {}", id, tier, value);
        }
    }

    fn poll_departure(&mut self) {
        let unseen: Vec<AgentId> = self
            .agents
            .values()
            .filter(|agent| !self.directory.is_visible(agent.position()))
            .map(Agent::id)
            .collect();
        for id in unseen {
            tracing::info!("agent {} left unseen", id);
            self.despawn(id);
        }
        if self.agents.is_empty() {
            self.departing = false;
        } else {
            self.tasks.schedule(DEPARTURE_POLL_SECS, HostTask::DeparturePoll);
        }
    }

    fn handle_requests(&mut self) {
        let Some(requests) = self.channel.as_ref().map(ReplicationAuthority::drain_requests) else {
            return;
        };
        for (object, request) in requests {
            match request {
                Upstream::DetachLoot { loot } => {
                    let known = self.loot.get(&loot).map(LootObject::object);
                    if known != Some(object) {
                        tracing::debug!("ignoring detach for {} on {}", loot, object);
                        continue;
                    }
                    if self.release_loot(loot, DetachCause::Grabbed) {
                        tracing::info!("loot {} grabbed off its owner", loot);
                    }
                }
            }
        }
    }
}

/// Registers a network object and runs `announce` on it. When the
/// announcement fails the object is retired again before the error is
/// returned.
fn register_announced<F>(
    channel: &ReplicationAuthority,
    announce: F,
) -> Result<NetObjectId, ReplicationError>
where
    F: FnOnce(NetObjectId) -> Result<(), ReplicationError>,
{
    let object = channel.register_object()?;
    if let Err(err) = announce(object) {
        if let Err(retire_err) = channel.retire_object(object) {
            tracing::warn!("failed to retire half-announced {}: {}", object, retire_err);
        }
        return Err(err);
    }
    Ok(object)
}
