//! # Behaviour State Machine
//!
//! Authority-only transition logic for one agent.
//!
//! ```text
//!            wander timer <= 0                idle_complete
//!  Roaming ───────────────────> Idle ───────────────────────> Roaming
//!     ▲                          │
//!     │ arrived / no escape      │ non-lethal hit (any live state)
//!     └────────── RunningAway <──┘
//!
//!  any state ── health <= 0 ──> Dead (terminal)
//! ```
//!
//! The machine mutates the agent directly and describes everything that
//! must leave the process as [`AgentCommand`]s. The host turns those into
//! replication writes, events, loot objects and timers.

use super::agent::Agent;
use super::directory::ActorDirectory;
use crate::config::ConfigSnapshot;
use rand::Rng;
use shisha_core::{find_node, NavOracle, SearchMode, SearchParams};
use shisha_economy::RolledLoot;
use shisha_networking::{AgentEvent, PersistedValue};
use shisha_shared::{
    lerp, ActorId, AnimationTrigger, BehaviourState, PresentationFlag, Vec3,
    FLEE_ARRIVAL_EPSILON, HIT_COOLDOWN_SECS,
};

/// Distance at which a wander destination counts as reached.
pub const WANDER_ARRIVAL_EPSILON: f32 = 1.0;

/// Side effects requested by the machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AgentCommand {
    // =========================================================================
    // Replication
    // =========================================================================
    /// Write a persisted variable on the agent's object.
    Persist(PersistedValue),

    /// Fire a one-shot event scoped to the agent.
    Fire(AgentEvent),

    // =========================================================================
    // Loot
    // =========================================================================
    /// Spawn an attached loot object on the placeholder.
    SpawnAttachedLoot(RolledLoot),

    /// Detach whatever loot is still on the placeholder.
    DropAttachedLoot,

    // =========================================================================
    // Lifecycle
    // =========================================================================
    /// Start the corpse settle timer.
    BeginDeathSettle,
}

/// Result of one hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitOutcome {
    /// Already dead. Nothing changed.
    IgnoredDead,
    /// Inside the cooldown after the previous hit.
    IgnoredCooldown,
    /// Non-killable agent already at its health floor.
    IgnoredAtFloor,
    /// Damage taken, a flee node was found.
    Fleeing,
    /// Damage taken, no flee node: back to wandering or idling.
    NoEscape,
    /// Damage was lethal.
    Killed,
}

/// Transition logic bound to one tick's collaborators.
pub struct BehaviourMachine<'a> {
    config: &'a ConfigSnapshot,
    oracle: &'a dyn NavOracle,
    directory: &'a dyn ActorDirectory,
    nodes: &'a [Vec3],
}

impl<'a> BehaviourMachine<'a> {
    /// Binds the machine to its collaborators. `nodes` are the flee
    /// candidates.
    #[must_use]
    pub fn new(
        config: &'a ConfigSnapshot,
        oracle: &'a dyn NavOracle,
        directory: &'a dyn ActorDirectory,
        nodes: &'a [Vec3],
    ) -> Self {
        Self {
            config,
            oracle,
            directory,
            nodes,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// First entry right after spawn. Roaming, or a pinned idle when
    /// wandering is disabled.
    pub fn initialize(&self, agent: &mut Agent, out: &mut Vec<AgentCommand>) {
        agent.ambient_timer = self.draw_ambient_timer(agent);
        if self.config.movement.wander_enabled {
            agent.state = BehaviourState::Roaming;
            out.push(AgentCommand::Persist(PersistedValue::BehaviourState(agent.state)));
            self.enter(agent, out);
        } else {
            agent.state = BehaviourState::Idle;
            agent.entries[usize::from(BehaviourState::Idle.as_u8())] += 1;
            out.push(AgentCommand::Persist(PersistedValue::BehaviourState(agent.state)));
            self.pin_idle(agent, out);
        }
    }

    /// Switches state. A no-op returning `false` when `new` is current or
    /// the agent is dead.
    pub fn switch_state(
        &self,
        agent: &mut Agent,
        new: BehaviourState,
        out: &mut Vec<AgentCommand>,
    ) -> bool {
        if agent.state == new || agent.state.is_terminal() {
            return false;
        }
        tracing::info!("agent {} state {} -> {}", agent.id, agent.state, new);
        agent.previous_state = agent.state;
        agent.state = new;
        out.push(AgentCommand::Persist(PersistedValue::BehaviourState(new)));
        self.enter(agent, out);
        true
    }

    fn enter(&self, agent: &mut Agent, out: &mut Vec<AgentCommand>) {
        agent.entries[usize::from(agent.state.as_u8())] += 1;
        match agent.state {
            BehaviourState::Roaming => self.enter_roaming(agent, out),
            BehaviourState::Idle => self.enter_idle(agent, out),
            BehaviourState::RunningAway => self.enter_running_away(agent),
            BehaviourState::Dead => Self::enter_dead(agent, out),
        }
    }

    fn enter_roaming(&self, agent: &mut Agent, out: &mut Vec<AgentCommand>) {
        let movement = &self.config.movement;
        agent.target_speed = movement.max_speed;
        agent.target_acceleration = movement.max_acceleration;
        agent.wander_timer =
            agent.rng.gen_range(movement.wander_time_min..=movement.wander_time_max);
        agent.wander_anchor = if movement.anchored_wandering {
            agent.spawn_position
        } else {
            agent.nav.position()
        };
        agent.wander_destination = None;
        agent.flee_target = None;
        out.push(Self::flag(PresentationFlag::Walk, true));
        tracing::debug!(
            "agent {} roaming for {:.2}s around {:?}",
            agent.id,
            agent.wander_timer,
            agent.wander_anchor
        );
    }

    fn enter_idle(&self, agent: &mut Agent, out: &mut Vec<AgentCommand>) {
        self.pin_idle(agent, out);

        let idle = &self.config.idle;
        let draw: f32 = agent.rng.gen();
        if idle.loot_enabled && draw < idle.loot_chance {
            let rolled = self.config.loot.roll(&mut agent.rng);
            out.push(AgentCommand::SpawnAttachedLoot(rolled));
            out.push(Self::trigger(AnimationTrigger::Poo));
        } else if agent.rng.gen_bool(0.5) {
            out.push(Self::trigger(AnimationTrigger::Idle1));
        } else {
            out.push(Self::trigger(AnimationTrigger::Idle2));
        }
    }

    /// Stops and pins the agent where it stands.
    fn pin_idle(&self, agent: &mut Agent, out: &mut Vec<AgentCommand>) {
        agent.nav.set_speed(0.0);
        agent.nav.set_acceleration(0.0);
        agent.nav.stop();
        agent.target_speed = 0.0;
        agent.target_acceleration = self.config.movement.max_acceleration;
        agent.wander_destination = None;
        agent.flee_target = None;
        agent.idle_position = agent.nav.position();
        out.push(Self::flag(PresentationFlag::Walk, false));
        out.push(Self::flag(PresentationFlag::Run, false));
    }

    fn enter_running_away(&self, agent: &mut Agent) {
        let movement = &self.config.movement;
        agent.target_speed = movement.max_speed * movement.flee_speed_multiplier;
        agent.target_acceleration =
            movement.max_acceleration * movement.flee_acceleration_multiplier;
        agent.nav.set_speed(agent.target_speed);
        agent.nav.set_acceleration(agent.target_acceleration);
        agent.wander_destination = None;
    }

    fn enter_dead(agent: &mut Agent, out: &mut Vec<AgentCommand>) {
        tracing::info!("agent {} died at {:?}", agent.id, agent.nav.position());
        out.push(AgentCommand::Persist(PersistedValue::Dead(true)));
        out.push(AgentCommand::Fire(AgentEvent::EnterDeathState));
        agent.nav.set_enabled(false);
        agent.wander_destination = None;
        agent.flee_target = None;
        if agent.target_actor.take().is_some() {
            out.push(AgentCommand::Persist(PersistedValue::TargetActor(None)));
        }
        if agent.attached_loot.is_some() {
            out.push(AgentCommand::DropAttachedLoot);
        }
        out.push(AgentCommand::BeginDeathSettle);
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Per-tick update.
    pub fn tick(&self, agent: &mut Agent, dt: f32, out: &mut Vec<AgentCommand>) {
        if agent.state.is_terminal() {
            return;
        }
        agent.hit_cooldown = (agent.hit_cooldown - dt).max(0.0);

        match agent.state {
            BehaviourState::Roaming => self.tick_roaming(agent, dt, out),
            BehaviourState::Idle => {
                agent.nav.set_speed(0.0);
                agent.nav.warp(agent.idle_position);
            }
            BehaviourState::RunningAway => self.tick_running_away(agent, out),
            BehaviourState::Dead => {}
        }

        self.tick_ambient(agent, dt, out);
    }

    fn tick_roaming(&self, agent: &mut Agent, dt: f32, out: &mut Vec<AgentCommand>) {
        agent.wander_timer -= dt;
        if agent.wander_timer <= 0.0 {
            self.switch_state(agent, BehaviourState::Idle, out);
            return;
        }

        let speed = lerp(agent.nav.speed(), agent.target_speed, dt / 2.0);
        let acceleration = lerp(agent.nav.acceleration(), agent.target_acceleration, dt);
        agent.nav.set_speed(speed);
        agent.nav.set_acceleration(acceleration);

        let reached = agent.wander_destination.map_or(true, |dest| {
            agent.nav.position().distance(dest) <= WANDER_ARRIVAL_EPSILON
                || !agent.nav.has_destination()
        });
        if reached {
            self.pick_wander_destination(agent);
        }
    }

    fn pick_wander_destination(&self, agent: &mut Agent) {
        let radius = self.config.movement.wander_radius;
        let angle = agent.rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = radius * agent.rng.gen::<f32>().sqrt();
        let probe = agent.wander_anchor
            + Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);

        agent.wander_destination = self
            .oracle
            .nearest_navigable(probe, radius)
            .filter(|point| agent.nav.set_destination(*point));
    }

    fn tick_running_away(&self, agent: &mut Agent, out: &mut Vec<AgentCommand>) {
        let arrived = agent.flee_target.map_or(true, |target| {
            agent.nav.position().distance(target) <= FLEE_ARRIVAL_EPSILON
        });
        if !arrived {
            return;
        }
        tracing::debug!("agent {} reached its flee target", agent.id);
        Self::clear_target(agent, out);
        agent.flee_target = None;
        self.switch_state(agent, self.fallback_state(), out);
    }

    fn tick_ambient(&self, agent: &mut Agent, dt: f32, out: &mut Vec<AgentCommand>) {
        agent.ambient_timer -= dt;
        if agent.ambient_timer > 0.0 {
            return;
        }
        agent.ambient_timer = self.draw_ambient_timer(agent);
        let clips = self.config.audio.ambient_clips.len();
        if clips == 0 {
            return;
        }
        let clip_index = u16::try_from(agent.rng.gen_range(0..clips)).unwrap_or(u16::MAX);
        out.push(AgentCommand::Fire(AgentEvent::PlayAmbientSfx { clip_index }));
    }

    /// Applies damage from `attacker`.
    pub fn hit(
        &self,
        agent: &mut Agent,
        force: i32,
        attacker: Option<ActorId>,
        out: &mut Vec<AgentCommand>,
    ) -> HitOutcome {
        if agent.state.is_terminal() {
            return HitOutcome::IgnoredDead;
        }
        if agent.hit_cooldown > 0.0 {
            return HitOutcome::IgnoredCooldown;
        }
        if !agent.killable && agent.health <= 1 {
            return HitOutcome::IgnoredAtFloor;
        }

        agent.hit_cooldown = HIT_COOLDOWN_SECS;
        agent.health = agent.health.saturating_sub(force.max(0));
        if !agent.killable {
            agent.health = agent.health.max(1);
        }
        tracing::info!(
            "agent {} hit for {} by {:?}, health {}",
            agent.id,
            force,
            attacker,
            agent.health
        );

        if agent.health <= 0 {
            self.switch_state(agent, BehaviourState::Dead, out);
            return HitOutcome::Killed;
        }
        self.try_flee(agent, attacker, out)
    }

    fn try_flee(
        &self,
        agent: &mut Agent,
        attacker: Option<ActorId>,
        out: &mut Vec<AgentCommand>,
    ) -> HitOutcome {
        let position = agent.nav.position();
        let reference = attacker
            .and_then(|actor| self.directory.position(actor))
            .unwrap_or(position);

        let outcome = find_node(
            self.oracle,
            position,
            reference,
            self.nodes,
            SearchMode::Farthest,
            &SearchParams::FLEE,
        );
        let node = match outcome {
            Ok(found) => found.node,
            Err(err) => {
                tracing::warn!("agent {} flee search failed: {}", agent.id, err);
                None
            }
        };

        let Some(node) = node.filter(|n| agent.nav.set_destination(*n)) else {
            tracing::debug!("agent {} has nowhere to run", agent.id);
            Self::clear_target(agent, out);
            self.switch_state(agent, self.fallback_state(), out);
            return HitOutcome::NoEscape;
        };

        agent.flee_target = Some(node);
        if agent.target_actor != attacker {
            agent.target_actor = attacker;
            out.push(AgentCommand::Persist(PersistedValue::TargetActor(attacker)));
        }
        if !self.switch_state(agent, BehaviourState::RunningAway, out) {
            // Already fleeing: refresh speeds for the new route.
            self.enter_running_away(agent);
        }
        HitOutcome::Fleeing
    }

    /// Idle animation finished. Returns `true` when the agent went back to
    /// roaming.
    pub fn idle_complete(&self, agent: &mut Agent, out: &mut Vec<AgentCommand>) -> bool {
        if agent.state != BehaviourState::Idle || !self.config.movement.wander_enabled {
            return false;
        }
        self.switch_state(agent, BehaviourState::Roaming, out);
        out.push(Self::trigger(AnimationTrigger::ForceWalk));
        true
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn fallback_state(&self) -> BehaviourState {
        if self.config.movement.wander_enabled {
            BehaviourState::Roaming
        } else {
            BehaviourState::Idle
        }
    }

    fn clear_target(agent: &mut Agent, out: &mut Vec<AgentCommand>) {
        if agent.target_actor.take().is_some() {
            out.push(AgentCommand::Persist(PersistedValue::TargetActor(None)));
        }
    }

    fn draw_ambient_timer(&self, agent: &mut Agent) -> f32 {
        let audio = &self.config.audio;
        agent.rng.gen_range(audio.ambient_time_min..=audio.ambient_time_max)
    }

    fn flag(flag: PresentationFlag, value: bool) -> AgentCommand {
        AgentCommand::Fire(AgentEvent::SetFlag { flag, value })
    }

    fn trigger(trigger: AnimationTrigger) -> AgentCommand {
        AgentCommand::Fire(AgentEvent::AnimationTrigger(trigger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::directory::ActorRoster;
    use crate::authority::navigation::SimulatedNavAgent;
    use shisha_core::{Aabb, ObstacleField};
    use shisha_shared::{AgentId, NetObjectId};
    use std::sync::Arc;

    fn field() -> Arc<ObstacleField> {
        Arc::new(ObstacleField::new(Aabb::new(
            Vec3::new(-100.0, 0.0, -100.0),
            Vec3::new(100.0, 0.0, 100.0),
        )))
    }

    fn agent(oracle: Arc<ObstacleField>, health: i32, killable: bool) -> Agent {
        Agent::new(
            AgentId::from_random_bytes([4; 16]),
            NetObjectId(1),
            99,
            health,
            killable,
            Box::new(SimulatedNavAgent::new(oracle, Vec3::ZERO)),
        )
    }

    fn fixed_wander() -> ConfigSnapshot {
        let mut config = ConfigSnapshot::default();
        config.movement.wander_time_min = 5.0;
        config.movement.wander_time_max = 5.0;
        config.audio.ambient_time_min = 1000.0;
        config.audio.ambient_time_max = 1000.0;
        config
    }

    #[test]
    fn test_self_transition_is_noop() {
        let config = fixed_wander();
        let oracle = field();
        let roster = ActorRoster::new(10.0);
        let machine = BehaviourMachine::new(&config, &*oracle, &roster, &[]);
        let mut agent = agent(Arc::clone(&oracle), 3, true);
        let mut out = Vec::new();
        machine.initialize(&mut agent, &mut out);
        out.clear();

        assert!(!machine.switch_state(&mut agent, BehaviourState::Roaming, &mut out));
        assert!(out.is_empty());
        assert_eq!(agent.entries(BehaviourState::Roaming), 1);
    }

    #[test]
    fn test_roaming_times_out_into_idle_once() {
        let config = fixed_wander();
        let oracle = field();
        let roster = ActorRoster::new(10.0);
        let machine = BehaviourMachine::new(&config, &*oracle, &roster, &[]);
        let mut agent = agent(Arc::clone(&oracle), 3, true);
        let mut out = Vec::new();
        machine.initialize(&mut agent, &mut out);

        for _ in 0..19 {
            machine.tick(&mut agent, 0.25, &mut out);
        }
        assert_eq!(agent.state(), BehaviourState::Roaming);

        for _ in 0..21 {
            machine.tick(&mut agent, 0.25, &mut out);
        }
        assert_eq!(agent.state(), BehaviourState::Idle);
        assert_eq!(agent.entries(BehaviourState::Idle), 1);
    }

    #[test]
    fn test_roaming_eases_towards_max_speed() {
        let config = fixed_wander();
        let oracle = field();
        let roster = ActorRoster::new(10.0);
        let machine = BehaviourMachine::new(&config, &*oracle, &roster, &[]);
        let mut agent = agent(Arc::clone(&oracle), 3, true);
        let mut out = Vec::new();
        machine.initialize(&mut agent, &mut out);

        machine.tick(&mut agent, 0.5, &mut out);
        // lerp(0, 4, 0.25) and lerp(0, 5, 0.5)
        assert!((agent.navigation().speed() - 1.0).abs() < 1e-5);
        assert!((agent.navigation().acceleration() - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_idle_entry_with_certain_loot() {
        let mut config = fixed_wander();
        config.idle.loot_chance = 1.0;
        let oracle = field();
        let roster = ActorRoster::new(10.0);
        let machine = BehaviourMachine::new(&config, &*oracle, &roster, &[]);
        let mut agent = agent(Arc::clone(&oracle), 3, true);
        let mut out = Vec::new();
        machine.initialize(&mut agent, &mut out);
        out.clear();

        machine.switch_state(&mut agent, BehaviourState::Idle, &mut out);
        assert!(out
            .iter()
            .any(|c| matches!(c, AgentCommand::SpawnAttachedLoot(_))));
        assert!(out.contains(&AgentCommand::Fire(AgentEvent::AnimationTrigger(
            AnimationTrigger::Poo
        ))));
    }

    #[test]
    fn test_idle_entry_without_loot_plays_idle_variant() {
        let mut config = fixed_wander();
        config.idle.loot_enabled = false;
        config.idle.loot_chance = 1.0;
        let oracle = field();
        let roster = ActorRoster::new(10.0);
        let machine = BehaviourMachine::new(&config, &*oracle, &roster, &[]);
        let mut agent = agent(Arc::clone(&oracle), 3, true);
        let mut out = Vec::new();
        machine.initialize(&mut agent, &mut out);
        out.clear();

        machine.switch_state(&mut agent, BehaviourState::Idle, &mut out);
        let variants = out
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    AgentCommand::Fire(AgentEvent::AnimationTrigger(
                        AnimationTrigger::Idle1 | AnimationTrigger::Idle2
                    ))
                )
            })
            .count();
        assert_eq!(variants, 1);
        assert!(!out
            .iter()
            .any(|c| matches!(c, AgentCommand::SpawnAttachedLoot(_))));
    }

    #[test]
    fn test_idle_complete_resumes_roaming_with_forced_walk() {
        let mut config = fixed_wander();
        config.idle.loot_enabled = false;
        let oracle = field();
        let roster = ActorRoster::new(10.0);
        let machine = BehaviourMachine::new(&config, &*oracle, &roster, &[]);
        let mut agent = agent(Arc::clone(&oracle), 3, true);
        let mut out = Vec::new();
        machine.initialize(&mut agent, &mut out);
        machine.switch_state(&mut agent, BehaviourState::Idle, &mut out);
        out.clear();

        assert!(machine.idle_complete(&mut agent, &mut out));
        assert_eq!(agent.state(), BehaviourState::Roaming);
        assert_eq!(agent.entries(BehaviourState::Roaming), 2);
        assert!(out.contains(&AgentCommand::Persist(PersistedValue::BehaviourState(
            BehaviourState::Roaming
        ))));
        assert_eq!(
            out.last(),
            Some(&AgentCommand::Fire(AgentEvent::AnimationTrigger(
                AnimationTrigger::ForceWalk
            )))
        );

        // Only Idle answers the callback.
        out.clear();
        assert!(!machine.idle_complete(&mut agent, &mut out));
        assert!(out.is_empty());
    }

    #[test]
    fn test_flee_uses_configured_maxima_during_ease_in() {
        let config = fixed_wander();
        let oracle = field();
        let nodes = oracle.grid_nodes(10.0);
        let roster = ActorRoster::new(10.0);
        let machine = BehaviourMachine::new(&config, &*oracle, &roster, &nodes);
        let mut agent = agent(Arc::clone(&oracle), 3, true);
        let mut out = Vec::new();
        machine.initialize(&mut agent, &mut out);
        machine.tick(&mut agent, 0.1, &mut out);
        assert!(agent.navigation().speed() < config.movement.max_speed);

        assert_eq!(machine.hit(&mut agent, 1, None, &mut out), HitOutcome::Fleeing);
        let movement = &config.movement;
        let speed = movement.max_speed * movement.flee_speed_multiplier;
        let acceleration = movement.max_acceleration * movement.flee_acceleration_multiplier;
        assert!((agent.navigation().speed() - speed).abs() < 1e-5);
        assert!((agent.navigation().acceleration() - acceleration).abs() < 1e-5);
    }

    #[test]
    fn test_dead_absorbs_everything() {
        let config = fixed_wander();
        let oracle = field();
        let roster = ActorRoster::new(10.0);
        let machine = BehaviourMachine::new(&config, &*oracle, &roster, &[]);
        let mut agent = agent(Arc::clone(&oracle), 1, true);
        let mut out = Vec::new();
        machine.initialize(&mut agent, &mut out);

        assert_eq!(machine.hit(&mut agent, 5, None, &mut out), HitOutcome::Killed);
        let health = agent.health();
        out.clear();

        assert_eq!(machine.hit(&mut agent, 5, None, &mut out), HitOutcome::IgnoredDead);
        for state in [
            BehaviourState::Roaming,
            BehaviourState::Idle,
            BehaviourState::RunningAway,
            BehaviourState::Dead,
        ] {
            assert!(!machine.switch_state(&mut agent, state, &mut out));
        }
        assert!(!machine.idle_complete(&mut agent, &mut out));
        machine.tick(&mut agent, 100.0, &mut out);

        assert!(out.is_empty());
        assert_eq!(agent.state(), BehaviourState::Dead);
        assert_eq!(agent.health(), health);
        assert_eq!(agent.entries(BehaviourState::Dead), 1);
    }

    #[test]
    fn test_wander_disabled_spawns_pinned_idle() {
        let mut config = fixed_wander();
        config.movement.wander_enabled = false;
        let oracle = field();
        let roster = ActorRoster::new(10.0);
        let machine = BehaviourMachine::new(&config, &*oracle, &roster, &[]);
        let mut agent = agent(Arc::clone(&oracle), 3, true);
        let mut out = Vec::new();
        machine.initialize(&mut agent, &mut out);

        assert_eq!(agent.state(), BehaviourState::Idle);
        assert!(!machine.idle_complete(&mut agent, &mut out));
        for _ in 0..100 {
            machine.tick(&mut agent, 0.5, &mut out);
        }
        assert_eq!(agent.state(), BehaviourState::Idle);
        assert_eq!(agent.position(), Vec3::ZERO);
    }
}
