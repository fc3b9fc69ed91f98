//! # Follower Presenter
//!
//! Turns replicated state of one agent into presentation calls.
//!
//! ```text
//! Variable(BehaviourState) ──> flags (Walk / Run / Dead, GotHit)
//! Event(AnimationTrigger)  ──> trigger
//! Event(PlayAmbientSfx)    ──> voice clip + walkie-talkie relay
//! Event(LootSpawned)       ──> loot transform under placeholder
//! update(position, dt)     ──> locomotion floats + footsteps
//! ```
//!
//! Nothing here predicts. A presenter that has not learned its agent id yet
//! drops every event except the identity sync.

use super::sink::{AudioSource, LootParent, PresentationSink};
use crate::authority::ActorDirectory;
use crate::config::ConfigSnapshot;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shisha_networking::{AgentEvent, MirrorChange, PersistedValue};
use shisha_shared::{
    lerp, ActorId, AgentId, AnimationFloat, AnimationTrigger, BehaviourState, LootId, NetObjectId,
    PresentationFlag, Vec3,
};

/// Speed smoothing factor per update.
pub const SPEED_SMOOTHING: f32 = 0.75;

/// Upper clamp of the walk animation multiplier.
pub const MAX_WALK_ANIMATION_MULTIPLIER: f32 = 2.0;

/// Divisor turning observed speed into the run animation multiplier.
pub const RUN_ANIMATION_DIVISOR: f32 = 4.0;

/// Upper clamp of the run animation multiplier.
pub const MAX_RUN_ANIMATION_MULTIPLIER: f32 = 5.0;

/// Presentation state of one replicated agent.
pub struct FollowerPresenter {
    object: NetObjectId,
    identity: Option<AgentId>,
    state: Option<BehaviourState>,
    target: Option<ActorId>,
    target_position: Option<Vec3>,
    attached_loot: Option<LootId>,
    ambient_clips: Vec<String>,
    footstep_clips: Vec<String>,
    ambient_volume: f32,
    footstep_volume: f32,
    footstep_interval: f32,
    walk_speed_threshold: f32,
    observed_speed: f32,
    last_position: Option<Vec3>,
    footstep_timer: f32,
    rng: ChaCha8Rng,
}

impl FollowerPresenter {
    /// Presenter bound to `object`. `seed` drives footstep clip choice.
    #[must_use]
    pub fn new(object: NetObjectId, config: &ConfigSnapshot, seed: u64) -> Self {
        let config = config.sanitized();
        Self {
            object,
            identity: None,
            state: None,
            target: None,
            target_position: None,
            attached_loot: None,
            ambient_volume: config.audio.ambient_playback_volume(),
            footstep_volume: config.audio.footstep_playback_volume(),
            footstep_interval: config.audio.footstep_interval,
            walk_speed_threshold: config.movement.walk_speed_threshold,
            ambient_clips: config.audio.ambient_clips,
            footstep_clips: config.audio.footstep_clips,
            observed_speed: 0.0,
            last_position: None,
            footstep_timer: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed ^ u64::from(object.0)),
        }
    }

    /// Bound network object.
    #[must_use]
    pub const fn object(&self) -> NetObjectId {
        self.object
    }

    /// Adopted agent id.
    #[must_use]
    pub const fn identity(&self) -> Option<AgentId> {
        self.identity
    }

    /// Last replicated behaviour state.
    #[must_use]
    pub const fn state(&self) -> Option<BehaviourState> {
        self.state
    }

    /// Replicated aggressor.
    #[must_use]
    pub const fn target(&self) -> Option<ActorId> {
        self.target
    }

    /// Aggressor position at the time it was replicated, when resolvable.
    #[must_use]
    pub const fn target_position(&self) -> Option<Vec3> {
        self.target_position
    }

    /// Loot currently hanging on the placeholder.
    #[must_use]
    pub const fn attached_loot(&self) -> Option<LootId> {
        self.attached_loot
    }

    /// Smoothed observed speed.
    #[must_use]
    pub const fn observed_speed(&self) -> f32 {
        self.observed_speed
    }

    // =========================================================================
    // Identity
    // =========================================================================

    fn adopt(&mut self, agent: AgentId) -> bool {
        match self.identity {
            None => {
                self.identity = Some(agent);
                tracing::info!("{} bound to agent {}", self.object, agent);
                true
            }
            Some(own) if own == agent => true,
            Some(own) => {
                tracing::debug!(
                    "{} rejected identity {} (bound to {})",
                    self.object,
                    agent,
                    own
                );
                false
            }
        }
    }

    fn accepts(&self, agent: AgentId) -> bool {
        if self.identity == Some(agent) {
            return true;
        }
        tracing::debug!(
            "{} dropped message for {} (bound to {:?})",
            self.object,
            agent,
            self.identity
        );
        false
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Handles a one-shot event. Returns whether it was applied.
    pub fn on_event(
        &mut self,
        agent: AgentId,
        event: AgentEvent,
        sink: &mut dyn PresentationSink,
    ) -> bool {
        if let AgentEvent::SyncIdentifier = event {
            return self.adopt(agent);
        }
        if !self.accepts(agent) {
            return false;
        }

        match event {
            AgentEvent::SyncIdentifier | AgentEvent::ConfigInitialized => {}
            AgentEvent::AnimationTrigger(trigger) => sink.set_trigger(trigger),
            AgentEvent::SetFlag { flag, value } => sink.set_bool(flag, value),
            AgentEvent::PlayAmbientSfx { clip_index } => {
                let Some(clip) = self.ambient_clips.get(usize::from(clip_index)) else {
                    tracing::debug!(
                        "{} ignored ambient clip {} (pool of {})",
                        self.object,
                        clip_index,
                        self.ambient_clips.len()
                    );
                    return false;
                };
                sink.play_clip(AudioSource::Voice, clip, self.ambient_volume);
                sink.transmit_audio(clip, self.ambient_volume);
            }
            AgentEvent::LootSpawned { loot, .. } => {
                self.attach_loot(loot, sink);
            }
            AgentEvent::LootDropped { loot } => return self.release_loot(loot, sink),
            AgentEvent::EnterDeathState => {
                tracing::debug!("{} entering death state", self.object);
            }
        }
        true
    }

    /// Handles an accepted change of one of this agent's persisted
    /// variables.
    pub fn on_variable(
        &mut self,
        agent: AgentId,
        change: MirrorChange,
        directory: &dyn ActorDirectory,
        sink: &mut dyn PresentationSink,
    ) -> bool {
        if let PersistedValue::Identity(id) = change.current {
            return id == agent && self.adopt(id);
        }
        if !self.accepts(agent) {
            return false;
        }

        match change.current {
            PersistedValue::BehaviourState(state) => self.apply_state(state, sink),
            PersistedValue::TargetActor(target) => {
                self.target = target;
                self.target_position = target.and_then(|actor| directory.position(actor));
            }
            PersistedValue::Dead(true) => sink.set_bool(PresentationFlag::Dead, true),
            _ => {}
        }
        true
    }

    /// Physics off and under the placeholder. No-op when `loot` is already
    /// held, so the spawn event and the replicated owner can both call it.
    pub fn attach_loot(&mut self, loot: LootId, sink: &mut dyn PresentationSink) -> bool {
        if self.attached_loot == Some(loot) {
            return false;
        }
        self.attached_loot = Some(loot);
        sink.set_loot_physics(loot, false);
        sink.reparent_loot(loot, LootParent::Placeholder);
        tracing::debug!("{} holds loot {}", self.object, loot);
        true
    }

    /// Physics on and back to the world pool, if `loot` is the one held.
    pub fn release_loot(&mut self, loot: LootId, sink: &mut dyn PresentationSink) -> bool {
        if self.attached_loot != Some(loot) {
            return false;
        }
        self.attached_loot = None;
        sink.set_loot_physics(loot, true);
        sink.reparent_loot(loot, LootParent::WorldPool);
        tracing::debug!("{} released loot {}", self.object, loot);
        true
    }

    fn apply_state(&mut self, state: BehaviourState, sink: &mut dyn PresentationSink) {
        self.state = Some(state);
        tracing::debug!("{} behaviour state -> {}", self.object, state);
        match state {
            BehaviourState::Roaming => sink.set_bool(PresentationFlag::Walk, true),
            BehaviourState::Idle => {
                sink.set_bool(PresentationFlag::Walk, false);
                sink.set_bool(PresentationFlag::Run, false);
            }
            BehaviourState::RunningAway => {
                sink.set_bool(PresentationFlag::Walk, true);
                sink.set_trigger(AnimationTrigger::GotHit);
            }
            BehaviourState::Dead => {
                sink.set_bool(PresentationFlag::Walk, false);
                sink.set_bool(PresentationFlag::Run, false);
                sink.set_bool(PresentationFlag::Dead, true);
            }
        }
    }

    // =========================================================================
    // Per-frame
    // =========================================================================

    /// Per-frame update from the agent's observed transform.
    pub fn update(&mut self, position: Vec3, dt: f32, sink: &mut dyn PresentationSink) {
        if dt <= 0.0 {
            return;
        }
        let measured = self
            .last_position
            .map_or(0.0, |last| position.distance(last) / dt);
        self.observed_speed = lerp(self.observed_speed, measured, SPEED_SMOOTHING);
        self.last_position = Some(position);

        if !matches!(
            self.state,
            Some(BehaviourState::Roaming | BehaviourState::RunningAway)
        ) {
            return;
        }

        let speed = self.observed_speed;
        if speed > 0.0 && speed <= self.walk_speed_threshold {
            sink.set_bool(PresentationFlag::Walk, true);
            sink.set_bool(PresentationFlag::Run, false);
            sink.set_float(
                AnimationFloat::WalkSpeed,
                (speed / self.walk_speed_threshold).clamp(0.0, MAX_WALK_ANIMATION_MULTIPLIER),
            );
        } else if speed > self.walk_speed_threshold {
            sink.set_bool(PresentationFlag::Walk, true);
            sink.set_bool(PresentationFlag::Run, true);
            sink.set_float(
                AnimationFloat::RunSpeed,
                (speed / RUN_ANIMATION_DIVISOR).clamp(0.0, MAX_RUN_ANIMATION_MULTIPLIER),
            );
        } else {
            sink.set_bool(PresentationFlag::Walk, false);
            sink.set_bool(PresentationFlag::Run, false);
        }

        self.footstep_timer -= dt;
        if self.footstep_clips.is_empty() || self.footstep_timer > 0.0 {
            return;
        }
        let index = self.rng.gen_range(0..self.footstep_clips.len());
        let clip = &self.footstep_clips[index];
        sink.stop_audio(AudioSource::Sfx);
        sink.play_clip(AudioSource::Sfx, clip, self.footstep_volume);
        sink.transmit_audio(clip, self.footstep_volume);
        self.footstep_timer = self.footstep_interval;
    }
}
