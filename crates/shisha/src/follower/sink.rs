//! Presentation output. The presenter never touches an animator, audio
//! source or physics body directly; it only calls a [`PresentationSink`].

use shisha_shared::{AnimationFloat, AnimationTrigger, LootId, PresentationFlag};

/// Which emitter a clip plays from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioSource {
    /// Voice emitter (ambient clips).
    Voice,
    /// Sfx emitter (footsteps).
    Sfx,
}

/// Where a loot object's presentation transform hangs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LootParent {
    /// The agent's loot placeholder.
    Placeholder,
    /// The shared world object pool.
    WorldPool,
}

/// Symbolic presentation outputs of one agent.
pub trait PresentationSink {
    /// Sets a boolean animation parameter.
    fn set_bool(&mut self, flag: PresentationFlag, value: bool);

    /// Fires a trigger.
    fn set_trigger(&mut self, trigger: AnimationTrigger);

    /// Sets a float animation parameter.
    fn set_float(&mut self, parameter: AnimationFloat, value: f32);

    /// Plays a one-shot clip.
    fn play_clip(&mut self, source: AudioSource, clip: &str, volume: f32);

    /// Stops whatever `source` is playing.
    fn stop_audio(&mut self, source: AudioSource);

    /// Relays a clip through the spatial-audio collaborator (walkie talkies).
    fn transmit_audio(&mut self, clip: &str, volume: f32);

    /// Turns physics on or off for a loot object.
    fn set_loot_physics(&mut self, loot: LootId, enabled: bool);

    /// Moves a loot object's transform under `parent`.
    fn reparent_loot(&mut self, loot: LootId, parent: LootParent);
}

/// One recorded sink call.
#[derive(Clone, Debug, PartialEq)]
pub enum SinkCall {
    /// [`PresentationSink::set_bool`].
    Bool(PresentationFlag, bool),
    /// [`PresentationSink::set_trigger`].
    Trigger(AnimationTrigger),
    /// [`PresentationSink::set_float`].
    Float(AnimationFloat, f32),
    /// [`PresentationSink::play_clip`].
    Play(AudioSource, String, f32),
    /// [`PresentationSink::stop_audio`].
    Stop(AudioSource),
    /// [`PresentationSink::transmit_audio`].
    Transmit(String, f32),
    /// [`PresentationSink::set_loot_physics`].
    LootPhysics(LootId, bool),
    /// [`PresentationSink::reparent_loot`].
    Reparent(LootId, LootParent),
}

/// Sink that keeps every call, for headless runs and tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
}

impl RecordingSink {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// Takes the recorded calls, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<SinkCall> {
        std::mem::take(&mut self.calls)
    }

    /// Triggers fired, in order.
    #[must_use]
    pub fn triggers(&self) -> Vec<AnimationTrigger> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Trigger(trigger) => Some(*trigger),
                _ => None,
            })
            .collect()
    }

    /// Last value written to `flag`.
    #[must_use]
    pub fn flag(&self, flag: PresentationFlag) -> Option<bool> {
        self.calls.iter().rev().find_map(|call| match call {
            SinkCall::Bool(f, value) if *f == flag => Some(*value),
            _ => None,
        })
    }
}

impl PresentationSink for RecordingSink {
    fn set_bool(&mut self, flag: PresentationFlag, value: bool) {
        self.calls.push(SinkCall::Bool(flag, value));
    }

    fn set_trigger(&mut self, trigger: AnimationTrigger) {
        self.calls.push(SinkCall::Trigger(trigger));
    }

    fn set_float(&mut self, parameter: AnimationFloat, value: f32) {
        self.calls.push(SinkCall::Float(parameter, value));
    }

    fn play_clip(&mut self, source: AudioSource, clip: &str, volume: f32) {
        self.calls.push(SinkCall::Play(source, clip.to_owned(), volume));
    }

    fn stop_audio(&mut self, source: AudioSource) {
        self.calls.push(SinkCall::Stop(source));
    }

    fn transmit_audio(&mut self, clip: &str, volume: f32) {
        self.calls.push(SinkCall::Transmit(clip.to_owned(), volume));
    }

    fn set_loot_physics(&mut self, loot: LootId, enabled: bool) {
        self.calls.push(SinkCall::LootPhysics(loot, enabled));
    }

    fn reparent_loot(&mut self, loot: LootId, parent: LootParent) {
        self.calls.push(SinkCall::Reparent(loot, parent));
    }
}
