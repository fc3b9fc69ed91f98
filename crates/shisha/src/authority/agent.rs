//! # Agent Model
//!
//! Everything the authority tracks for one spawned agent. Only the behaviour
//! machine and the host mutate it; the rest of the world reads through the
//! getters.

use super::navigation::NavigationHandle;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shisha_shared::{ActorId, AgentId, BehaviourState, LootId, NetObjectId, Transform, Vec3};

/// Offset of the loot placeholder from the agent's origin.
pub const LOOT_PLACEHOLDER_OFFSET: Vec3 = Vec3::new(0.0, 0.35, -0.45);

/// One live agent.
pub struct Agent {
    pub(crate) id: AgentId,
    pub(crate) object: NetObjectId,
    pub(crate) state: BehaviourState,
    pub(crate) previous_state: BehaviourState,
    pub(crate) entries: [u32; 4],
    pub(crate) health: i32,
    pub(crate) killable: bool,
    pub(crate) target_actor: Option<ActorId>,
    pub(crate) nav: Box<dyn NavigationHandle>,
    pub(crate) spawn_position: Vec3,
    pub(crate) wander_anchor: Vec3,
    pub(crate) wander_destination: Option<Vec3>,
    pub(crate) idle_position: Vec3,
    pub(crate) flee_target: Option<Vec3>,
    pub(crate) wander_timer: f32,
    pub(crate) ambient_timer: f32,
    pub(crate) hit_cooldown: f32,
    pub(crate) target_speed: f32,
    pub(crate) target_acceleration: f32,
    pub(crate) attached_loot: Option<LootId>,
    pub(crate) rng: ChaCha8Rng,
}

impl Agent {
    /// Builds an agent in its pre-entry state. The host runs the first
    /// state entry right after.
    pub(crate) fn new(
        id: AgentId,
        object: NetObjectId,
        world_seed: u64,
        health: i32,
        killable: bool,
        nav: Box<dyn NavigationHandle>,
    ) -> Self {
        let position = nav.position();
        Self {
            id,
            object,
            state: BehaviourState::Roaming,
            previous_state: BehaviourState::Roaming,
            entries: [0; 4],
            health,
            killable,
            target_actor: None,
            nav,
            spawn_position: position,
            wander_anchor: position,
            wander_destination: None,
            idle_position: position,
            flee_target: None,
            wander_timer: 0.0,
            ambient_timer: 0.0,
            hit_cooldown: 0.0,
            target_speed: 0.0,
            target_acceleration: 0.0,
            attached_loot: None,
            rng: agent_rng(world_seed, id),
        }
    }

    /// Agent id.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Network object carrying this agent's variables.
    #[must_use]
    pub const fn object(&self) -> NetObjectId {
        self.object
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BehaviourState {
        self.state
    }

    /// State before the last transition.
    #[must_use]
    pub const fn previous_state(&self) -> BehaviourState {
        self.previous_state
    }

    /// How many times `state` has been entered, the initial entry included.
    #[must_use]
    pub const fn entries(&self, state: BehaviourState) -> u32 {
        self.entries[state.as_u8() as usize]
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Whether damage can kill this agent.
    #[must_use]
    pub const fn is_killable(&self) -> bool {
        self.killable
    }

    /// Aggressor currently being fled from.
    #[must_use]
    pub const fn target_actor(&self) -> Option<ActorId> {
        self.target_actor
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.nav.position()
    }

    /// Spawn position.
    #[must_use]
    pub const fn spawn_position(&self) -> Vec3 {
        self.spawn_position
    }

    /// Flee destination while running away.
    #[must_use]
    pub const fn flee_target(&self) -> Option<Vec3> {
        self.flee_target
    }

    /// Loot currently riding on the placeholder.
    #[must_use]
    pub const fn attached_loot(&self) -> Option<LootId> {
        self.attached_loot
    }

    /// Read access to the mover.
    #[must_use]
    pub fn navigation(&self) -> &dyn NavigationHandle {
        self.nav.as_ref()
    }

    /// World transform of the loot placeholder.
    #[must_use]
    pub fn placeholder(&self) -> Transform {
        Transform::at(self.nav.position() + LOOT_PLACEHOLDER_OFFSET)
    }
}

/// Seeds an agent's stream from the world seed and its id.
fn agent_rng(world_seed: u64, id: AgentId) -> ChaCha8Rng {
    let mut seed = [0u8; 32];
    seed[..8].copy_from_slice(&world_seed.to_le_bytes());
    seed[8..24].copy_from_slice(id.as_bytes());
    ChaCha8Rng::from_seed(seed)
}
