//! # Loot Object Lifecycle
//!
//! ```text
//!            detach (drop animation)
//!  Attached ─────────────────────────> Free
//!     │      force_detach (grab/equip/bag/owner gone)  ▲
//!     └────────────────────────────────────────────────┘
//! ```
//!
//! While attached the object rides on its owner's placeholder and nothing
//! can interact with it. Free objects belong to the world pool and never
//! look at the owner again.

use crate::error::LootResult;
use crate::save::SaveToken;
use rand::Rng;
use shisha_shared::{AgentId, LootId, LootTier, NetObjectId, Transform};

/// Fall-time draw range applied when an object becomes free (seconds).
pub const FALL_TIME_RANGE: (f32, f32) = (0.9, 1.1);

/// Attachment state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attachment {
    /// Riding on the owner's placeholder.
    Attached {
        /// Owning agent.
        owner: AgentId,
    },
    /// A general world object.
    Free,
}

/// Transform parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parent {
    /// The owning agent's placeholder.
    Placeholder(AgentId),
    /// The world object pool.
    WorldPool,
}

/// Why an object left `Attached`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetachCause {
    /// Owner's drop animation finished.
    Dropped,
    /// A player grabbed it.
    Grabbed,
    /// A player equipped it.
    Equipped,
    /// A player bagged it.
    Bagged,
    /// The owner died or despawned.
    OwnerGone,
}

/// One spawned loot object.
#[derive(Clone, Debug)]
pub struct LootObject {
    id: LootId,
    object: NetObjectId,
    tier: LootTier,
    value: u32,
    attachment: Attachment,
    parent: Parent,
    transform: Transform,
    physics_enabled: bool,
    grabbable: bool,
    grabbable_by_agents: bool,
    fall_time: f32,
}

impl LootObject {
    /// Spawns on an owner's placeholder.
    #[must_use]
    pub fn spawn_attached(
        id: LootId,
        object: NetObjectId,
        owner: AgentId,
        placeholder: Transform,
        tier: LootTier,
        value: u32,
    ) -> Self {
        Self {
            id,
            object,
            tier,
            value,
            attachment: Attachment::Attached { owner },
            parent: Parent::Placeholder(owner),
            transform: placeholder,
            physics_enabled: false,
            grabbable: false,
            grabbable_by_agents: false,
            fall_time: 0.0,
        }
    }

    /// Spawns directly into the world (death burst).
    pub fn spawn_free<R: Rng + ?Sized>(
        id: LootId,
        object: NetObjectId,
        tier: LootTier,
        value: u32,
        transform: Transform,
        rng: &mut R,
    ) -> Self {
        let mut loot = Self {
            id,
            object,
            tier,
            value,
            attachment: Attachment::Free,
            parent: Parent::WorldPool,
            transform,
            physics_enabled: false,
            grabbable: false,
            grabbable_by_agents: false,
            fall_time: 0.0,
        };
        loot.enter_free(rng);
        loot
    }

    /// Rebuilds a free object from save data. No roll happens.
    ///
    /// # Errors
    ///
    /// Whatever [`SaveToken::decode`] rejects.
    pub fn restore<R: Rng + ?Sized>(
        id: LootId,
        object: NetObjectId,
        token: SaveToken,
        transform: Transform,
        rng: &mut R,
    ) -> LootResult<Self> {
        let (tier, value) = token.decode()?;
        Ok(Self::spawn_free(id, object, tier, value, transform, rng))
    }

    fn enter_free<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.attachment = Attachment::Free;
        self.parent = Parent::WorldPool;
        self.physics_enabled = true;
        self.grabbable = true;
        self.grabbable_by_agents = true;
        self.fall_time = rng.gen_range(FALL_TIME_RANGE.0..=FALL_TIME_RANGE.1);
    }

    /// Late-update step. While attached, copies `owner_placeholder` into
    /// the transform and returns `true`.
    pub fn late_update(&mut self, owner_placeholder: Option<Transform>) -> bool {
        match (self.attachment, owner_placeholder) {
            (Attachment::Attached { .. }, Some(placeholder)) => {
                self.transform = placeholder;
                true
            }
            _ => false,
        }
    }

    /// Authority-driven detach. No-op when already free.
    pub fn detach<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.force_detach(DetachCause::Dropped, rng)
    }

    /// Detach caused by an outside interaction. No-op when already free.
    pub fn force_detach<R: Rng + ?Sized>(&mut self, cause: DetachCause, rng: &mut R) -> bool {
        let Attachment::Attached { owner } = self.attachment else {
            return false;
        };
        self.enter_free(rng);
        tracing::debug!(
            "loot {} detached from {} ({:?}), fall time {:.2}s",
            self.id,
            owner,
            cause,
            self.fall_time
        );
        true
    }

    /// Save token for this object.
    ///
    /// # Errors
    ///
    /// Value too large for the token.
    pub fn save_token(&self) -> LootResult<SaveToken> {
        SaveToken::encode(self.tier, self.value)
    }

    /// Loot id.
    #[must_use]
    pub const fn id(&self) -> LootId {
        self.id
    }

    /// Network object.
    #[must_use]
    pub const fn object(&self) -> NetObjectId {
        self.object
    }

    /// Tier.
    #[must_use]
    pub const fn tier(&self) -> LootTier {
        self.tier
    }

    /// Value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Attachment state.
    #[must_use]
    pub const fn attachment(&self) -> Attachment {
        self.attachment
    }

    /// Owner while attached.
    #[must_use]
    pub const fn owner(&self) -> Option<AgentId> {
        match self.attachment {
            Attachment::Attached { owner } => Some(owner),
            Attachment::Free => None,
        }
    }

    /// True while attached.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        matches!(self.attachment, Attachment::Attached { .. })
    }

    /// Transform parent.
    #[must_use]
    pub const fn parent(&self) -> Parent {
        self.parent
    }

    /// Current transform.
    #[must_use]
    pub const fn transform(&self) -> Transform {
        self.transform
    }

    /// Physics simulation on.
    #[must_use]
    pub const fn physics_enabled(&self) -> bool {
        self.physics_enabled
    }

    /// Players may grab it.
    #[must_use]
    pub const fn grabbable(&self) -> bool {
        self.grabbable
    }

    /// Other agents may pick it up.
    #[must_use]
    pub const fn grabbable_by_agents(&self) -> bool {
        self.grabbable_by_agents
    }

    /// Fall time (seconds). Zero while attached.
    #[must_use]
    pub const fn fall_time(&self) -> f32 {
        self.fall_time
    }
}
