//! # Replication Messages
//!
//! Every frame on the channel:
//!
//! ```text
//! ┌────────────┬──────┬──────────────┬──────────────────────────┐
//! │ schema u8  │ kind │ len u32 (LE) │ payload (len bytes)      │
//! └────────────┴──────┴──────────────┴──────────────────────────┘
//! ```
//!
//! Payload fields are written in a fixed order. Ids travel as 16 raw
//! bytes, options as a presence byte followed by the value.

use super::wire::{WireReader, WireWriter};
use crate::error::{WireError, WireResult};
use shisha_shared::{
    ActorId, AgentId, AnimationTrigger, BehaviourState, LootId, LootTier, NetObjectId,
    PresentationFlag,
};

/// Current schema version.
pub const SCHEMA_VERSION: u8 = 1;

/// Bytes before the payload.
pub const FRAME_HEADER_LEN: usize = 6;

/// Frame kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum FrameKind {
    Variable = 0,
    Event = 1,
    Retire = 2,
    Request = 3,
}

impl FrameKind {
    const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Variable),
            1 => Some(Self::Event),
            2 => Some(Self::Retire),
            3 => Some(Self::Request),
            _ => None,
        }
    }
}

/// Which instance a persisted variable belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// An agent.
    Agent(AgentId),
    /// A loot object.
    Loot(LootId),
}

/// Persisted variable slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum VariableKey {
    /// Agent identity.
    Identity = 0,
    /// Loot identity.
    LootIdentity = 1,
    /// Agent behaviour state.
    BehaviourState = 2,
    /// Current aggressor or victim.
    TargetActor = 3,
    /// Death flag.
    Dead = 4,
    /// Loot quality tier.
    LootTier = 5,
    /// Loot value.
    LootValue = 6,
    /// Loot attached to its owner.
    LootAttached = 7,
    /// Agent object holding the loot.
    LootOwner = 8,
}

/// Value of one persisted variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistedValue {
    /// Agent identity, for late joiners that missed the sync event.
    Identity(AgentId),
    /// Loot identity.
    LootIdentity(LootId),
    /// Behaviour state.
    BehaviourState(BehaviourState),
    /// Aggressor or victim, if any.
    TargetActor(Option<ActorId>),
    /// Death flag.
    Dead(bool),
    /// Loot tier.
    LootTier(LootTier),
    /// Loot value.
    LootValue(u32),
    /// Loot attachment.
    LootAttached(bool),
    /// Network object of the agent holding the loot, `None` once free.
    LootOwner(Option<NetObjectId>),
}

impl PersistedValue {
    /// Slot this value lives in.
    #[must_use]
    pub const fn key(&self) -> VariableKey {
        match self {
            Self::Identity(_) => VariableKey::Identity,
            Self::LootIdentity(_) => VariableKey::LootIdentity,
            Self::BehaviourState(_) => VariableKey::BehaviourState,
            Self::TargetActor(_) => VariableKey::TargetActor,
            Self::Dead(_) => VariableKey::Dead,
            Self::LootTier(_) => VariableKey::LootTier,
            Self::LootValue(_) => VariableKey::LootValue,
            Self::LootAttached(_) => VariableKey::LootAttached,
            Self::LootOwner(_) => VariableKey::LootOwner,
        }
    }
}

/// One-shot events scoped to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentEvent {
    /// Announces the agent id. Followers adopt it.
    SyncIdentifier,
    /// Fire a named trigger.
    AnimationTrigger(AnimationTrigger),
    /// Set a named boolean.
    SetFlag {
        /// Flag.
        flag: PresentationFlag,
        /// New value.
        value: bool,
    },
    /// Play an ambient clip.
    PlayAmbientSfx {
        /// Index into the follower's ambient pool.
        clip_index: u16,
    },
    /// A loot object was spawned on the agent's placeholder.
    LootSpawned {
        /// Loot id.
        loot: LootId,
        /// Network object carrying the loot's variables.
        object: NetObjectId,
        /// Tier.
        tier: LootTier,
        /// Value.
        value: u32,
    },
    /// The attached loot object was dropped.
    LootDropped {
        /// Loot id.
        loot: LootId,
    },
    /// Death sequence started.
    EnterDeathState,
    /// Authority finished applying its config snapshot.
    ConfigInitialized,
}

/// Follower-to-authority requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upstream {
    /// A follower picked up an attached loot object.
    DetachLoot {
        /// Loot id.
        loot: LootId,
    },
}

/// Everything that crosses the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    /// Persisted variable change (or resync of one).
    Variable {
        /// Owning network object.
        object: NetObjectId,
        /// Instance the value belongs to.
        scope: Scope,
        /// Monotonic version.
        version: u64,
        /// New value.
        value: PersistedValue,
    },
    /// One-shot event.
    Event {
        /// Owning network object.
        object: NetObjectId,
        /// Agent the event is scoped to.
        agent: AgentId,
        /// Payload.
        event: AgentEvent,
    },
    /// Network object removed.
    Retire {
        /// Retired object.
        object: NetObjectId,
    },
    /// Follower request.
    Request {
        /// Target object.
        object: NetObjectId,
        /// Request payload.
        request: Upstream,
    },
}

impl Message {
    /// Network object this message concerns.
    #[must_use]
    pub const fn object(&self) -> NetObjectId {
        match self {
            Self::Variable { object, .. }
            | Self::Event { object, .. }
            | Self::Retire { object }
            | Self::Request { object, .. } => *object,
        }
    }

    /// Encodes into one complete frame.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = WireWriter::with_capacity(48);
        let kind = match self {
            Self::Variable {
                object,
                scope,
                version,
                value,
            } => {
                payload.write_u32(object.0);
                write_scope(&mut payload, *scope);
                payload.write_u64(*version);
                write_value(&mut payload, *value);
                FrameKind::Variable
            }
            Self::Event {
                object,
                agent,
                event,
            } => {
                payload.write_u32(object.0);
                payload.write_bytes(agent.as_bytes());
                write_event(&mut payload, *event);
                FrameKind::Event
            }
            Self::Retire { object } => {
                payload.write_u32(object.0);
                FrameKind::Retire
            }
            Self::Request { object, request } => {
                payload.write_u32(object.0);
                match request {
                    Upstream::DetachLoot { loot } => {
                        payload.write_u8(0);
                        payload.write_bytes(loot.as_bytes());
                    }
                }
                FrameKind::Request
            }
        };

        let payload = payload.into_bytes();
        let mut frame = WireWriter::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.write_u8(SCHEMA_VERSION);
        frame.write_u8(kind as u8);
        frame.write_u32(u32::try_from(payload.len()).unwrap_or(u32::MAX));
        frame.write_bytes(&payload);
        frame.into_bytes()
    }

    /// Decodes one complete frame.
    ///
    /// # Errors
    ///
    /// Any [`WireError`]; nothing is guessed.
    pub fn decode(frame: &[u8]) -> WireResult<Self> {
        let mut header = WireReader::new(frame);
        let schema = header.read_u8()?;
        if schema != SCHEMA_VERSION {
            return Err(WireError::UnsupportedSchema(schema));
        }
        let kind_byte = header.read_u8()?;
        let kind = FrameKind::from_u8(kind_byte).ok_or(WireError::UnknownKind(kind_byte))?;
        let declared = header.read_u32()?;
        let actual = header.remaining();
        if usize::try_from(declared).map_or(true, |d| d != actual) {
            return Err(WireError::LengthMismatch { declared, actual });
        }

        let mut r = WireReader::new(&frame[FRAME_HEADER_LEN..]);
        let object = NetObjectId(r.read_u32()?);
        let message = match kind {
            FrameKind::Variable => {
                let scope = read_scope(&mut r)?;
                let version = r.read_u64()?;
                let value = read_value(&mut r)?;
                Self::Variable {
                    object,
                    scope,
                    version,
                    value,
                }
            }
            FrameKind::Event => {
                let agent = AgentId::from_bytes(r.read_bytes16()?);
                let event = read_event(&mut r)?;
                Self::Event {
                    object,
                    agent,
                    event,
                }
            }
            FrameKind::Retire => Self::Retire { object },
            FrameKind::Request => {
                let tag = r.read_u8()?;
                let request = match tag {
                    0 => Upstream::DetachLoot {
                        loot: LootId::from_bytes(r.read_bytes16()?),
                    },
                    value => {
                        return Err(WireError::InvalidValue {
                            field: "request",
                            value,
                        })
                    }
                };
                Self::Request { object, request }
            }
        };
        r.finish()?;
        Ok(message)
    }
}

fn write_scope(w: &mut WireWriter, scope: Scope) {
    match scope {
        Scope::Agent(id) => {
            w.write_u8(0);
            w.write_bytes(id.as_bytes());
        }
        Scope::Loot(id) => {
            w.write_u8(1);
            w.write_bytes(id.as_bytes());
        }
    }
}

fn read_scope(r: &mut WireReader<'_>) -> WireResult<Scope> {
    match r.read_u8()? {
        0 => Ok(Scope::Agent(AgentId::from_bytes(r.read_bytes16()?))),
        1 => Ok(Scope::Loot(LootId::from_bytes(r.read_bytes16()?))),
        value => Err(WireError::InvalidValue {
            field: "scope",
            value,
        }),
    }
}

fn write_value(w: &mut WireWriter, value: PersistedValue) {
    w.write_u8(value.key() as u8);
    match value {
        PersistedValue::Identity(id) => w.write_bytes(id.as_bytes()),
        PersistedValue::LootIdentity(id) => w.write_bytes(id.as_bytes()),
        PersistedValue::BehaviourState(state) => w.write_u8(state.as_u8()),
        PersistedValue::TargetActor(actor) => match actor {
            Some(actor) => {
                w.write_u8(1);
                w.write_u64(actor.0);
            }
            None => w.write_u8(0),
        },
        PersistedValue::Dead(flag) | PersistedValue::LootAttached(flag) => w.write_bool(flag),
        PersistedValue::LootTier(tier) => w.write_u8(tier.index()),
        PersistedValue::LootValue(v) => w.write_u32(v),
        PersistedValue::LootOwner(owner) => match owner {
            Some(object) => {
                w.write_u8(1);
                w.write_u32(object.0);
            }
            None => w.write_u8(0),
        },
    }
}

fn read_value(r: &mut WireReader<'_>) -> WireResult<PersistedValue> {
    let key = r.read_u8()?;
    let value = match key {
        0 => PersistedValue::Identity(AgentId::from_bytes(r.read_bytes16()?)),
        1 => PersistedValue::LootIdentity(LootId::from_bytes(r.read_bytes16()?)),
        2 => {
            let byte = r.read_u8()?;
            PersistedValue::BehaviourState(BehaviourState::from_u8(byte).ok_or(
                WireError::InvalidValue {
                    field: "behaviour_state",
                    value: byte,
                },
            )?)
        }
        3 => {
            let present = r.read_bool("target_actor")?;
            PersistedValue::TargetActor(if present {
                Some(ActorId(r.read_u64()?))
            } else {
                None
            })
        }
        4 => PersistedValue::Dead(r.read_bool("dead")?),
        5 => {
            let byte = r.read_u8()?;
            PersistedValue::LootTier(LootTier::from_u8(byte).ok_or(WireError::InvalidValue {
                field: "loot_tier",
                value: byte,
            })?)
        }
        6 => PersistedValue::LootValue(r.read_u32()?),
        7 => PersistedValue::LootAttached(r.read_bool("loot_attached")?),
        8 => {
            let present = r.read_bool("loot_owner")?;
            PersistedValue::LootOwner(if present {
                Some(NetObjectId(r.read_u32()?))
            } else {
                None
            })
        }
        value => {
            return Err(WireError::InvalidValue {
                field: "variable_key",
                value,
            })
        }
    };
    Ok(value)
}

fn write_event(w: &mut WireWriter, event: AgentEvent) {
    match event {
        AgentEvent::SyncIdentifier => w.write_u8(0),
        AgentEvent::AnimationTrigger(trigger) => {
            w.write_u8(1);
            w.write_u8(trigger.as_u8());
        }
        AgentEvent::SetFlag { flag, value } => {
            w.write_u8(2);
            w.write_u8(flag.as_u8());
            w.write_bool(value);
        }
        AgentEvent::PlayAmbientSfx { clip_index } => {
            w.write_u8(3);
            w.write_u16(clip_index);
        }
        AgentEvent::LootSpawned {
            loot,
            object,
            tier,
            value,
        } => {
            w.write_u8(4);
            w.write_bytes(loot.as_bytes());
            w.write_u32(object.0);
            w.write_u8(tier.index());
            w.write_u32(value);
        }
        AgentEvent::LootDropped { loot } => {
            w.write_u8(5);
            w.write_bytes(loot.as_bytes());
        }
        AgentEvent::EnterDeathState => w.write_u8(6),
        AgentEvent::ConfigInitialized => w.write_u8(7),
    }
}

fn read_event(r: &mut WireReader<'_>) -> WireResult<AgentEvent> {
    let tag = r.read_u8()?;
    let event = match tag {
        0 => AgentEvent::SyncIdentifier,
        1 => {
            let byte = r.read_u8()?;
            AgentEvent::AnimationTrigger(AnimationTrigger::from_u8(byte).ok_or(
                WireError::InvalidValue {
                    field: "animation_trigger",
                    value: byte,
                },
            )?)
        }
        2 => {
            let byte = r.read_u8()?;
            let flag = PresentationFlag::from_u8(byte).ok_or(WireError::InvalidValue {
                field: "presentation_flag",
                value: byte,
            })?;
            AgentEvent::SetFlag {
                flag,
                value: r.read_bool("flag_value")?,
            }
        }
        3 => AgentEvent::PlayAmbientSfx {
            clip_index: r.read_u16()?,
        },
        4 => {
            let loot = LootId::from_bytes(r.read_bytes16()?);
            let object = NetObjectId(r.read_u32()?);
            let byte = r.read_u8()?;
            let tier = LootTier::from_u8(byte).ok_or(WireError::InvalidValue {
                field: "loot_tier",
                value: byte,
            })?;
            AgentEvent::LootSpawned {
                loot,
                object,
                tier,
                value: r.read_u32()?,
            }
        }
        5 => AgentEvent::LootDropped {
            loot: LootId::from_bytes(r.read_bytes16()?),
        },
        6 => AgentEvent::EnterDeathState,
        7 => AgentEvent::ConfigInitialized,
        value => {
            return Err(WireError::InvalidValue {
                field: "event",
                value,
            })
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentId {
        AgentId::from_random_bytes([3u8; 16])
    }

    #[test]
    fn test_variable_frame_layout() {
        let frame = Message::Variable {
            object: NetObjectId(9),
            scope: Scope::Agent(agent()),
            version: 5,
            value: PersistedValue::BehaviourState(BehaviourState::Idle),
        }
        .encode();

        assert_eq!(frame[0], SCHEMA_VERSION);
        assert_eq!(frame[1], 0);
        let declared = u32::from_le_bytes([frame[2], frame[3], frame[4], frame[5]]) as usize;
        assert_eq!(declared, frame.len() - FRAME_HEADER_LEN);
    }

    #[test]
    fn test_loot_spawn_event_decodes() {
        let msg = Message::Event {
            object: NetObjectId(1),
            agent: agent(),
            event: AgentEvent::LootSpawned {
                loot: LootId::from_random_bytes([8u8; 16]),
                object: NetObjectId(2),
                tier: LootTier::Rare,
                value: 91,
            },
        };
        assert_eq!(Message::decode(&msg.encode()), Ok(msg));
    }

    #[test]
    fn test_absent_target_actor_decodes() {
        let msg = Message::Variable {
            object: NetObjectId(4),
            scope: Scope::Agent(agent()),
            version: 1,
            value: PersistedValue::TargetActor(None),
        };
        assert_eq!(Message::decode(&msg.encode()), Ok(msg));
    }

    #[test]
    fn test_loot_owner_presence_byte() {
        let loot = LootId::from_random_bytes([6u8; 16]);
        let held = Message::Variable {
            object: NetObjectId(3),
            scope: Scope::Loot(loot),
            version: 7,
            value: PersistedValue::LootOwner(Some(NetObjectId(1))),
        };
        let freed = Message::Variable {
            object: NetObjectId(3),
            scope: Scope::Loot(loot),
            version: 8,
            value: PersistedValue::LootOwner(None),
        };
        let held_frame = held.encode();
        assert_eq!(held_frame.len(), freed.encode().len() + 4);
        assert_eq!(Message::decode(&held_frame), Ok(held));
        assert_eq!(Message::decode(&freed.encode()), Ok(freed));
    }

    #[test]
    fn test_unknown_schema_rejected() {
        let mut frame = Message::Retire {
            object: NetObjectId(1),
        }
        .encode();
        frame[0] = 2;
        assert_eq!(Message::decode(&frame), Err(WireError::UnsupportedSchema(2)));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut frame = Message::Retire {
            object: NetObjectId(1),
        }
        .encode();
        frame.push(0);
        assert!(matches!(
            Message::decode(&frame),
            Err(WireError::LengthMismatch { declared: 4, actual: 5 })
        ));
    }

    #[test]
    fn test_bad_state_byte_rejected() {
        let mut frame = Message::Variable {
            object: NetObjectId(1),
            scope: Scope::Agent(agent()),
            version: 1,
            value: PersistedValue::BehaviourState(BehaviourState::Dead),
        }
        .encode();
        let last = frame.len() - 1;
        frame[last] = 9;
        assert_eq!(
            Message::decode(&frame),
            Err(WireError::InvalidValue {
                field: "behaviour_state",
                value: 9
            })
        );
    }

    #[test]
    fn test_truncated_header_rejected() {
        assert!(matches!(
            Message::decode(&[SCHEMA_VERSION]),
            Err(WireError::Truncated { .. })
        ));
    }
}
