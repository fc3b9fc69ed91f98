//! # Replication Hub
//!
//! In-process carrier for the replication channel.
//!
//! ## Architecture
//!
//! ```text
//!                         ┌───────────────────────────┐
//!  ReplicationAuthority ──>│ HubState (RwLock)        │
//!   write() / fire()       │  objects: persisted store │──frames──> FollowerLink (queue)
//!   retire_object()        │  followers: senders       │──frames──> FollowerLink (queue)
//!                          └───────────────────────────┘
//!  drain_requests() <────────── requests channel <────────── send_request()
//! ```
//!
//! Variables are stored with their version so a follower joining late can
//! ask for a resync. Events are only ever pushed to followers connected at
//! the moment they fire.

use crate::error::{ReplicationError, ReplicationResult};
use crate::protocol::{AgentEvent, Message, PersistedValue, Scope, Upstream, VariableKey};
use crate::WireError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use shisha_shared::{AgentId, NetObjectId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identifies one follower connection on a hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FollowerId(pub u64);

#[derive(Clone, Copy, Debug)]
struct StoredVariable {
    scope: Scope,
    version: u64,
    value: PersistedValue,
}

struct FollowerSlot {
    id: FollowerId,
    sender: Sender<Vec<u8>>,
}

struct HubState {
    open: bool,
    next_object: u32,
    next_follower: u64,
    version: u64,
    objects: BTreeMap<NetObjectId, BTreeMap<VariableKey, StoredVariable>>,
    followers: Vec<FollowerSlot>,
}

impl HubState {
    /// Pushes a frame to every follower, pruning disconnected ones.
    fn broadcast(&mut self, frame: &[u8]) {
        self.followers.retain(|f| {
            let delivered = f.sender.send(frame.to_vec()).is_ok();
            if !delivered {
                tracing::debug!("pruning disconnected follower {}", f.id.0);
            }
            delivered
        });
    }
}

struct Shared {
    state: RwLock<HubState>,
    authority_taken: AtomicBool,
    requests_tx: Sender<Vec<u8>>,
    requests_rx: Receiver<Vec<u8>>,
}

/// Shared handle to one replication channel.
///
/// Cloning is cheap; every clone refers to the same channel.
#[derive(Clone)]
pub struct ReplicationHub {
    shared: Arc<Shared>,
}

impl ReplicationHub {
    /// Creates an open hub with no objects and no followers.
    #[must_use]
    pub fn new() -> Self {
        let (requests_tx, requests_rx) = unbounded();
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(HubState {
                    open: true,
                    next_object: 1,
                    next_follower: 1,
                    version: 0,
                    objects: BTreeMap::new(),
                    followers: Vec::new(),
                }),
                authority_taken: AtomicBool::new(false),
                requests_tx,
                requests_rx,
            }),
        }
    }

    /// Takes the single writer handle.
    ///
    /// # Errors
    ///
    /// [`ReplicationError::AuthorityTaken`] on the second call,
    /// [`ReplicationError::HubClosed`] after [`Self::close`].
    pub fn authority(&self) -> ReplicationResult<ReplicationAuthority> {
        if !self.is_open() {
            return Err(ReplicationError::HubClosed);
        }
        if self.shared.authority_taken.swap(true, Ordering::AcqRel) {
            return Err(ReplicationError::AuthorityTaken);
        }
        Ok(ReplicationAuthority {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Connects a new follower. It receives everything written or fired
    /// from now on; call [`FollowerLink::request_resync`] for the past.
    ///
    /// # Errors
    ///
    /// [`ReplicationError::HubClosed`].
    pub fn join(&self) -> ReplicationResult<FollowerLink> {
        let mut state = self.shared.state.write();
        if !state.open {
            return Err(ReplicationError::HubClosed);
        }
        let id = FollowerId(state.next_follower);
        state.next_follower += 1;

        // Unbounded: a dropped variable frame would break convergence.
        let (sender, receiver) = unbounded();
        state.followers.push(FollowerSlot {
            id,
            sender: sender.clone(),
        });
        tracing::info!("follower {} joined ({} connected)", id.0, state.followers.len());

        Ok(FollowerLink {
            id,
            shared: Arc::clone(&self.shared),
            sender,
            receiver,
        })
    }

    /// Shuts the channel down. Followers see their queues disconnect.
    pub fn close(&self) {
        let mut state = self.shared.state.write();
        state.open = false;
        state.followers.clear();
        state.objects.clear();
        tracing::info!("replication hub closed");
    }

    /// True until [`Self::close`].
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.state.read().open
    }

    /// Connected followers.
    #[must_use]
    pub fn follower_count(&self) -> usize {
        self.shared.state.read().followers.len()
    }
}

impl Default for ReplicationHub {
    fn default() -> Self {
        Self::new()
    }
}

/// The only handle allowed to mutate replicated state.
pub struct ReplicationAuthority {
    shared: Arc<Shared>,
}

impl ReplicationAuthority {
    /// True while the hub is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.state.read().open
    }

    /// Allocates a network object slot.
    ///
    /// # Errors
    ///
    /// [`ReplicationError::HubClosed`].
    pub fn register_object(&self) -> ReplicationResult<NetObjectId> {
        let mut state = self.shared.state.write();
        if !state.open {
            return Err(ReplicationError::HubClosed);
        }
        let object = NetObjectId(state.next_object);
        state.next_object += 1;
        state.objects.insert(object, BTreeMap::new());
        Ok(object)
    }

    /// Drops an object's persisted values and tells followers.
    ///
    /// # Errors
    ///
    /// Closed hub or unknown object.
    pub fn retire_object(&self, object: NetObjectId) -> ReplicationResult<()> {
        let mut state = self.shared.state.write();
        if !state.open {
            return Err(ReplicationError::HubClosed);
        }
        if state.objects.remove(&object).is_none() {
            return Err(ReplicationError::UnknownObject(object));
        }
        state.broadcast(&Message::Retire { object }.encode());
        Ok(())
    }

    /// Writes a persisted variable and notifies every follower. Returns the
    /// new version.
    ///
    /// # Errors
    ///
    /// Closed hub or unknown object.
    pub fn write(
        &self,
        object: NetObjectId,
        scope: Scope,
        value: PersistedValue,
    ) -> ReplicationResult<u64> {
        let mut state = self.shared.state.write();
        if !state.open {
            return Err(ReplicationError::HubClosed);
        }
        let version = state.version + 1;
        let slot = state
            .objects
            .get_mut(&object)
            .ok_or(ReplicationError::UnknownObject(object))?;
        slot.insert(
            value.key(),
            StoredVariable {
                scope,
                version,
                value,
            },
        );
        state.version = version;

        state.broadcast(
            &Message::Variable {
                object,
                scope,
                version,
                value,
            }
            .encode(),
        );
        Ok(version)
    }

    /// Fires a one-shot event to the followers connected right now.
    ///
    /// # Errors
    ///
    /// Closed hub or unknown object.
    pub fn fire(
        &self,
        object: NetObjectId,
        agent: AgentId,
        event: AgentEvent,
    ) -> ReplicationResult<()> {
        let mut state = self.shared.state.write();
        if !state.open {
            return Err(ReplicationError::HubClosed);
        }
        if !state.objects.contains_key(&object) {
            return Err(ReplicationError::UnknownObject(object));
        }
        state.broadcast(
            &Message::Event {
                object,
                agent,
                event,
            }
            .encode(),
        );
        Ok(())
    }

    /// Authority-side current value of a variable.
    #[must_use]
    pub fn read(&self, object: NetObjectId, key: VariableKey) -> Option<PersistedValue> {
        self.shared
            .state
            .read()
            .objects
            .get(&object)
            .and_then(|vars| vars.get(&key))
            .map(|stored| stored.value)
    }

    /// Collects pending follower requests. Undecodable frames are logged
    /// and skipped.
    #[must_use]
    pub fn drain_requests(&self) -> Vec<(NetObjectId, Upstream)> {
        self.shared
            .requests_rx
            .try_iter()
            .filter_map(|frame| match Message::decode(&frame) {
                Ok(Message::Request { object, request }) => Some((object, request)),
                Ok(other) => {
                    tracing::warn!("ignoring non-request frame on request queue: {:?}", other);
                    None
                }
                Err(err) => {
                    tracing::warn!("dropping malformed request frame: {}", err);
                    None
                }
            })
            .collect()
    }
}

/// One follower's connection.
pub struct FollowerLink {
    id: FollowerId,
    shared: Arc<Shared>,
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
}

impl FollowerLink {
    /// Connection id.
    #[must_use]
    pub const fn id(&self) -> FollowerId {
        self.id
    }

    /// Queues the current value of every persisted variable behind
    /// whatever is already pending. Returns how many were queued.
    ///
    /// # Errors
    ///
    /// [`ReplicationError::HubClosed`].
    pub fn request_resync(&self) -> ReplicationResult<usize> {
        let state = self.shared.state.read();
        if !state.open {
            return Err(ReplicationError::HubClosed);
        }
        let mut queued = 0;
        for (object, vars) in &state.objects {
            for stored in vars.values() {
                let frame = Message::Variable {
                    object: *object,
                    scope: stored.scope,
                    version: stored.version,
                    value: stored.value,
                }
                .encode();
                if self.sender.send(frame).is_ok() {
                    queued += 1;
                }
            }
        }
        tracing::debug!("follower {} resync queued {} variables", self.id.0, queued);
        Ok(queued)
    }

    /// Sends a request upstream to the authority.
    ///
    /// # Errors
    ///
    /// [`ReplicationError::HubClosed`].
    pub fn send_request(&self, object: NetObjectId, request: Upstream) -> ReplicationResult<()> {
        if !self.shared.state.read().open {
            return Err(ReplicationError::HubClosed);
        }
        self.shared
            .requests_tx
            .send(Message::Request { object, request }.encode())
            .map_err(|_| ReplicationError::HubClosed)
    }

    /// Raw frames waiting in this follower's queue.
    #[must_use]
    pub fn drain_frames(&self) -> Vec<Vec<u8>> {
        self.receiver.try_iter().collect()
    }

    /// Decodes everything waiting in the queue, in arrival order.
    #[must_use]
    pub fn receive(&self) -> Vec<Result<Message, WireError>> {
        self.receiver
            .try_iter()
            .map(|frame| Message::decode(&frame))
            .collect()
    }

    /// Frames waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Drop for FollowerLink {
    fn drop(&mut self) {
        let id = self.id;
        self.shared.state.write().followers.retain(|f| f.id != id);
    }
}
