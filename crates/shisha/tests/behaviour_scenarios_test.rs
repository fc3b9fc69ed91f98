//! # Behaviour Scenarios
//!
//! Drives a full `AgentHost` through hits, deaths and day end.

use shisha::authority::ActorDirectory;
use shisha::{ActorRoster, AgentHost, ConfigSnapshot, HitOutcome, SpawnParams};
use shisha_core::{Aabb, NavOracle, NavPath, ObstacleField};
use shisha_networking::{AgentEvent, Message, PersistedValue, ReplicationHub};
use shisha_shared::{ActorId, AgentId, BehaviourState, LootTier, NetObjectId, Vec3};
use std::sync::Arc;

const PLAYER: ActorId = ActorId(1);
const DT: f32 = 0.1;

/// Oracle for a world with no navigable surface at all.
struct NoNavmesh;

impl NavOracle for NoNavmesh {
    fn compute_path(&self, _from: Vec3, _to: Vec3) -> Option<NavPath> {
        None
    }

    fn linecast_blocked(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }

    fn nearest_navigable(&self, _point: Vec3, _max_distance: f32) -> Option<Vec3> {
        None
    }
}

fn open_field() -> ObstacleField {
    ObstacleField::new(Aabb::new(
        Vec3::new(-100.0, 0.0, -100.0),
        Vec3::new(100.0, 0.0, 100.0),
    ))
}

struct World {
    hub: ReplicationHub,
    roster: Arc<ActorRoster>,
    host: AgentHost,
}

fn world_with(config: &ConfigSnapshot, oracle: Arc<dyn NavOracle + Send + Sync>) -> World {
    let nodes = open_field().grid_nodes(10.0);
    let roster = Arc::new(ActorRoster::new(30.0));
    roster.upsert(PLAYER, Vec3::new(2.0, 0.0, 0.0));
    let directory: Arc<dyn ActorDirectory + Send + Sync> = roster.clone();

    let hub = ReplicationHub::new();
    let mut host = AgentHost::new(config, oracle, directory, nodes, 42);
    host.attach_channel(&hub).unwrap();
    World { hub, roster, host }
}

fn world(config: &ConfigSnapshot) -> World {
    world_with(config, Arc::new(open_field()))
}

fn run_for(host: &mut AgentHost, ticks: u32) {
    for _ in 0..ticks {
        host.tick(DT);
    }
}

fn spawn(host: &mut AgentHost, health: i32) -> AgentId {
    host.spawn(
        Vec3::ZERO,
        SpawnParams {
            health: Some(health),
            killable: None,
        },
    )
    .unwrap()
}

#[test]
fn test_two_hits_leave_agent_fleeing_with_two_health() {
    let mut w = world(&ConfigSnapshot::default());
    let id = spawn(&mut w.host, 10);

    assert_eq!(w.host.hit(id, 4, Some(PLAYER)), Some(HitOutcome::Fleeing));
    assert_eq!(w.host.agent(id).unwrap().state(), BehaviourState::RunningAway);
    assert_eq!(w.host.agent(id).unwrap().target_actor(), Some(PLAYER));

    run_for(&mut w.host, 1);
    assert_eq!(w.host.hit(id, 4, Some(PLAYER)), Some(HitOutcome::Fleeing));

    let agent = w.host.agent(id).unwrap();
    assert_eq!(agent.health(), 2);
    assert_eq!(agent.state(), BehaviourState::RunningAway);
    assert_eq!(agent.entries(BehaviourState::RunningAway), 1);
    assert!(agent.flee_target().is_some());
}

#[test]
fn test_invalid_oracle_never_runs_away() {
    let mut w = world_with(&ConfigSnapshot::default(), Arc::new(NoNavmesh));
    let id = spawn(&mut w.host, 50);

    for _ in 0..10 {
        let outcome = w.host.hit(id, 1, Some(PLAYER));
        assert_eq!(outcome, Some(HitOutcome::NoEscape));
        run_for(&mut w.host, 1);
    }

    let agent = w.host.agent(id).unwrap();
    assert_eq!(agent.health(), 40);
    assert_eq!(agent.state(), BehaviourState::Roaming);
    assert_eq!(agent.entries(BehaviourState::RunningAway), 0);
    assert_eq!(agent.target_actor(), None);
}

#[test]
fn test_hits_inside_cooldown_are_ignored() {
    let mut w = world(&ConfigSnapshot::default());
    let id = spawn(&mut w.host, 10);

    assert_eq!(w.host.hit(id, 1, Some(PLAYER)), Some(HitOutcome::Fleeing));
    assert_eq!(w.host.hit(id, 1, Some(PLAYER)), Some(HitOutcome::IgnoredCooldown));
    assert_eq!(w.host.agent(id).unwrap().health(), 9);

    w.host.tick(0.05);
    assert_eq!(w.host.hit(id, 1, Some(PLAYER)), Some(HitOutcome::Fleeing));
    assert_eq!(w.host.agent(id).unwrap().health(), 8);
}

#[test]
fn test_non_killable_agent_floors_at_one() {
    let mut w = world(&ConfigSnapshot::default());
    let id = w
        .host
        .spawn(
            Vec3::ZERO,
            SpawnParams {
                health: Some(2),
                killable: Some(false),
            },
        )
        .unwrap();

    assert_eq!(w.host.hit(id, 50, Some(PLAYER)), Some(HitOutcome::Fleeing));
    assert_eq!(w.host.agent(id).unwrap().health(), 1);

    run_for(&mut w.host, 1);
    assert_eq!(w.host.hit(id, 50, Some(PLAYER)), Some(HitOutcome::IgnoredAtFloor));

    let agent = w.host.agent(id).unwrap();
    assert_eq!(agent.health(), 1);
    assert_ne!(agent.state(), BehaviourState::Dead);
}

#[test]
fn test_dead_agent_absorbs_hits_and_despawns_after_loot_burst() {
    let mut w = world(&ConfigSnapshot::default());
    let id = spawn(&mut w.host, 3);

    assert_eq!(w.host.hit(id, 100, Some(PLAYER)), Some(HitOutcome::Killed));
    run_for(&mut w.host, 1);
    assert_eq!(w.host.hit(id, 100, Some(PLAYER)), Some(HitOutcome::IgnoredDead));
    assert!(!w.host.idle_complete(id));
    assert_eq!(w.host.agent(id).unwrap().entries(BehaviourState::Dead), 1);

    // Settle delay is 1.1 s.
    run_for(&mut w.host, 12);
    let mut tiers: Vec<LootTier> = w.host.loot_objects().map(|loot| loot.tier()).collect();
    tiers.sort();
    assert_eq!(tiers, LootTier::ALL.to_vec());
    assert!(w.host.loot_objects().all(|loot| !loot.is_attached()));
    assert!(w.host.agent(id).is_some());

    // Despawn 0.5 s after the burst.
    run_for(&mut w.host, 6);
    assert!(w.host.agent(id).is_none());
    assert!(w.host.is_empty());
    assert_eq!(w.host.pending_tasks(), 0);
}

#[test]
fn test_drop_loot_frees_attached_loot() {
    let mut config = ConfigSnapshot::default();
    config.movement.wander_time_min = 0.25;
    config.movement.wander_time_max = 0.25;
    config.idle.loot_chance = 1.0;
    let mut w = world(&config);
    let follower = w.hub.join().unwrap();
    let id = spawn(&mut w.host, 3);
    w.host.tick(0.25);

    let agent = w.host.agent(id).unwrap();
    assert_eq!(agent.state(), BehaviourState::Idle);
    let object = agent.object();
    let loot = agent.attached_loot().unwrap();
    let loot_object = w.host.loot(loot).unwrap().object();
    let _ = follower.receive();

    assert!(w.host.drop_loot(id));
    assert!(!w.host.loot(loot).unwrap().is_attached());
    assert_eq!(w.host.agent(id).unwrap().attached_loot(), None);
    assert!(!w.host.drop_loot(id));

    let messages: Vec<Message> = follower.receive().into_iter().map(Result::unwrap).collect();
    let variables: Vec<(NetObjectId, PersistedValue)> = messages
        .iter()
        .filter_map(|msg| match msg {
            Message::Variable { object, value, .. } => Some((*object, *value)),
            _ => None,
        })
        .collect();
    assert_eq!(
        variables,
        vec![
            (loot_object, PersistedValue::LootAttached(false)),
            (loot_object, PersistedValue::LootOwner(None)),
        ]
    );
    assert_eq!(
        messages.last(),
        Some(&Message::Event {
            object,
            agent: id,
            event: AgentEvent::LootDropped { loot },
        })
    );

    // Back in Idle, the animation callback resumes roaming.
    assert!(w.host.idle_complete(id));
    assert_eq!(w.host.agent(id).unwrap().state(), BehaviourState::Roaming);
}

#[test]
fn test_ambient_sfx_follows_configured_cadence() {
    let mut config = ConfigSnapshot::default();
    config.audio.ambient_time_min = 1.0;
    config.audio.ambient_time_max = 1.0;
    let w = world(&config);
    let mut host = w.host;
    let follower = w.hub.join().unwrap();
    spawn(&mut host, 3);

    for _ in 0..10 {
        host.tick(0.25);
    }

    let plays = follower
        .receive()
        .into_iter()
        .filter(|msg| {
            matches!(
                msg,
                Ok(Message::Event {
                    event: AgentEvent::PlayAmbientSfx { .. },
                    ..
                })
            )
        })
        .count();
    assert_eq!(plays, 2);
}

#[test]
fn test_day_end_departure_waits_until_unseen() {
    let mut config = ConfigSnapshot::default();
    config.movement.wander_enabled = false;
    let mut w = world(&config);
    let near = spawn(&mut w.host, 3);
    let far = w
        .host
        .spawn(Vec3::new(80.0, 0.0, 80.0), SpawnParams::default())
        .unwrap();

    assert!(w.host.begin_day_end());
    assert!(!w.host.begin_day_end());
    run_for(&mut w.host, 11);
    assert!(w.host.agent(far).is_none());
    assert!(w.host.agent(near).is_some());

    w.roster.remove(PLAYER);
    run_for(&mut w.host, 11);
    assert!(w.host.is_empty());
    assert_eq!(w.host.pending_tasks(), 0);
}

#[test]
fn test_departure_disabled_keeps_agents() {
    let mut config = ConfigSnapshot::default();
    config.movement.leave_at_day_end = false;
    let mut w = world(&config);
    spawn(&mut w.host, 3);

    assert!(!w.host.begin_day_end());
    w.roster.remove(PLAYER);
    run_for(&mut w.host, 20);
    assert_eq!(w.host.len(), 1);
}
