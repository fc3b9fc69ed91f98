//! # Shisha Simulation
//!
//! Headless run of one authority and two followers over an obstacle field.
//! The second follower joins late and catches up through resync.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=shisha=debug shisha_sim --seconds 60 --agents 4 --seed 7 --config shisha.toml
//! ```

use shisha::authority::ActorDirectory;
use shisha::{
    ActorRoster, AgentHost, ConfigSnapshot, FollowerSession, RecordingSink, SpawnParams, TickLoop,
};
use shisha_core::{Aabb, NavOracle, ObstacleField};
use shisha_networking::ReplicationHub;
use shisha_shared::{ActorId, AgentId, BehaviourState, Vec3};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const PLAYER: ActorId = ActorId(1);

struct SimOptions {
    seconds: u32,
    agents: u32,
    seed: u64,
    config: Option<PathBuf>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            seconds: 30,
            agents: 3,
            seed: 0x5155_4841,
            config: None,
        }
    }
}

fn parse_args() -> Option<SimOptions> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = SimOptions::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seconds" | "-s" => {
                if i + 1 < args.len() {
                    options.seconds = args[i + 1].parse().unwrap_or(options.seconds);
                    i += 1;
                }
            }
            "--agents" | "-a" => {
                if i + 1 < args.len() {
                    options.agents = args[i + 1].parse().unwrap_or(options.agents);
                    i += 1;
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    options.seed = args[i + 1].parse().unwrap_or(options.seed);
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    options.config = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: shisha_sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --seconds <SECS>   Simulated seconds (default: 30)");
                println!("  -a, --agents <NUM>     Agents to spawn (default: 3)");
                println!("      --seed <SEED>      World seed");
                println!("  -c, --config <PATH>    TOML config snapshot");
                println!("  -h, --help             Show this help");
                return None;
            }
            _ => {}
        }
        i += 1;
    }
    Some(options)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(options) = parse_args() else {
        return ExitCode::SUCCESS;
    };

    let config = match &options.config {
        Some(path) => match ConfigSnapshot::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!("failed to load {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        None => ConfigSnapshot::default(),
    };

    match run(&options, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("simulation aborted: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(options: &SimOptions, config: &ConfigSnapshot) -> Result<(), Box<dyn std::error::Error>> {
    let field = ObstacleField::new(Aabb::new(
        Vec3::new(-60.0, 0.0, -60.0),
        Vec3::new(60.0, 0.0, 60.0),
    ))
    .with_blocking(Aabb::around(Vec3::new(15.0, 0.0, 15.0), 4.0))
    .with_obstruction(Aabb::around(Vec3::new(-20.0, 0.0, 10.0), 3.0));
    let nodes = field.grid_nodes(6.0);
    let oracle: Arc<dyn NavOracle + Send + Sync> = Arc::new(field);

    let roster = Arc::new(ActorRoster::new(30.0));
    roster.upsert(PLAYER, Vec3::ZERO);
    let directory: Arc<dyn ActorDirectory + Send + Sync> = roster.clone();

    let hub = ReplicationHub::new();
    let mut host = AgentHost::new(
        config,
        Arc::clone(&oracle),
        Arc::clone(&directory),
        nodes,
        options.seed,
    );
    host.attach_channel(&hub)?;

    let mut followers: Vec<FollowerSession<RecordingSink>> = vec![FollowerSession::join(
        &hub,
        config,
        Arc::clone(&directory),
        options.seed,
    )?];

    let mut spawned: Vec<AgentId> = Vec::new();
    for n in 0..options.agents {
        #[allow(clippy::cast_precision_loss)]
        let offset = n as f32 * 8.0;
        spawned.push(host.spawn(Vec3::new(offset - 10.0, 0.0, -12.0), SpawnParams::default())?);
    }

    let mut tick_loop = TickLoop::default();
    let dt = tick_loop.tick_seconds();
    let total_ticks = u64::from(options.seconds) * u64::from(shisha_shared::TICK_RATE);
    let late_join = total_ticks / 3;
    let first_hit = total_ticks / 2;
    let kill = total_ticks * 2 / 3;
    let day_end = total_ticks * 3 / 4;

    while tick_loop.tick_count() < total_ticks {
        let due = tick_loop.advance(tick_loop.tick_duration());
        for _ in 0..due {
            let start = tick_loop.begin_tick();
            let tick = tick_loop.tick_count();

            if tick == late_join {
                followers.push(FollowerSession::join(
                    &hub,
                    config,
                    Arc::clone(&directory),
                    options.seed.wrapping_add(1),
                )?);
            }
            if tick == first_hit {
                if let Some(&id) = spawned.first() {
                    let outcome = host.hit(id, 1, Some(PLAYER));
                    tracing::info!("player hits {}: {:?}", id, outcome);
                }
            }
            if tick == kill {
                if let Some(&id) = spawned.get(1) {
                    let outcome = host.hit(id, 100, Some(PLAYER));
                    tracing::info!("player hits {}: {:?}", id, outcome);
                }
            }
            if tick == day_end {
                host.begin_day_end();
                roster.remove(PLAYER);
            }

            host.tick(dt);
            for id in &spawned {
                if host
                    .agent(*id)
                    .is_some_and(|agent| agent.state() == BehaviourState::Idle)
                {
                    // Idle animations last a couple of seconds.
                    if tick % (2 * u64::from(shisha_shared::TICK_RATE)) == 0 {
                        host.drop_loot(*id);
                        host.idle_complete(*id);
                    }
                }
            }

            for follower in &mut followers {
                let stats = follower.pump();
                if stats.malformed > 0 {
                    tracing::warn!("follower {:?}: {} malformed frames", follower.id(), stats.malformed);
                }
                for agent in host.agents() {
                    follower.update(agent.object(), agent.position(), dt);
                }
            }

            tick_loop.end_tick(start);
        }
    }

    let stats = tick_loop.stats();
    tracing::info!(
        "ran {} ticks (avg {} us, max {} us, {} late)",
        tick_loop.tick_count(),
        stats.avg_tick_us,
        stats.max_tick_us,
        stats.late_ticks
    );
    tracing::info!(
        "{} agents remain, {} loot objects spawned",
        host.len(),
        host.loot_objects().count()
    );
    for follower in &followers {
        tracing::info!(
            "follower {:?}: {} agent objects, {} loot objects",
            follower.id(),
            follower.agent_count(),
            follower.loot_count()
        );
    }
    Ok(())
}
