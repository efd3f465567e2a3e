//! courier — two teammate agents collecting parcels in the in-memory world.
//!
//! Usage: `courier [config.json]`.  The optional JSON object overrides
//! agent parameters by key (`{"max_retries": 5, "tick_multiplier": 3}`).
//! Logging honours `RUST_LOG` (default `info`); traces are written under
//! `output/courier/<agent>/`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pd_agent::{AgentBuilder, RunSummary};
use pd_core::{AgentConfig, AgentId, JsonConfig, Position};
use pd_output::{CsvTraceWriter, TraceObserver};
use pd_spatial::TileMap;
use pd_world::{World, WorldConfig};

// ── Constants ─────────────────────────────────────────────────────────────────

const RUN_SECS: u64 = 60;
const SEED:     u64 = 42;

// S = spawn, D = delivery, # = wall.  Parcels appear on the left, get
// delivered on the right; the corridor in the middle is where hand-offs
// between explorer and courier happen.
const MAP: &str = "\
S.S.#.......D\n\
.....#......D\n\
S.S..........\n\
.....#......D\n\
S.S.#.......D\n\
";

// ── Setup ─────────────────────────────────────────────────────────────────────

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

fn load_config() -> Result<AgentConfig> {
    let base = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            AgentConfig::from_source(&JsonConfig::parse(&text)?)?
        }
        None => AgentConfig::default(),
    };
    Ok(AgentConfig { seed: SEED, ..base })
}

struct Spawned {
    id:     AgentId,
    handle: tokio::task::JoinHandle<(RunSummary, Option<pd_output::OutputError>)>,
}

async fn spawn_agent(
    world:     &World,
    config:    &AgentConfig,
    name:      &str,
    start:     Position,
    teammates: Vec<AgentId>,
    token:     &CancellationToken,
) -> Result<Spawned> {
    let id = AgentId::new(name);
    let (gateway, perceptions) = world.connect(id.clone(), name, start).await?;
    let gateway = Arc::new(gateway);
    let agent = AgentBuilder::standard(id.clone(), config.clone(), gateway.clone(), gateway)
        .teammates(teammates)
        .shutdown(token.child_token())
        .build()?;
    let writer = CsvTraceWriter::new(&Path::new("output/courier").join(name))?;

    let handle = tokio::spawn(async move {
        let mut obs = TraceObserver::new(writer);
        let summary = agent.run(perceptions, &mut obs).await;
        (summary, obs.take_error())
    });
    Ok(Spawned { id, handle })
}

// ── main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let config = load_config()?;
    let map = TileMap::parse(MAP)?;
    info!(width = map.width(), height = map.height(), run_secs = RUN_SECS, "starting courier demo");

    let world_config = WorldConfig {
        movement_duration_ms:         config.movement_duration_ms,
        decay_interval_ms:            config.decay_interval_ms,
        parcels_observation_distance: config.parcels_observation_distance,
        agents_observation_distance:  config.agents_observation_distance,
        seed:                         SEED,
        ..Default::default()
    };
    let world = World::new(map, world_config);
    let token = CancellationToken::new();

    let alice = AgentId::new("alice");
    let bob   = AgentId::new("bob");
    let agents = vec![
        spawn_agent(&world, &config, "alice", Position::new(1, 1), vec![bob.clone()], &token).await?,
        spawn_agent(&world, &config, "bob", Position::new(10, 2), vec![alice.clone()], &token).await?,
    ];
    let world_task = tokio::spawn(world.clone().run(token.child_token()));

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(RUN_SECS)) => info!("time is up"),
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
    token.cancel();

    println!();
    println!("{:<8} {:>6} {:>8} {:>10} {:>7} {:>10}", "Agent", "Score", "Plans", "Completed", "Failed", "Cancelled");
    println!("{}", "-".repeat(54));
    for Spawned { id, handle } in agents {
        let (summary, trace_error) = handle.await?;
        if let Some(e) = trace_error {
            warn!(agent = %id, error = %e, "trace incomplete");
        }
        println!(
            "{:<8} {:>6} {:>8} {:>10} {:>7} {:>10}",
            id,
            world.score(&id).await.unwrap_or_default(),
            summary.plans_started,
            summary.plans_completed,
            summary.plans_failed,
            summary.plans_cancelled,
        );
    }
    world_task.await?;
    println!("{}", "-".repeat(54));
    println!("Team score: {}", world.total_score().await);

    Ok(())
}
