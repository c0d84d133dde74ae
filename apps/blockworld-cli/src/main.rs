use std::path::{Path, PathBuf};

use anyhow::Context;
use blockworld_common::splitmix64;
use blockworld_grid::VoxelGrid;
use blockworld_kernel::{SimConfig, WorldSimulation};
use blockworld_nav::Network;
use blockworld_nav::training::{Population, TrainingConfig};
use blockworld_render::DebugRecorder;
use blockworld_tools::SimulationInspector;
use clap::{Parser, Subcommand};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockworld-cli", about = "CLI for the blockworld simulation core")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Simulation config (JSON); missing fields take defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective configuration
    Info,
    /// Run the simulation headless and print a summary
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "600")]
        frames: u64,
        /// Number of agents placed in a ring around the spawn
        #[arg(short, long, default_value = "4")]
        agents: usize,
        /// Terrain seed (overrides the config)
        #[arg(short, long)]
        seed: Option<u64>,
        /// Frame length in seconds
        #[arg(long, default_value = "0.016666668")]
        dt: f32,
        /// Steering weights; a zeroed network is used without one
        #[arg(short, long)]
        weights: Option<PathBuf>,
        /// Shared agent destination
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        destination: Option<Vec<f32>>,
    },
    /// Evolve steering weights offline
    Train {
        /// Number of generations
        #[arg(short, long, default_value = "20")]
        generations: u32,
        /// Population size
        #[arg(short, long, default_value = "16")]
        population: usize,
        /// RNG seed for the search
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Start/destination pairs scored per member
        #[arg(long, default_value = "4")]
        scenarios: usize,
        /// Where to write the best weights
        #[arg(short, long, default_value = "steer.weights")]
        out: PathBuf,
    },
    /// Print statistics of a weight file
    Weights {
        path: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Agent start points on a ring of radius 6 around `center`.
fn agent_ring(center: Vec3, count: usize) -> Vec<Vec3> {
    (0..count)
        .map(|i| {
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            center + Vec3::new(6.0 * angle.cos(), 0.0, 6.0 * angle.sin())
        })
        .collect()
}

/// Random start/destination pairs at walking height inside the inner half
/// of the grid.
fn training_scenarios(rng: &mut SmallRng, grid: &VoxelGrid, count: usize) -> Vec<(Vec3, Vec3)> {
    let reach = grid.half_extent() / 2.0;
    let mut point = || {
        Vec3::new(
            rng.random_range(-reach..reach).round(),
            0.0,
            rng.random_range(-reach..reach).round(),
        )
    };
    (0..count).map(|_| (point(), point())).collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("blockworld-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "grid: {} voxels/edge, {} per chunk, view radius {}",
                config.grid.grid_size, config.grid.chunk_size, config.stream.view_radius
            );
            println!(
                "physics: gravity={:?} substep={:.5}s",
                config.physics.gravity, config.physics.target_substep
            );
            println!(
                "nav: {} params, enabled={}",
                blockworld_nav::PARAM_COUNT,
                config.nav.enabled
            );
        }
        Commands::Simulate {
            frames,
            agents,
            seed,
            dt,
            weights,
            destination,
        } => {
            if seed.is_some() {
                config.terrain_seed = seed;
            }
            if let Some(d) = destination.as_deref() {
                config.nav.destination = Vec3::new(d[0], d[1], d[2]);
            }
            if agents > 0 {
                config.nav.enabled = true;
            }
            let network = match &weights {
                Some(path) => Network::load(path)
                    .with_context(|| format!("loading weights {}", path.display()))?,
                None => Network::zeroed(),
            };

            let mut render = DebugRecorder::new();
            let mut effects = DebugRecorder::new();
            let spawn = config.spawn;
            let mut sim = WorldSimulation::new(config, network, &mut render, &mut effects)?;
            for p in agent_ring(spawn, agents) {
                sim.add_agent(p);
            }

            println!("Simulating {frames} frames of {dt:.4}s with {agents} agents");
            let mut drained = 0usize;
            for _ in 0..frames {
                sim.update(dt, &mut render, &mut effects);
                for event in sim.drain_events() {
                    tracing::debug!(?event, "sim event");
                    drained += 1;
                }
            }
            tracing::info!(drained, "simulation finished");

            println!("{}", SimulationInspector::summary(&sim));
            for id in SimulationInspector::list_agents(&sim) {
                if let Some(info) = SimulationInspector::inspect_agent(&sim, id) {
                    println!("  {info}");
                }
            }
            print!("{render}");
        }
        Commands::Train {
            generations,
            population,
            seed,
            scenarios,
            out,
        } => {
            let mut grid = VoxelGrid::new(config.grid.clone())?;
            if let Some(terrain) = config.terrain_seed {
                grid.generate_terrain(terrain);
            }
            let mut rng = SmallRng::seed_from_u64(splitmix64(seed));
            let pairs = training_scenarios(&mut rng, &grid, scenarios.max(1));

            let training = TrainingConfig {
                population,
                ..TrainingConfig::default()
            };
            let mut pop = Population::new(training, &mut rng);
            pop.pretrain(&mut rng, &grid, &pairs);

            println!("Training: {generations} generations, population {population}, seed={seed}");
            for g in 0..generations {
                pop.evaluate(&grid, &pairs);
                if let Some((_, best)) = pop.best() {
                    println!("generation {g}: best={best:.3}");
                }
                if g + 1 < generations {
                    pop.next_generation(&mut rng);
                }
            }

            let (best, score) = pop
                .best()
                .context("population was never evaluated")?;
            best.save(&out)
                .with_context(|| format!("writing weights {}", out.display()))?;
            println!("Saved best (score {score:.3}) to {}", out.display());
            println!("{}", SimulationInspector::weights(best));
        }
        Commands::Weights { path } => {
            let net = Network::load(&path)
                .with_context(|| format!("loading weights {}", path.display()))?;
            println!("{}", SimulationInspector::weights(&net));
        }
    }

    Ok(())
}
