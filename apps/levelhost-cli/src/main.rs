use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::IVec3;
use levelhost_common::{Dimension, EntityId};
use levelhost_kernel::{FlatGenerator, WorldProvider};
use levelhost_manager::config::keys;
use levelhost_manager::{Config, LevelBuilder, LevelPool, level_source_from_config};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "levelhost-cli", about = "CLI tool for level lifecycle operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (.yaml/.yml, or key=value lines)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and effective configuration
    Info,
    /// Get (building if needed) a level through the configured strategy
    Level {
        #[arg(default_value = "World")]
        name: String,
    },
    /// Derive a secondary dimension of a level
    Dimension {
        #[arg(default_value = "World")]
        name: String,
        /// nether or the_end
        #[arg(short, long, default_value = "nether")]
        dimension: Dimension,
    },
    /// Build a level pool and spread requests over it
    Pool {
        #[arg(short, long, default_value = "4")]
        size: usize,
        #[arg(short, long, default_value = "1000")]
        requests: usize,
    },
    /// Light a flat torch grid and report timings
    Light {
        /// Chunks between torches
        #[arg(short, long, default_value = "2")]
        spacing: i32,
        #[arg(short, long, default_value = "3")]
        runs: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::new(),
    };
    tracing::debug!(config = ?cli.config, keys = config.len(), "configuration ready");

    match cli.command {
        Commands::Info => {
            println!("levelhost-cli v{}", env!("CARGO_PKG_VERSION"));
            for key in [
                keys::WORLD_PROVIDER,
                keys::WORLD_FOLDER,
                keys::LEVEL_STRATEGY,
                keys::LEVEL_POOL_SIZE,
                keys::CALCULATE_LIGHTS,
                keys::SAVE_ENABLED,
                keys::GAME_MODE,
                keys::DIFFICULTY,
                keys::VIEW_DISTANCE,
            ] {
                println!("{key}: {}", config.get_raw(key).unwrap_or("(default)"));
            }
        }
        Commands::Level { name } => {
            let source = level_source_from_config(Arc::new(config))?;
            let level = source.get_level(EntityId::new(), &name)?;
            let provider = level.lock_world().kind();
            println!(
                "Level {}: strategy={:?}, provider={}, dimension={}, chunks={}, light sources={}",
                level.name(),
                source.strategy(),
                provider.as_str(),
                level.dimension(),
                level.cached_chunks().len(),
                level.light_sources().len()
            );
            println!(
                "Rules: game mode={}, difficulty={}, view distance={}",
                level.game_mode(),
                level.difficulty(),
                level.view_distance()
            );
            source.remove_level(&level)?;
        }
        Commands::Dimension { name, dimension } => {
            let source = level_source_from_config(Arc::new(config))?;
            let level = source.get_level(EntityId::new(), &name)?;
            match source.get_dimension(&level, dimension)? {
                Some(derived) => {
                    println!(
                        "Derived {} from {}: chunks={}",
                        derived.name(),
                        level.name(),
                        derived.cached_chunks().len()
                    );
                    derived.close()?;
                }
                None => println!("{} has no {dimension} data", level.name()),
            }
            source.remove_level(&level)?;
        }
        Commands::Pool { size, requests } => {
            let builder = LevelBuilder::new(Arc::new(config));
            let pool = LevelPool::new(builder, size)?;
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for _ in 0..requests {
                let level = pool.get_level(EntityId::new(), "any")?;
                *counts.entry(level.name().to_string()).or_default() += 1;
            }
            println!("Pool of {} levels, {requests} requests:", pool.len());
            for (name, count) in &counts {
                println!("  {name}: {count}");
            }
            for level in pool.levels() {
                pool.remove_level(level)?;
            }
        }
        Commands::Light { spacing, runs } => {
            let builder = LevelBuilder::new(Arc::new(config.with(keys::CALCULATE_LIGHTS, true)));
            for run in 0..runs {
                let provider = WorldProvider::flat(FlatGenerator::default().with_torches(spacing));
                let level = builder.create_level(&format!("light{run}"), Some(provider))?;
                let torch = IVec3::new(8, FlatGenerator::default().surface(), 8);
                println!(
                    "Run {run}: sources={}, light at torch={:?}",
                    level.light_sources().len(),
                    level.block_light(torch)
                );
                level.close()?;
            }
            let engine = builder.light_engine();
            println!(
                "Light engine: runs={}, average={:?}, slowest={:?} ({})",
                engine.invocations(),
                engine.average_run(),
                engine.slowest_run(),
                engine.slowest_level().unwrap_or_default()
            );
            for (phase, timings) in [("sky", engine.sky_timings()), ("block", engine.block_timings())] {
                println!(
                    "  {phase}: average={:?}, slowest={:?}",
                    timings.average(),
                    timings.slowest
                );
            }
        }
    }

    Ok(())
}
