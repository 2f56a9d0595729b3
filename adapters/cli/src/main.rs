#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the room server and previews mazes.

mod render;

use std::{net::SocketAddr, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use maze_sabotage_core::Difficulty;
use maze_sabotage_server::ServerConfig;
use maze_sabotage_system_maze_generation::MazeGenerator;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "maze_sabotage=info,tower_http=info";

#[derive(Parser)]
#[command(name = "maze-sabotage", version, about = "Authoritative maze sabotage room server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the room API over HTTP.
    Serve {
        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides the configured listen address.
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Overrides the configured random seed.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a generated maze as text.
    Maze {
        /// Difficulty preset: easy, medium or hard.
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
        /// Seed for the generator. Drawn from entropy when absent.
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Entry point for the maze sabotage command-line interface.
#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Serve { config, bind, seed } => {
            init_tracing();
            let mut config = match config {
                Some(path) => ServerConfig::load(path)?,
                None => ServerConfig::default(),
            };
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            maze_sabotage_server::serve(config).await
        }
        Commands::Maze { difficulty, seed } => {
            let mut rng = match seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            let layout = MazeGenerator::default().generate_layout(difficulty, &mut rng);
            print!("{}", render::render_layout(&layout));
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
