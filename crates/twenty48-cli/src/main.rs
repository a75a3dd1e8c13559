mod config;
mod play;
mod selfplay;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use twenty48_core::store::{KeyValueStore, MemoryStore, Persistence, SqliteStore};

use config::Config;

#[derive(Debug, Parser)]
#[command(author, version, about = "Sliding-tile merge puzzle in the terminal")]
struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "info", "debug" (RUST_LOG wins when set)
    #[arg(long, default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play interactively, reading one command per line from stdin
    Play {
        /// Seed for tile spawns (random when omitted)
        #[arg(long, value_name = "N")]
        seed: Option<u64>,

        /// Forget saved progress before starting
        #[arg(long)]
        fresh: bool,
    },
    /// Play many random games in parallel and report statistics
    Selfplay {
        /// Number of games (overrides config)
        #[arg(long, value_name = "N")]
        games: Option<u32>,

        /// Base seed (overrides config)
        #[arg(long, value_name = "N")]
        seed: Option<u64>,

        /// Number of worker threads (defaults to Rayon default)
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// JSON-lines output file (overrides config)
        #[arg(long, value_name = "FILE")]
        results: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log.as_str())).init();

    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Command::Play { seed, fresh } => {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            match &config.store.path {
                Some(path) => {
                    info!("using save file {}", path.display());
                    let store = SqliteStore::open(path)?;
                    play_with(&config, Persistence::new(store), fresh, &mut rng)
                }
                None => {
                    let store = MemoryStore::new();
                    play_with(&config, Persistence::new(store), fresh, &mut rng)
                }
            }
        }
        Command::Selfplay {
            games,
            seed,
            workers,
            results,
        } => {
            if let Some(n) = workers {
                rayon::ThreadPoolBuilder::new().num_threads(n).build_global()?;
            }
            let games = games.unwrap_or(config.selfplay.games);
            let seed = seed.unwrap_or(config.selfplay.seed);
            let runs = selfplay::run_batch(
                games,
                seed,
                config.game_settings(),
                config.selfplay.max_steps,
            );
            let summary = selfplay::summarize(&runs);
            info!(
                "Completed self-play: {} game(s), mean score {:.1}, max score {}, max tile {}",
                summary.games, summary.mean_score, summary.max_score, summary.max_tile
            );
            for (level, count) in &summary.levels {
                info!("  level {level}: {count} game(s)");
            }
            if let Some(path) = results.or(config.selfplay.results_file) {
                selfplay::write_results(&runs, &path)?;
            }
            Ok(())
        }
    }
}

fn play_with<S: KeyValueStore>(
    config: &Config,
    mut persistence: Persistence<S>,
    fresh: bool,
    rng: &mut StdRng,
) -> Result<()> {
    if fresh && !persistence.clear_all() {
        warn!("saved progress could not be cleared");
    }
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let summary = play::run(
        config.game_settings(),
        &mut persistence,
        rng,
        stdin.lock(),
        &mut stdout,
    )?;
    info!(
        "Session finished: {} move(s), {} undo(s), final score {}",
        summary.moves, summary.undos, summary.final_score
    );
    Ok(())
}
