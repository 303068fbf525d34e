//! Roost: a Tetris Go engine.
//!
//! ## Usage
//!
//! - `roost selfplay` - Generate self-play games, optionally saved as SGF
//! - `roost strength` - Pit two search configurations against each other
//! - `roost gtp` - Start GTP server for GUI integration
//!
//! Logging goes to stderr; set `RUST_LOG=debug` for per-move search details.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use roost::constants::{DEFAULT_KOMI, DEFAULT_PLAYOUTS, PLAYOUT_CAP_P_BIG, PLAYOUT_CAP_SMALL};
use roost::evaluator::{BatchingEvaluator, Evaluator, ScoreEvaluator};
use roost::gtp::GtpEngine;
use roost::match_runner::{MatchConfig, ResignPolicy};
use roost::mcts::{MctsConfig, MctsPlayer};
use roost::player::{Player, RandomPlayer};
use roost::selfplay::{SelfPlayConfig, StrengthConfig, run_selfplay, run_strength};

/// Roost: a Tetris Go engine with PUCT search
#[derive(Parser)]
#[command(name = "roost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play games of the engine against itself
    Selfplay {
        #[arg(long, default_value_t = 1)]
        games: usize,
        #[arg(long, default_value_t = 1)]
        threads: usize,
        /// Playouts per move without a playout cap
        #[arg(long, default_value_t = DEFAULT_PLAYOUTS)]
        playouts: u32,
        /// Playouts of a quick search under a playout cap
        #[arg(long, default_value_t = PLAYOUT_CAP_SMALL)]
        small: u32,
        /// Playouts of a full search; enables the playout cap
        #[arg(long)]
        big: Option<u32>,
        /// Probability of a full search
        #[arg(long, default_value_t = PLAYOUT_CAP_P_BIG)]
        p_big: f32,
        /// Directory for SGF records
        #[arg(long)]
        save_dir: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        /// Play every game to the end
        #[arg(long)]
        no_resign: bool,
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Play configuration A against configuration B, alternating colors
    Strength {
        #[arg(long, default_value_t = 10)]
        games: usize,
        #[arg(long, default_value_t = 1)]
        threads: usize,
        #[arg(long, default_value_t = DEFAULT_PLAYOUTS)]
        playouts_a: u32,
        #[arg(long, default_value_t = DEFAULT_PLAYOUTS)]
        playouts_b: u32,
        #[arg(long)]
        save_dir: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Start the GTP (Go Text Protocol) server for use with GUI applications
    Gtp {
        #[arg(long, default_value_t = DEFAULT_PLAYOUTS)]
        playouts: u32,
        #[arg(long)]
        seed: Option<u64>,
        /// Play uniformly random legal moves instead of searching
        #[arg(long)]
        random: bool,
    },
}

#[derive(Args)]
struct BatchArgs {
    /// Group evaluations from concurrent games into batches of this size
    #[arg(long)]
    batch_size: Option<usize>,
    /// Flush a partial batch after this many milliseconds
    #[arg(long, default_value_t = 5)]
    batch_timeout_ms: u64,
}

impl BatchArgs {
    fn evaluator(&self) -> Result<Arc<dyn Evaluator>> {
        Ok(match self.batch_size {
            Some(size) => Arc::new(
                BatchingEvaluator::new(
                    ScoreEvaluator,
                    size,
                    Duration::from_millis(self.batch_timeout_ms),
                )
                .context("invalid batching options")?,
            ),
            None => Arc::new(ScoreEvaluator),
        })
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Selfplay {
            games,
            threads,
            playouts,
            small,
            big,
            p_big,
            save_dir,
            seed,
            no_resign,
            batch,
        } => {
            let mut mcts = match big {
                Some(big) => MctsConfig::with_playout_cap(small, big),
                None => MctsConfig {
                    playouts,
                    ..MctsConfig::default()
                },
            };
            if let Some(cap) = mcts.playout_cap.as_mut() {
                cap.p_big = p_big;
            }
            let cfg = SelfPlayConfig {
                games,
                threads,
                mcts,
                matches: MatchConfig {
                    komi: DEFAULT_KOMI,
                    resign: (!no_resign).then(ResignPolicy::default),
                    record_visits: true,
                },
                save_dir,
                seed,
            };
            let summary = run_selfplay(batch.evaluator()?, &cfg).context("self-play failed")?;
            println!(
                "games: {}  black: {}  white: {}  draws: {}  resigned: {}  failed: {}  avg length: {:.1}",
                summary.games,
                summary.black_wins,
                summary.white_wins,
                summary.draws,
                summary.resigned,
                summary.failed,
                summary.total_moves as f64 / summary.games.max(1) as f64
            );
        }
        Commands::Strength {
            games,
            threads,
            playouts_a,
            playouts_b,
            save_dir,
            seed,
            batch,
        } => {
            let config = |playouts| MctsConfig {
                playouts,
                eval_mode: true,
                ..MctsConfig::default()
            };
            let cfg = StrengthConfig {
                games,
                threads,
                a: config(playouts_a),
                b: config(playouts_b),
                matches: MatchConfig::default(),
                save_dir,
                seed,
            };
            let evaluator = batch.evaluator()?;
            let summary =
                run_strength(evaluator.clone(), evaluator, &cfg).context("strength test failed")?;
            println!(
                "A ({playouts_a} playouts) vs B ({playouts_b} playouts): {} - {}  draws: {}  failed: {}  A win rate: {:.3}",
                summary.a_wins,
                summary.b_wins,
                summary.draws,
                summary.failed,
                summary.a_win_rate()
            );
        }
        Commands::Gtp {
            playouts,
            seed,
            random,
        } => {
            let player: Box<dyn Player> = if random {
                Box::new(match seed {
                    Some(seed) => RandomPlayer::with_seed(seed),
                    None => RandomPlayer::new(),
                })
            } else {
                let cfg = MctsConfig {
                    playouts,
                    eval_mode: true,
                    ..MctsConfig::default()
                };
                let evaluator: Arc<dyn Evaluator> = Arc::new(ScoreEvaluator);
                let player = match seed {
                    Some(seed) => MctsPlayer::with_seed(evaluator, cfg, seed),
                    None => MctsPlayer::new(evaluator, cfg),
                }
                .context("invalid search options")?;
                Box::new(player)
            };
            let mut engine = GtpEngine::new(player);
            engine.run().context("GTP session ended with an error")?;
        }
    }
    Ok(())
}
