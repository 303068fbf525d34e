//! Parallel game drivers: self-play data generation and strength tests.
//!
//! Games run on a dedicated rayon pool. Every game owns its state and a
//! fresh pair of players; only the evaluator is shared. A failing game is
//! logged and counted, the remaining games carry on.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::board::Color;
use crate::evaluator::Evaluator;
use crate::match_runner::{GameRecord, Match, MatchConfig, MatchError};
use crate::mcts::{MctsConfig, MctsPlayer, SearchError};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("invalid search config: {0}")]
    Config(#[from] SearchError),
    #[error("failed to build thread pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct SelfPlayConfig {
    pub games: usize,
    pub threads: usize,
    pub mcts: MctsConfig,
    pub matches: MatchConfig,
    /// Directory receiving one `<game id>.sgf` per finished game.
    pub save_dir: Option<PathBuf>,
    /// Base seed; game `i` derives its seeds from it.
    pub seed: Option<u64>,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            games: 1,
            threads: 1,
            mcts: MctsConfig::default(),
            matches: MatchConfig::default(),
            save_dir: None,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelfPlaySummary {
    pub games: usize,
    pub failed: usize,
    pub black_wins: usize,
    pub white_wins: usize,
    pub draws: usize,
    pub resigned: usize,
    pub total_moves: u64,
}

#[derive(Clone, Debug)]
pub struct StrengthConfig {
    pub games: usize,
    pub threads: usize,
    /// Configuration under test.
    pub a: MctsConfig,
    /// Reference configuration.
    pub b: MctsConfig,
    pub matches: MatchConfig,
    pub save_dir: Option<PathBuf>,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrengthSummary {
    pub games: usize,
    pub failed: usize,
    pub a_wins: usize,
    pub b_wins: usize,
    pub draws: usize,
}

impl StrengthSummary {
    /// Share of decided games won by A.
    pub fn a_win_rate(&self) -> f32 {
        let decided = self.a_wins + self.b_wins;
        if decided == 0 {
            0.5
        } else {
            self.a_wins as f32 / decided as f32
        }
    }
}

/// Per-game seeds: (match, black, white).
fn game_seeds(base: Option<u64>, id: usize) -> (u64, u64, u64) {
    match base {
        Some(seed) => {
            let s = seed.wrapping_add(3 * id as u64);
            (s, s.wrapping_add(1), s.wrapping_add(2))
        }
        None => (fastrand::u64(..), fastrand::u64(..), fastrand::u64(..)),
    }
}

fn save_sgf(dir: Option<&Path>, id: usize, sgf: &str) -> Result<(), MatchError> {
    if let Some(dir) = dir {
        fs::write(dir.join(format!("{id}.sgf")), sgf)?;
    }
    Ok(())
}

fn build_pool(threads: usize, save_dir: Option<&Path>) -> Result<rayon::ThreadPool, DriverError> {
    if let Some(dir) = save_dir {
        fs::create_dir_all(dir)?;
    }
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?)
}

/// Play `cfg.games` games of one configuration against itself.
pub fn run_selfplay(
    evaluator: Arc<dyn Evaluator>,
    cfg: &SelfPlayConfig,
) -> Result<SelfPlaySummary, DriverError> {
    cfg.mcts.validate()?;
    let save_dir = cfg.save_dir.as_deref();
    let pool = build_pool(cfg.threads, save_dir)?;
    info!("self-play: {} games on {} threads", cfg.games, cfg.threads);

    let play = |id: usize| -> Result<GameRecord, MatchError> {
        let (match_seed, black_seed, white_seed) = game_seeds(cfg.seed, id);
        let mut black = MctsPlayer::with_seed(evaluator.clone(), cfg.mcts, black_seed)?;
        let mut white = MctsPlayer::with_seed(evaluator.clone(), cfg.mcts, white_seed)?;
        let record = Match::with_seed(cfg.matches, match_seed).play(&mut black, &mut white)?;
        save_sgf(save_dir, id, &record.sgf)?;
        Ok(record)
    };
    let outcomes: Vec<Option<GameRecord>> = pool.install(|| {
        (0..cfg.games)
            .into_par_iter()
            .map(|id| {
                play(id)
                    .map_err(|e| error!("self-play game {id} failed: {e}"))
                    .ok()
            })
            .collect()
    });

    let mut summary = SelfPlaySummary {
        games: cfg.games,
        ..SelfPlaySummary::default()
    };
    for outcome in outcomes {
        let Some(record) = outcome else {
            summary.failed += 1;
            continue;
        };
        match record.winner {
            Some(Color::Black) => summary.black_wins += 1,
            Some(Color::White) => summary.white_wins += 1,
            None => summary.draws += 1,
        }
        summary.resigned += usize::from(record.resigned);
        summary.total_moves += u64::from(record.moves);
    }
    info!(
        "self-play done: black {} / white {} / draws {}, {} failed",
        summary.black_wins, summary.white_wins, summary.draws, summary.failed
    );
    Ok(summary)
}

/// Play configuration A against B, alternating colors; A is Black in even games.
pub fn run_strength(
    evaluator_a: Arc<dyn Evaluator>,
    evaluator_b: Arc<dyn Evaluator>,
    cfg: &StrengthConfig,
) -> Result<StrengthSummary, DriverError> {
    cfg.a.validate()?;
    cfg.b.validate()?;
    let save_dir = cfg.save_dir.as_deref();
    let pool = build_pool(cfg.threads, save_dir)?;
    info!("strength test: {} games on {} threads", cfg.games, cfg.threads);

    let play = |id: usize| -> Result<(Color, GameRecord), MatchError> {
        let (match_seed, a_seed, b_seed) = game_seeds(cfg.seed, id);
        let mut a = MctsPlayer::with_seed(evaluator_a.clone(), cfg.a, a_seed)?;
        let mut b = MctsPlayer::with_seed(evaluator_b.clone(), cfg.b, b_seed)?;
        let mut runner = Match::with_seed(cfg.matches, match_seed);
        let (a_color, record) = if id % 2 == 0 {
            (Color::Black, runner.play(&mut a, &mut b)?)
        } else {
            (Color::White, runner.play(&mut b, &mut a)?)
        };
        save_sgf(save_dir, id, &record.sgf)?;
        Ok((a_color, record))
    };
    let outcomes: Vec<Option<(Color, GameRecord)>> = pool.install(|| {
        (0..cfg.games)
            .into_par_iter()
            .map(|id| {
                play(id)
                    .map_err(|e| error!("strength game {id} failed: {e}"))
                    .ok()
            })
            .collect()
    });

    let mut summary = StrengthSummary {
        games: cfg.games,
        ..StrengthSummary::default()
    };
    for outcome in outcomes {
        match outcome {
            None => summary.failed += 1,
            Some((_, GameRecord { winner: None, .. })) => summary.draws += 1,
            Some((a_color, GameRecord { winner: Some(w), .. })) if w == a_color => {
                summary.a_wins += 1
            }
            Some(_) => summary.b_wins += 1,
        }
    }
    info!(
        "strength test done: A {} - B {} ({} draws, {} failed), A win rate {:.3}",
        summary.a_wins,
        summary.b_wins,
        summary.draws,
        summary.failed,
        summary.a_win_rate()
    );
    Ok(summary)
}
