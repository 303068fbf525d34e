//! Plays one game between two players and records it.
//!
//! With a [`ResignPolicy`], each side keeps a streak of consecutive searches
//! that judged it hopeless. Once a side's streak is long enough it resigns on
//! its turn without consulting its player. A fixed fraction of games is
//! played to the end regardless, so that resignations can be checked for
//! false positives.

use log::{debug, info};
use thiserror::Error;

use crate::action::{Action, ActionKind};
use crate::board::Color;
use crate::constants::{DEFAULT_KOMI, NO_RESIGN_FRACTION, RESIGN_STREAK, RESIGN_THRESHOLD};
use crate::game::{GameError, GameState};
use crate::mcts::SearchError;
use crate::player::Player;
use crate::sgf::SgfRecord;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    #[error("rules violation: {0}")]
    Game(#[from] GameError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResignPolicy {
    /// Black win rate below which Black counts as hopeless (and above
    /// `1 - threshold` for White).
    pub threshold: f32,
    /// Hopeless searches in a row before resigning.
    pub streak: u32,
    /// Share of games where resignation is disabled.
    pub no_resign_fraction: f32,
}

impl Default for ResignPolicy {
    fn default() -> Self {
        Self {
            threshold: RESIGN_THRESHOLD,
            streak: RESIGN_STREAK,
            no_resign_fraction: NO_RESIGN_FRACTION,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MatchConfig {
    pub komi: f32,
    pub resign: Option<ResignPolicy>,
    /// Write root visit counts after each searched move as SGF comments.
    pub record_visits: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            komi: DEFAULT_KOMI,
            resign: Some(ResignPolicy::default()),
            record_visits: true,
        }
    }
}

/// Outcome of a finished game.
#[derive(Debug, Clone)]
pub struct GameRecord {
    /// Final area score from Black's perspective, komi included.
    pub score: f32,
    pub winner: Option<Color>,
    pub resigned: bool,
    /// Moves played, passes and resignation included.
    pub moves: u32,
    pub sgf: String,
}

#[derive(Default)]
struct Streaks {
    black: u32,
    white: u32,
}

impl Streaks {
    fn of(&self, color: Color) -> u32 {
        match color {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }

    fn update(&mut self, black_win_rate: f32, threshold: f32) {
        self.black = if black_win_rate < threshold { self.black + 1 } else { 0 };
        self.white = if black_win_rate > 1.0 - threshold { self.white + 1 } else { 0 };
    }
}

pub struct Match {
    cfg: MatchConfig,
    rng: fastrand::Rng,
}

impl Match {
    pub fn with_seed(cfg: MatchConfig, seed: u64) -> Self {
        Self {
            cfg,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Play a full game. Both players are reset afterwards, even on failure.
    pub fn play(
        &mut self,
        black: &mut dyn Player,
        white: &mut dyn Player,
    ) -> Result<GameRecord, MatchError> {
        let result = self.play_game(black, white);
        black.reset();
        white.reset();
        result
    }

    fn play_game(
        &mut self,
        black: &mut dyn Player,
        white: &mut dyn Player,
    ) -> Result<GameRecord, MatchError> {
        let mut state = GameState::new(self.cfg.komi);
        let mut record = SgfRecord::new(self.cfg.komi);
        let mut streaks = Streaks::default();
        let mut resigned = false;

        let draw = self.rng.f32();
        let policy = self.cfg.resign;
        let may_resign = policy.is_some_and(|p| draw > p.no_resign_fraction);
        debug!("resignation {}", if may_resign { "enabled" } else { "disabled" });

        while !state.is_done() {
            let turn = state.turn();
            if let Some(p) = policy.filter(|_| may_resign) {
                if streaks.of(turn) >= p.streak {
                    let action = Action::resign(turn);
                    state.play_move(action)?;
                    record.push_move(action, None);
                    resigned = true;
                    break;
                }
            }

            let player: &mut dyn Player = match turn {
                Color::Black => &mut *black,
                Color::White => &mut *white,
            };
            let action = player.get_move(&state)?;
            if let (Some(p), Some(wr)) = (policy, player.win_rate(&state)) {
                streaks.update(wr, p.threshold);
            }
            let visits = if self.cfg.record_visits {
                player.visit_counts(&state)
            } else {
                None
            };
            state.play_move(action)?;
            record.push_move(action, visits.as_deref());
            if action.kind() == ActionKind::Resign {
                resigned = true;
            }
        }

        let score = state.score();
        let winner = state.winner();
        info!(
            "game over after {} moves: winner {:?}, score {:.1}{}",
            state.turns(),
            winner,
            score,
            if resigned { " (resignation)" } else { "" }
        );
        Ok(GameRecord {
            score,
            winner,
            resigned,
            moves: state.turns(),
            sgf: record.finish(winner, resigned, score),
        })
    }
}
