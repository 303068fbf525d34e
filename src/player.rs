//! The player interface shared by match runners and the GTP loop.

use crate::action::Action;
use crate::game::GameState;
use crate::mcts::SearchError;

pub trait Player: Send {
    /// Choose a move for the side to move in `state`.
    fn get_move(&mut self, state: &GameState) -> Result<Action, SearchError>;

    /// Estimated chance that Black wins from `state`, if the player keeps one.
    fn win_rate(&self, _state: &GameState) -> Option<f32> {
        None
    }

    /// Visit counts per legal action index from the last search of `state`.
    fn visit_counts(&self, _state: &GameState) -> Option<Vec<(usize, u32)>> {
        None
    }

    /// Forget anything learned during the previous game.
    fn reset(&mut self) {}
}

/// Picks uniformly among the legal action indexes.
pub struct RandomPlayer {
    rng: fastrand::Rng,
}

impl Default for RandomPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPlayer {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Player for RandomPlayer {
    fn get_move(&mut self, state: &GameState) -> Result<Action, SearchError> {
        if state.is_done() {
            return Err(SearchError::GameOver);
        }
        let legal = state.legal_action_indexes();
        let index = self
            .rng
            .choice(legal.iter().copied())
            .ok_or(SearchError::NoCandidate)?;
        Action::from_index(state.turn(), index).ok_or(SearchError::NoCandidate)
    }
}
