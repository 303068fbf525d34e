//! Monte Carlo Tree Search (MCTS) with PUCT selection.
//!
//! This module implements MCTS with:
//! - PUCT selection guided by evaluator priors, with first-play urgency (FPU)
//!   for unvisited actions
//! - Dirichlet noise on the root priors
//! - Visit-proportional move sampling for the opening moves
//! - Playout cap randomisation: most searches are small and noise-free, a
//!   fraction are full-size with noise
//!
//! Statistics live in a transposition table keyed by the position hash, so
//! the tree holds no references to game states. Values are always stored
//! from Black's perspective; White maximises the negated value.

use std::sync::Arc;

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Gamma};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::action::Action;
use crate::board::Color;
use crate::constants::{
    ACTION_SPACE, C_FPU, C_PUCT, DEFAULT_PLAYOUTS, DIRICHLET_EPSILON_EVAL,
    DIRICHLET_EPSILON_TRAIN, DIRICHLET_UNSCALED_ALPHA, PLAYOUT_CAP_P_BIG,
    SAMPLING_MOVES_EVAL, SAMPLING_MOVES_TRAIN,
};
use crate::evaluator::{EvalError, Evaluation, Evaluator};
use crate::game::{GameError, GameState};
use crate::player::Player;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search called on a finished game")]
    GameOver,
    #[error("no candidate action")]
    NoCandidate,
    #[error("dirichlet noise produced a NaN prior")]
    NanPrior,
    #[error("no table entry for position {0:#018x}")]
    MissingEntry(u64),
    #[error("evaluator returned a policy of length {len}")]
    BadPolicy { len: usize },
    #[error("invalid config: {msg}")]
    InvalidConfig { msg: &'static str },
    #[error("noise distribution: {0}")]
    Noise(String),
    #[error(transparent)]
    Evaluator(#[from] EvalError),
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Split between quick noise-free searches and full searches with noise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayoutCap {
    pub small: u32,
    pub big: u32,
    /// Probability of a full search.
    pub p_big: f32,
}

impl PlayoutCap {
    pub fn new(small: u32, big: u32) -> Self {
        Self {
            small,
            big,
            p_big: PLAYOUT_CAP_P_BIG,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MctsConfig {
    /// Playouts per move when no playout cap applies.
    pub playouts: u32,
    pub c_puct: f32,
    pub c_fpu: f32,
    /// Total Dirichlet concentration; divided by the number of legal actions.
    pub dirichlet_alpha: f32,
    pub dirichlet_epsilon_train: f32,
    pub dirichlet_epsilon_eval: f32,
    /// Evaluation games use the eval noise weight, sample fewer moves and
    /// ignore the playout cap.
    pub eval_mode: bool,
    pub playout_cap: Option<PlayoutCap>,
    pub sampling_moves_train: u32,
    pub sampling_moves_eval: u32,
    /// Drop entries created before the searched position at the start of a search.
    pub discard_stale: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            playouts: DEFAULT_PLAYOUTS,
            c_puct: C_PUCT,
            c_fpu: C_FPU,
            dirichlet_alpha: DIRICHLET_UNSCALED_ALPHA,
            dirichlet_epsilon_train: DIRICHLET_EPSILON_TRAIN,
            dirichlet_epsilon_eval: DIRICHLET_EPSILON_EVAL,
            eval_mode: false,
            playout_cap: None,
            sampling_moves_train: SAMPLING_MOVES_TRAIN,
            sampling_moves_eval: SAMPLING_MOVES_EVAL,
            discard_stale: true,
        }
    }
}

impl MctsConfig {
    /// Defaults with a playout cap of `small` / `big` playouts.
    pub fn with_playout_cap(small: u32, big: u32) -> Self {
        Self {
            playouts: big,
            playout_cap: Some(PlayoutCap::new(small, big)),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        let fail = |msg| Err(SearchError::InvalidConfig { msg });
        if self.playouts == 0 {
            return fail("playouts must be > 0");
        }
        if !(self.c_puct.is_finite() && self.c_puct > 0.0) {
            return fail("c_puct must be finite and > 0");
        }
        if !(self.c_fpu.is_finite() && self.c_fpu >= 0.0) {
            return fail("c_fpu must be finite and >= 0");
        }
        if !(self.dirichlet_alpha.is_finite() && self.dirichlet_alpha > 0.0) {
            return fail("dirichlet_alpha must be finite and > 0");
        }
        for eps in [self.dirichlet_epsilon_train, self.dirichlet_epsilon_eval] {
            if !(0.0..=1.0).contains(&eps) {
                return fail("dirichlet epsilon must be in [0, 1]");
            }
        }
        if let Some(cap) = self.playout_cap {
            if cap.small == 0 || cap.big == 0 {
                return fail("playout cap sizes must be > 0");
            }
            if !(0.0..=1.0).contains(&cap.p_big) {
                return fail("playout cap p_big must be in [0, 1]");
            }
        }
        Ok(())
    }

    fn noise_weight(&self) -> f32 {
        if self.eval_mode {
            self.dirichlet_epsilon_eval
        } else {
            self.dirichlet_epsilon_train
        }
    }

    fn sampling_moves(&self) -> u32 {
        if self.eval_mode {
            self.sampling_moves_eval
        } else {
            self.sampling_moves_train
        }
    }
}

/// Search statistics for one position.
#[derive(Clone, Debug)]
struct Entry {
    /// Visits per action.
    n: Vec<u32>,
    /// Value per action.
    q: Vec<f32>,
    /// Prior per action, masked to the legal set.
    p: Vec<f32>,
    ns: u32,
    /// Running mean of every value backed up through this position.
    qs: f32,
    /// Move number of the position that created the entry.
    turns: u32,
}

impl Entry {
    fn new(p: Vec<f32>, value: f32, turns: u32) -> Self {
        Self {
            n: vec![0; ACTION_SPACE],
            q: vec![0.0; ACTION_SPACE],
            p,
            ns: 1,
            qs: value,
            turns,
        }
    }
}

pub struct MctsPlayer {
    evaluator: Arc<dyn Evaluator>,
    cfg: MctsConfig,
    table: FxHashMap<u64, Entry>,
    rng: ChaCha8Rng,
}

impl MctsPlayer {
    pub fn new(evaluator: Arc<dyn Evaluator>, cfg: MctsConfig) -> Result<Self, SearchError> {
        Self::with_seed(evaluator, cfg, fastrand::u64(..))
    }

    /// A player whose every random choice follows from `seed`.
    pub fn with_seed(
        evaluator: Arc<dyn Evaluator>,
        cfg: MctsConfig,
        seed: u64,
    ) -> Result<Self, SearchError> {
        cfg.validate()?;
        Ok(Self {
            evaluator,
            cfg,
            table: FxHashMap::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Number of positions in the table.
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Run a search from `state` and pick a move.
    pub fn get_move(&mut self, state: &GameState) -> Result<Action, SearchError> {
        if state.is_done() {
            return Err(SearchError::GameOver);
        }
        if self.cfg.discard_stale {
            let turns = state.turns();
            self.table.retain(|_, entry| entry.turns >= turns);
        }

        self.visit(state)?;
        let playouts = match self.cfg.playout_cap {
            Some(cap) if !self.cfg.eval_mode => {
                if self.rng.random::<f32>() < cap.p_big {
                    self.apply_dirichlet_noise(state)?;
                    cap.big
                } else {
                    cap.small
                }
            }
            _ => {
                self.apply_dirichlet_noise(state)?;
                self.cfg.playouts
            }
        };
        for _ in 1..playouts {
            self.visit(state)?;
        }

        let action = self.choose_action(state)?;
        debug!(
            "move {}: {} after {} playouts, win rate {:.3}, table {}",
            state.turns(),
            action,
            playouts,
            self.win_rate(state).unwrap_or(0.5),
            self.table.len()
        );
        Ok(action)
    }

    /// One playout from `state`; returns the backed-up value (Black's perspective).
    pub fn visit(&mut self, state: &GameState) -> Result<f32, SearchError> {
        if state.is_done() {
            return Ok(Evaluation::terminal(state).value);
        }
        let hash = state.hash();
        let Some(entry) = self.table.get(&hash) else {
            return self.expand(state);
        };

        let index = select_action(entry, state, self.cfg.c_puct, self.cfg.c_fpu)
            .ok_or(SearchError::NoCandidate)?;
        let action = Action::from_index(state.turn(), index).ok_or(SearchError::NoCandidate)?;
        let mut child = state.clone();
        child.play_move(action)?;
        let result = self.visit(&child)?;

        let child_stats = if child.is_done() {
            None
        } else {
            let child_hash = child.hash();
            let child_entry = self
                .table
                .get(&child_hash)
                .ok_or(SearchError::MissingEntry(child_hash))?;
            Some((child_entry.qs, child_entry.ns))
        };

        let entry = self
            .table
            .get_mut(&hash)
            .ok_or(SearchError::MissingEntry(hash))?;
        entry.qs = (entry.qs * entry.ns as f32 + result) / (entry.ns + 1) as f32;
        entry.ns += 1;
        match child_stats {
            Some((qs, ns)) => {
                entry.q[index] = qs;
                entry.n[index] = ns;
            }
            None => {
                // Finished positions have no entry of their own.
                entry.q[index] = result;
                entry.n[index] += 1;
            }
        }
        Ok(result)
    }

    /// Evaluate an unseen position and store its entry.
    fn expand(&mut self, state: &GameState) -> Result<f32, SearchError> {
        let eval = self.evaluator.evaluate(state)?;
        if eval.policy.len() != ACTION_SPACE {
            return Err(SearchError::BadPolicy {
                len: eval.policy.len(),
            });
        }
        let priors = masked_priors(&eval.policy, state.legal_action_indexes());
        self.table
            .insert(state.hash(), Entry::new(priors, eval.value, state.turns()));
        Ok(eval.value)
    }

    /// Mix Dirichlet noise into the root priors of `state`.
    pub fn apply_dirichlet_noise(&mut self, state: &GameState) -> Result<(), SearchError> {
        if state.is_done() {
            return Ok(());
        }
        let hash = state.hash();
        let entry = self
            .table
            .get_mut(&hash)
            .ok_or(SearchError::MissingEntry(hash))?;
        mix_dirichlet_noise(
            &mut entry.p,
            state.legal_action_indexes(),
            self.cfg.dirichlet_alpha,
            self.cfg.noise_weight(),
            &mut self.rng,
        )
    }

    /// Sample by visit count early in the game, otherwise take the most visited action.
    fn choose_action(&mut self, state: &GameState) -> Result<Action, SearchError> {
        let hash = state.hash();
        let entry = self.table.get(&hash).ok_or(SearchError::MissingEntry(hash))?;
        let legal = state.legal_action_indexes();
        let turn = state.turn();

        let total: u64 = legal.iter().map(|&a| u64::from(entry.n[a])).sum();
        if state.turns() < self.cfg.sampling_moves() && total > 0 {
            let draw = self.rng.random_range(1..=total);
            let mut seen = 0;
            for &a in legal {
                seen += u64::from(entry.n[a]);
                if seen >= draw {
                    return Action::from_index(turn, a).ok_or(SearchError::NoCandidate);
                }
            }
        }

        let mut best: Option<(usize, u32)> = None;
        for &a in legal {
            if best.is_none_or(|(_, n)| entry.n[a] > n) {
                best = Some((a, entry.n[a]));
            }
        }
        best.and_then(|(a, _)| Action::from_index(turn, a))
            .ok_or(SearchError::NoCandidate)
    }

    /// Clear the table.
    pub fn reset(&mut self) {
        self.table.clear();
    }

    /// Chance that Black wins from `state`, if it has been searched.
    pub fn win_rate(&self, state: &GameState) -> Option<f32> {
        self.table.get(&state.hash()).map(|e| (e.qs + 1.0) / 2.0)
    }

    /// Visited legal actions of `state` and their visit counts.
    pub fn visit_counts(&self, state: &GameState) -> Option<Vec<(usize, u32)>> {
        let entry = self.table.get(&state.hash())?;
        Some(
            state
                .legal_action_indexes()
                .iter()
                .filter(|&&a| entry.n[a] > 0)
                .map(|&a| (a, entry.n[a]))
                .collect(),
        )
    }
}

impl Player for MctsPlayer {
    fn get_move(&mut self, state: &GameState) -> Result<Action, SearchError> {
        MctsPlayer::get_move(self, state)
    }

    fn win_rate(&self, state: &GameState) -> Option<f32> {
        MctsPlayer::win_rate(self, state)
    }

    fn visit_counts(&self, state: &GameState) -> Option<Vec<(usize, u32)>> {
        MctsPlayer::visit_counts(self, state)
    }

    fn reset(&mut self) {
        MctsPlayer::reset(self);
    }
}

/// PUCT selection over the legal actions of `state`; the first maximum wins.
fn select_action(entry: &Entry, state: &GameState, c_puct: f32, c_fpu: f32) -> Option<usize> {
    let legal = state.legal_action_indexes();
    let sign = state.turn().sign();
    let explored: f32 = legal
        .iter()
        .filter(|&&a| entry.n[a] > 0)
        .map(|&a| entry.p[a])
        .sum();
    let fpu = sign * entry.qs - c_fpu * explored.sqrt();
    let sqrt_ns = (entry.ns as f32).sqrt();

    let mut best = None;
    let mut best_u = f32::NEG_INFINITY;
    for &a in legal {
        let n = entry.n[a];
        let q = if n == 0 { fpu } else { sign * entry.q[a] };
        let u = q + c_puct * entry.p[a] * sqrt_ns / (1 + n) as f32;
        if u > best_u {
            best_u = u;
            best = Some(a);
        }
    }
    best
}

/// Restrict `policy` to `legal` and renormalise; uniform if no legal mass remains.
fn masked_priors(policy: &[f32], legal: &[usize]) -> Vec<f32> {
    let mut priors = vec![0.0; ACTION_SPACE];
    let mass: f32 = legal.iter().map(|&a| policy[a].max(0.0)).sum();
    if mass.is_finite() && mass > 0.0 {
        for &a in legal {
            priors[a] = policy[a].max(0.0) / mass;
        }
    } else if !legal.is_empty() {
        let u = 1.0 / legal.len() as f32;
        for &a in legal {
            priors[a] = u;
        }
    }
    priors
}

/// Mix Dirichlet noise into `priors` at the `legal` indexes.
///
/// The concentration is `alpha0 / legal.len()`; `eps` is the weight of the
/// noise.
pub fn mix_dirichlet_noise<R: Rng + ?Sized>(
    priors: &mut [f32],
    legal: &[usize],
    alpha0: f32,
    eps: f32,
    rng: &mut R,
) -> Result<(), SearchError> {
    if legal.is_empty() {
        return Ok(());
    }
    let alpha = alpha0 / legal.len() as f32;
    let gamma = Gamma::new(alpha, 1.0).map_err(|e| SearchError::Noise(e.to_string()))?;
    let eta: Vec<f32> = legal.iter().map(|_| gamma.sample(rng)).collect();
    // Guard against an all-zero draw.
    let sum = eta.iter().sum::<f32>() + 1e-8;

    for (&a, &x) in legal.iter().zip(&eta) {
        let mixed = (1.0 - eps) * priors[a] + eps * (x / sum);
        if mixed.is_nan() {
            return Err(SearchError::NanPrior);
        }
        priors[a] = mixed;
    }
    Ok(())
}

/// Convert Black's win rate into `color`'s.
pub fn win_rate_for(color: Color, black_win_rate: f32) -> f32 {
    match color {
        Color::Black => black_win_rate,
        Color::White => 1.0 - black_win_rate,
    }
}
