//! Game state and rules.
//!
//! [`GameState`] keeps an 8-board history, a union-find forest over occupied
//! cells and the legal index set for the side to move. The legal set is
//! rebuilt from scratch after every move using the head liberty counts, so
//! `is_legal_action` is a lookup.
//!
//! Rules differ from standard Go in two ways:
//! - Superko is approximate: only capturing moves are checked, and only
//!   against the boards at history offsets 1, 3, 5 and 7. The history shifts
//!   on plays, not on passes.
//! - Under the default [`Rules`] a move that forms a chain of exactly
//!   [`TETRIS_CHAIN_SIZE`] stones is illegal.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::action::{Action, ActionKind};
use crate::board::{neighbors, Board, Color, Point};
use crate::chains::Chains;
use crate::constants::{
    CELLS, DEFAULT_KOMI, HISTORY_LEN, MAX_GAME_LEN, PASS_INDEX, TETRIS_CHAIN_SIZE,
    ZOBRIST_FEATURES,
};
use crate::zobrist::{default_table, ZobristTable};

/// Scores within this distance of zero are a draw.
const SCORE_EPSILON: f32 = 1e-8;

/// House rules layered on top of area scoring.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rules {
    /// Chain size that may never be formed, `None` for standard Go.
    pub forbidden_chain_size: Option<usize>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            forbidden_chain_size: Some(TETRIS_CHAIN_SIZE),
        }
    }
}

impl Rules {
    /// Plain Go without the chain-size restriction.
    pub fn standard() -> Self {
        Self {
            forbidden_chain_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("the game is already over")]
    GameOver,
    #[error("it is {expected:?}'s turn, got a move for {got:?}")]
    WrongTurn { expected: Color, got: Color },
    #[error("illegal action: {0}")]
    Illegal(Action),
    #[error("zobrist table has {got} features, need at least {needed}")]
    ZobristTooSmall { needed: usize, got: usize },
}

#[derive(Clone)]
pub struct GameState {
    boards: [Board; HISTORY_LEN],
    turn: Color,
    winner: Option<Color>,
    komi: f32,
    turns: u32,
    passes: u32,
    done: bool,
    hash: u64,
    legal: Vec<usize>,
    chains: Chains,
    rules: Rules,
    zobrist: Arc<ZobristTable>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(DEFAULT_KOMI)
    }
}

impl GameState {
    /// An empty board with Black to move, using the shared Zobrist table.
    pub fn new(komi: f32) -> Self {
        Self::build(komi, default_table(), Rules::default())
    }

    /// An empty board with an explicit Zobrist table and rule set.
    pub fn with_zobrist(
        komi: f32,
        zobrist: Arc<ZobristTable>,
        rules: Rules,
    ) -> Result<Self, GameError> {
        if zobrist.len() < ZOBRIST_FEATURES {
            return Err(GameError::ZobristTooSmall {
                needed: ZOBRIST_FEATURES,
                got: zobrist.len(),
            });
        }
        Ok(Self::build(komi, zobrist, rules))
    }

    fn build(komi: f32, zobrist: Arc<ZobristTable>, rules: Rules) -> Self {
        Self {
            boards: [Board::new(); HISTORY_LEN],
            turn: Color::Black,
            winner: None,
            komi,
            turns: 0,
            passes: 0,
            done: false,
            hash: zobrist.black_to_move(),
            legal: (0..=PASS_INDEX).collect(),
            chains: Chains::new(),
            rules,
            zobrist,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn turn(&self) -> Color {
        self.turn
    }

    #[inline]
    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    #[inline]
    pub fn komi(&self) -> f32 {
        self.komi
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.komi = komi;
    }

    /// Moves played so far, passes and resignations included.
    #[inline]
    pub fn turns(&self) -> u32 {
        self.turns
    }

    /// Consecutive passes since the last play.
    #[inline]
    pub fn passes(&self) -> u32 {
        self.passes
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn rules(&self) -> Rules {
        self.rules
    }

    /// Board `i` moves back in the history; 0 is the current board.
    pub fn board(&self, i: usize) -> &Board {
        &self.boards[i]
    }

    /// Legal action indexes for the side to move, ascending with pass last.
    /// Empty once the game is over; resignation is never listed.
    pub fn legal_action_indexes(&self) -> &[usize] {
        if self.done { &[] } else { &self.legal }
    }

    /// Head of the chain on `pt`, `None` for an empty cell.
    pub fn chain_head(&self, pt: Point) -> Option<Point> {
        (!self.boards[0].is_empty_at(pt)).then(|| self.chains.head(pt))
    }

    /// Liberties of the chain on `pt`, `None` for an empty cell.
    pub fn chain_liberties(&self, pt: Point) -> Option<u32> {
        self.chain_head(pt).map(|head| self.chains.liberties(head))
    }

    /// Stones of the chain on `pt`; empty for an empty cell.
    pub fn chain_members(&self, pt: Point) -> &[Point] {
        match self.chain_head(pt) {
            Some(head) => self.chains.members(head),
            None => &[],
        }
    }

    /// Zobrist hash recomputed from the current board and side to move.
    pub fn compute_hash(&self) -> u64 {
        let board = &self.boards[0];
        let mut hash = 0;
        for color in [Color::Black, Color::White] {
            for pt in board.stones(color) {
                hash ^= self.zobrist.stone(color, pt);
            }
        }
        if self.turn == Color::Black {
            hash ^= self.zobrist.black_to_move();
        }
        hash
    }

    // =========================================================================
    // Rules
    // =========================================================================

    pub fn is_legal_action(&self, action: Action) -> bool {
        if self.done || action.color() != self.turn {
            return false;
        }
        match action.kind() {
            ActionKind::Resign => true,
            _ => self.legal.binary_search(&action.index()).is_ok(),
        }
    }

    /// Apply `action`; the state is left untouched if it is not legal.
    pub fn play_move(&mut self, action: Action) -> Result<(), GameError> {
        if self.done {
            return Err(GameError::GameOver);
        }
        if action.color() != self.turn {
            return Err(GameError::WrongTurn {
                expected: self.turn,
                got: action.color(),
            });
        }
        if !self.is_legal_action(action) {
            return Err(GameError::Illegal(action));
        }

        self.turns += 1;
        self.turn = self.turn.opponent();
        self.hash ^= self.zobrist.black_to_move();

        match action.kind() {
            ActionKind::Resign => {
                self.done = true;
                self.winner = Some(self.turn);
                return Ok(());
            }
            ActionKind::Pass => {
                self.passes += 1;
                if self.passes >= 2 {
                    self.finish_by_score();
                    return Ok(());
                }
            }
            ActionKind::Play { .. } => {
                self.passes = 0;
                if let Some(pt) = action.point() {
                    self.place_stone(pt, action.color());
                }
            }
        }

        self.legal = self.compute_legal();
        if self.turns >= MAX_GAME_LEN {
            self.finish_by_score();
        }
        Ok(())
    }

    fn finish_by_score(&mut self) {
        self.done = true;
        let score = self.score();
        self.winner = if score > SCORE_EPSILON {
            Some(Color::Black)
        } else if score < -SCORE_EPSILON {
            Some(Color::White)
        } else {
            None
        };
    }

    fn place_stone(&mut self, pt: Point, color: Color) {
        self.boards.copy_within(0..HISTORY_LEN - 1, 1);
        self.boards[0].set(pt, Some(color));
        self.hash ^= self.zobrist.stone(color, pt);

        self.chains.place(pt);
        let mut head = pt;
        let mut opposing = Vec::with_capacity(4);
        for n in neighbors(pt) {
            match self.boards[0].get(n) {
                Some(c) if c == color => head = self.chains.union(head, n),
                Some(_) => {
                    let h = self.chains.find(n);
                    if !opposing.contains(&h) {
                        opposing.push(h);
                    }
                }
                None => {}
            }
        }

        let mut captured = false;
        let enemy = color.opponent();
        for h in opposing {
            if self.chains.remove_liberty(h) == 0 {
                for stone in self.chains.remove(h) {
                    self.boards[0].set(stone, None);
                    self.hash ^= self.zobrist.stone(enemy, stone);
                }
                captured = true;
            }
        }

        if captured {
            for h in self.chains.heads_of(&self.boards[0], color) {
                self.chains.refresh_liberties(&self.boards[0], h);
            }
        } else {
            let head = self.chains.find(head);
            self.chains.refresh_liberties(&self.boards[0], head);
        }
    }

    /// Legal plays for the side to move, followed by pass.
    fn compute_legal(&self) -> Vec<usize> {
        let board = &self.boards[0];
        let me = self.turn;
        let mut legal = Vec::with_capacity(CELLS + 1);

        for pt in 0..CELLS {
            if !board.is_empty_at(pt) {
                continue;
            }
            let mut has_empty = false;
            let mut friends: Vec<Point> = Vec::with_capacity(4);
            let mut victims: Vec<Point> = Vec::with_capacity(4);
            for n in neighbors(pt) {
                match board.get(n) {
                    None => has_empty = true,
                    Some(c) => {
                        let head = self.chains.head(n);
                        let group = if c == me { &mut friends } else { &mut victims };
                        if !group.contains(&head) {
                            group.push(head);
                        }
                    }
                }
            }
            victims.retain(|&h| self.chains.liberties(h) == 1);

            if let Some(forbidden) = self.rules.forbidden_chain_size {
                let size = 1 + friends.iter().map(|&h| self.chains.size(h)).sum::<usize>();
                if size == forbidden {
                    continue;
                }
            }

            if !victims.is_empty() {
                let mut next = *board;
                next.set(pt, Some(me));
                for &h in &victims {
                    for &stone in self.chains.members(h) {
                        next.set(stone, None);
                    }
                }
                let repeats = (1..HISTORY_LEN).step_by(2).any(|i| self.boards[i] == next);
                if repeats {
                    continue;
                }
            } else if !has_empty && friends.iter().all(|&h| self.chains.liberties(h) == 1) {
                continue;
            }
            legal.push(pt);
        }
        legal.push(PASS_INDEX);
        legal
    }

    /// Area score from Black's perspective, komi included.
    ///
    /// A cell counts for a color when it is reachable from that color's
    /// stones without crossing the other color, and not reachable from the
    /// other color's stones.
    pub fn score(&self) -> f32 {
        let board = &self.boards[0];
        let black = board.reachable_from(Color::Black);
        let white = board.reachable_from(Color::White);
        let mut count = 0i32;
        for pt in 0..CELLS {
            match (black[pt], white[pt]) {
                (true, false) => count += 1,
                (false, true) => count -= 1,
                _ => {}
            }
        }
        count as f32 - self.komi
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.boards[0])
    }
}

impl fmt::Debug for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameState")
            .field("turn", &self.turn)
            .field("turns", &self.turns)
            .field("passes", &self.passes)
            .field("done", &self.done)
            .field("winner", &self.winner)
            .field("komi", &self.komi)
            .field("board", &self.boards[0])
            .finish()
    }
}
