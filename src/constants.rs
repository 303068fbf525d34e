//! Constants for board dimensions, rules, search parameters and resignation.
//!
//! The board is a flat array of `N * N` cells indexed by `x * N + y`, where `x`
//! is the row counted from the top edge and `y` the column from the left edge.
//!
//! # Board Size Configuration
//!
//! The board size is controlled by Cargo features:
//! - `board9x9` (default): 9x9 board
//! - `board13x13`: 13x13 board
//!
//! To compile for a specific board size:
//! ```sh
//! cargo build                           # 9x9 (default)
//! cargo build --no-default-features --features board13x13  # 13x13
//! ```

// =============================================================================
// Board Geometry
// =============================================================================

/// Board size (NxN).
#[cfg(feature = "board9x9")]
pub const N: usize = 9;

#[cfg(feature = "board13x13")]
pub const N: usize = 13;

// Compile-time check: exactly one board size feature must be enabled
#[cfg(all(feature = "board9x9", feature = "board13x13"))]
compile_error!("Cannot enable both 'board9x9' and 'board13x13' features at the same time");

#[cfg(not(any(feature = "board9x9", feature = "board13x13")))]
compile_error!("Must enable exactly one board size feature: 'board9x9' or 'board13x13'");

/// Number of playable cells.
pub const CELLS: usize = N * N;

/// Action index of a pass.
pub const PASS_INDEX: usize = CELLS;

/// Action index of a resignation. Never part of a legal index set.
pub const RESIGN_INDEX: usize = CELLS + 1;

/// Length of a policy vector: every cell plus pass.
pub const ACTION_SPACE: usize = CELLS + 1;

/// Offsets to the orthogonal neighbours as (row, column) deltas.
pub const NEIGHBORS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];

// =============================================================================
// Rules
// =============================================================================

/// Number of boards kept in the history ring (index 0 is the current board).
pub const HISTORY_LEN: usize = 8;

/// Move ceiling; the game is scored once this many moves have been played.
pub const MAX_GAME_LEN: u32 = (2 * CELLS + 1) as u32;

/// Default komi (compensation points for White).
pub const DEFAULT_KOMI: f32 = 7.5;

/// Chain size that may never be formed under the Tetris house rule.
pub const TETRIS_CHAIN_SIZE: usize = 4;

/// Zobrist features: a black stone per cell, a white stone per cell, black to move.
pub const ZOBRIST_FEATURES: usize = 2 * CELLS + 1;

/// Seed for the process-wide Zobrist table.
pub const ZOBRIST_SEED: u64 = 0x5EED_600D_B0A2_D001;

// =============================================================================
// MCTS Parameters
// =============================================================================

/// Default number of playouts per move.
pub const DEFAULT_PLAYOUTS: u32 = 250;

/// Exploration constant in the PUCT formula.
pub const C_PUCT: f32 = 1.1;

/// First-play-urgency reduction.
pub const C_FPU: f32 = 0.2;

/// Total Dirichlet concentration, divided by the number of legal actions.
pub const DIRICHLET_UNSCALED_ALPHA: f32 = 10.83;

/// Weight of root noise during training games.
pub const DIRICHLET_EPSILON_TRAIN: f32 = 0.25;

/// Weight of root noise during evaluation games.
pub const DIRICHLET_EPSILON_EVAL: f32 = 0.1;

/// Moves sampled proportionally to visit count in training games.
pub const SAMPLING_MOVES_TRAIN: u32 = 20;

/// Moves sampled proportionally to visit count in evaluation games.
pub const SAMPLING_MOVES_EVAL: u32 = 10;

/// Probability of a full ("big") search under playout cap randomisation.
pub const PLAYOUT_CAP_P_BIG: f32 = 0.25;

/// Default playouts of a quick ("small") search.
pub const PLAYOUT_CAP_SMALL: u32 = 50;

// =============================================================================
// Resignation
// =============================================================================

/// Win rate below which a side starts counting towards resignation.
pub const RESIGN_THRESHOLD: f32 = 0.05;

/// Consecutive hopeless evaluations before the losing side resigns.
pub const RESIGN_STREAK: u32 = 8;

/// Fraction of games played out to the end regardless of win rate.
pub const NO_RESIGN_FRACTION: f32 = 0.25;
