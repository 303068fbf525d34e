//! Roost: a Go engine with PUCT search for the "Tetris" variant.
//!
//! Tetris Go plays like ordinary Go with area scoring, except that no move
//! may form a chain of exactly four stones. The engine pairs a rules engine
//! built on union-find chains with a PUCT Monte Carlo Tree Search guided by a
//! pluggable position evaluator.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions, rule and search parameters
//! - [`board`] - Colors, points and the board grid
//! - [`chains`] - Union-find chain bookkeeping
//! - [`zobrist`] - Position hashing keys
//! - [`action`] - Moves and their GTP/SGF string forms
//! - [`game`] - Game state and rules
//! - [`evaluator`] - Position evaluators and request batching
//! - [`player`] - Player interface and the random player
//! - [`mcts`] - PUCT search
//! - [`sgf`] - Game records
//! - [`match_runner`] - Single games with resignation
//! - [`selfplay`] - Parallel self-play and strength tests
//! - [`gtp`] - Go Text Protocol front end
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use roost::evaluator::ScoreEvaluator;
//! use roost::game::GameState;
//! use roost::mcts::{MctsConfig, MctsPlayer};
//!
//! let mut state = GameState::new(7.5);
//! let config = MctsConfig { playouts: 50, ..MctsConfig::default() };
//! let mut player = MctsPlayer::with_seed(Arc::new(ScoreEvaluator), config, 1).unwrap();
//!
//! let action = player.get_move(&state).unwrap();
//! state.play_move(action).unwrap();
//! println!("{action}\n{state}");
//! ```

pub mod action;
pub mod board;
pub mod chains;
pub mod constants;
pub mod evaluator;
pub mod game;
pub mod gtp;
pub mod match_runner;
pub mod mcts;
pub mod player;
pub mod selfplay;
pub mod sgf;
pub mod zobrist;
