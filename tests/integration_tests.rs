//! Integration tests for roost
//!
//! These tests drive the public API end to end: rules through `GameState`,
//! search through `MctsPlayer`, and the GTP, match and self-play front ends.

use std::sync::Arc;

use roost::action::Action;
use roost::board::{Color, point};
use roost::constants::{CELLS, MAX_GAME_LEN, N, PASS_INDEX};
use roost::evaluator::{BatchingEvaluator, Evaluator, ScoreEvaluator};
use roost::game::{GameError, GameState, Rules};
use roost::gtp::GtpEngine;
use roost::match_runner::{Match, MatchConfig};
use roost::mcts::{MctsConfig, MctsPlayer};
use roost::player::{Player, RandomPlayer};
use roost::selfplay::{SelfPlayConfig, run_selfplay};

// =============================================================================
// Helper functions for setting up test positions
// =============================================================================

/// Play a sequence of points, alternating colors starting with whoever is
/// to move. `None` passes.
fn play_all(state: &mut GameState, moves: &[Option<(usize, usize)>]) {
    for mv in moves {
        let color = state.turn();
        let action = match *mv {
            Some((x, y)) => Action::play(color, x, y),
            None => Action::pass(color),
        };
        state
            .play_move(action)
            .unwrap_or_else(|e| panic!("{action} rejected: {e}\n{state:?}"));
    }
}

fn setup(moves: &[(usize, usize)]) -> GameState {
    let mut state = GameState::new(7.5);
    let moves: Vec<_> = moves.iter().copied().map(Some).collect();
    play_all(&mut state, &moves);
    state
}

fn small_search(playouts: u32) -> MctsConfig {
    MctsConfig {
        playouts,
        ..MctsConfig::default()
    }
}

/// Ko shape with a White stone in atari on (1,1); Black takes at (1,2).
///
/// ```text
///   . X O .
///   X O . O
///   . X O .
/// ```
fn ko_setup() -> GameState {
    setup(&[
        (0, 1),
        (0, 2),
        (1, 0),
        (1, 3),
        (2, 1),
        (2, 2),
        (N - 1, N - 1),
        (1, 1),
    ])
}

// =============================================================================
// Basic rules
// =============================================================================

#[test]
fn test_empty_state() {
    let state = GameState::new(7.5);
    assert_eq!(state.turn(), Color::Black);
    assert!(!state.is_done());
    assert_eq!(state.legal_action_indexes().len(), CELLS + 1);
    assert_eq!(state.legal_action_indexes().last(), Some(&PASS_INDEX));
    assert_eq!(state.score(), -7.5);
}

#[test]
fn test_stones_alternate() {
    let state = setup(&[(2, 2), (3, 3)]);
    assert_eq!(state.board(0).get(point(2, 2)), Some(Color::Black));
    assert_eq!(state.board(0).get(point(3, 3)), Some(Color::White));
    assert_eq!(state.turn(), Color::Black);
    assert_eq!(state.turns(), 2);
}

#[test]
fn test_illegal_move_leaves_state_untouched() {
    let state = setup(&[(4, 4)]);
    let mut copy = state.clone();
    let err = copy.play_move(Action::play(Color::White, 4, 4));
    assert_eq!(err, Err(GameError::Illegal(Action::play(Color::White, 4, 4))));
    assert_eq!(copy.hash(), state.hash());
    assert_eq!(copy.turns(), state.turns());
    assert_eq!(copy.turn(), state.turn());
}

// =============================================================================
// Capture tests
// =============================================================================

#[test]
fn test_capture_corner_stone() {
    // B(0,0), W(0,1), B elsewhere, W(1,0) captures.
    let state = setup(&[(0, 0), (0, 1), (N - 1, N - 1), (1, 0)]);
    assert_eq!(state.board(0).get(point(0, 0)), None);
    assert_eq!(state.chain_liberties(point(0, 1)), Some(3));
    assert_eq!(state.chain_liberties(point(1, 0)), Some(3));
    assert_eq!(state.hash(), state.compute_hash());
}

#[test]
fn test_capture_pair() {
    // Black pair on the top edge, surrounded by White.
    let state = setup(&[(0, 3), (0, 2), (0, 4), (1, 3), (N - 1, 0), (1, 4), (N - 1, 2), (0, 5)]);
    assert_eq!(state.board(0).get(point(0, 3)), None);
    assert_eq!(state.board(0).get(point(0, 4)), None);
    assert_eq!(state.chain_liberties(point(0, 5)), Some(3));
    assert_eq!(state.hash(), state.compute_hash());
}

#[test]
fn test_capturing_move_is_not_suicide() {
    // Two White stones in atari around the empty corner.
    let state = setup(&[(0, 2), (0, 1), (1, 1), (1, 0), (2, 0), (N - 1, N - 1), (0, 0)]);
    assert_eq!(state.board(0).get(point(0, 1)), None);
    assert_eq!(state.board(0).get(point(1, 0)), None);
    assert_eq!(state.chain_liberties(point(0, 0)), Some(2));
    assert_eq!(state.hash(), state.compute_hash());
}

// =============================================================================
// Suicide tests
// =============================================================================

#[test]
fn test_suicide_corner() {
    let state = setup(&[(0, 1), (N - 1, N - 1), (1, 0)]);
    assert_eq!(state.turn(), Color::White);
    assert!(!state.is_legal_action(Action::play(Color::White, 0, 0)));
    assert!(!state.legal_action_indexes().contains(&point(0, 0)));
}

// =============================================================================
// Ko tests
// =============================================================================

#[test]
fn test_ko_recapture_is_forbidden() {
    let mut state = ko_setup();
    // Black takes the ko.
    play_all(&mut state, &[Some((1, 2))]);
    assert_eq!(state.board(0).get(point(1, 1)), None);
    assert_eq!(state.chain_liberties(point(1, 2)), Some(1));

    // Immediate retake would repeat the position.
    assert!(!state.is_legal_action(Action::play(Color::White, 1, 1)));

    // After an exchange elsewhere the retake is fine again.
    play_all(&mut state, &[Some((N - 1, 0)), Some((N - 3, N - 1))]);
    assert!(state.is_legal_action(Action::play(Color::White, 1, 1)));
    play_all(&mut state, &[Some((1, 1))]);
    assert_eq!(state.board(0).get(point(1, 2)), None);
}

// =============================================================================
// Tetris rule
// =============================================================================

#[test]
fn test_fourth_stone_of_a_chain_is_forbidden() {
    let state = setup(&[(4, 1), (0, 0), (4, 2), (0, 2), (4, 3), (0, 4)]);
    assert!(!state.is_legal_action(Action::play(Color::Black, 4, 4)));
    assert!(!state.is_legal_action(Action::play(Color::Black, 3, 2)));
    // Five stones at once is allowed when two chains join.
    let state = setup(&[(4, 1), (0, 0), (4, 2), (0, 2), (4, 4), (0, 4), (4, 5), (0, 6)]);
    assert!(state.is_legal_action(Action::play(Color::Black, 4, 3)));
}

#[test]
fn test_standard_rules_allow_long_chains() {
    let mut state = GameState::with_zobrist(7.5, roost::zobrist::default_table(), Rules::standard())
        .unwrap();
    play_all(
        &mut state,
        &[Some((4, 1)), Some((0, 0)), Some((4, 2)), Some((0, 2)), Some((4, 3)), Some((0, 4)), Some((4, 4))],
    );
    assert_eq!(state.chain_members(point(4, 4)).len(), 4);
}

// =============================================================================
// Game end and scoring
// =============================================================================

#[test]
fn test_double_pass_ends_with_komi() {
    let mut state = GameState::new(7.5);
    play_all(&mut state, &[None, None]);
    assert!(state.is_done());
    assert_eq!(state.winner(), Some(Color::White));
    assert!(state.legal_action_indexes().is_empty());
    assert_eq!(
        state.play_move(Action::pass(Color::Black)),
        Err(GameError::GameOver)
    );
}

#[test]
fn test_single_stone_owns_the_board() {
    let mut state = setup(&[(N / 2, N / 2)]);
    play_all(&mut state, &[None, None]);
    assert_eq!(state.score(), CELLS as f32 - 7.5);
    assert_eq!(state.winner(), Some(Color::Black));
}

#[test]
fn test_resignation() {
    let mut state = setup(&[(2, 2)]);
    state.play_move(Action::resign(Color::White)).unwrap();
    assert!(state.is_done());
    assert_eq!(state.winner(), Some(Color::Black));
}

#[test]
fn test_random_games_terminate() {
    for seed in 0..4 {
        let mut state = GameState::new(7.5);
        let mut player = RandomPlayer::with_seed(seed);
        while !state.is_done() {
            let action = player.get_move(&state).unwrap();
            state.play_move(action).unwrap();
            assert_eq!(state.hash(), state.compute_hash());
        }
        assert!(state.turns() <= MAX_GAME_LEN);
    }
}

// =============================================================================
// Search
// =============================================================================

#[test]
fn test_mcts_is_deterministic_with_a_seed() {
    let evaluator: Arc<dyn Evaluator> = Arc::new(ScoreEvaluator);
    let line = |seed| {
        let mut player = MctsPlayer::with_seed(evaluator.clone(), small_search(32), seed).unwrap();
        let mut state = GameState::new(7.5);
        let mut moves = Vec::new();
        for _ in 0..6 {
            let action = player.get_move(&state).unwrap();
            state.play_move(action).unwrap();
            moves.push(action);
        }
        moves
    };
    assert_eq!(line(11), line(11));
}

#[test]
fn test_mcts_through_batching_evaluator() {
    let batching = BatchingEvaluator::new(ScoreEvaluator, 1, std::time::Duration::from_millis(1))
        .unwrap();
    let mut player = MctsPlayer::with_seed(Arc::new(batching), small_search(16), 3).unwrap();
    let state = GameState::new(7.5);
    let action = player.get_move(&state).unwrap();
    assert!(state.is_legal_action(action));
    let visits = player.visit_counts(&state).unwrap();
    assert!(visits.iter().any(|&(index, _)| index == action.index()));
}

// =============================================================================
// Match runner and self-play
// =============================================================================

#[test]
fn test_mcts_match_reaches_a_result() {
    let evaluator: Arc<dyn Evaluator> = Arc::new(ScoreEvaluator);
    let cfg = MatchConfig {
        resign: None,
        ..MatchConfig::default()
    };
    let mut black = MctsPlayer::with_seed(evaluator.clone(), small_search(8), 1).unwrap();
    let mut white = MctsPlayer::with_seed(evaluator, small_search(8), 2).unwrap();
    let record = Match::with_seed(cfg, 4).play(&mut black, &mut white).unwrap();

    assert!(!record.resigned);
    assert!(record.moves <= MAX_GAME_LEN);
    let expected = if record.score > 1e-8 {
        Some(Color::Black)
    } else if record.score < -1e-8 {
        Some(Color::White)
    } else {
        None
    };
    assert_eq!(record.winner, expected);
    assert!(record.sgf.contains(&format!("SZ[{N}]")));
    assert_eq!(black.table_len(), 0, "players are reset after the game");
}

#[test]
fn test_selfplay_summary_adds_up() {
    let cfg = SelfPlayConfig {
        games: 3,
        threads: 2,
        mcts: small_search(4),
        seed: Some(21),
        ..SelfPlayConfig::default()
    };
    let summary = run_selfplay(Arc::new(ScoreEvaluator), &cfg).unwrap();
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.black_wins + summary.white_wins + summary.draws, 3);
    assert!(summary.total_moves >= 3);
}

// =============================================================================
// GTP
// =============================================================================

fn gtp_session(input: &str) -> String {
    let mut engine = GtpEngine::new(Box::new(RandomPlayer::with_seed(5)));
    let mut out = Vec::new();
    engine.run_io(input.as_bytes(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_gtp_session() {
    let input = format!(
        "1 boardsize {N}\n2 clear_board\n3 play b A1\n4 play b A2\n5 genmove w\n6 final_score\n7 quit\n"
    );
    let out = gtp_session(&input);
    let replies: Vec<&str> = out.split("\n\n").filter(|r| !r.is_empty()).collect();
    assert_eq!(replies.len(), 7);
    assert_eq!(replies[0], "=1");
    assert_eq!(replies[1], "=2");
    assert_eq!(replies[2], "=3");
    assert!(replies[3].starts_with("?4"), "Black cannot move twice");
    assert!(replies[4].starts_with("=5 "));
    assert!(replies[5].starts_with("=6 "));
    assert_eq!(replies[6], "=7");
}

#[test]
fn test_gtp_rejects_other_board_sizes() {
    let out = gtp_session("boardsize 19\n");
    assert!(out.starts_with('?'));
}
