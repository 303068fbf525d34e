//! Property tests for the rules engine.
//!
//! Random legal games are checked against slow reference computations built
//! only on `Board` flood fills.

use proptest::prelude::*;

use roost::action::Action;
use roost::board::{Board, Color, neighbors};
use roost::constants::{CELLS, HISTORY_LEN, PASS_INDEX, TETRIS_CHAIN_SIZE};
use roost::game::GameState;

/// Play the game driven by `choices`, preferring stones over passes.
fn replay(choices: &[u16]) -> GameState {
    let mut state = GameState::new(7.5);
    for &choice in choices {
        if state.is_done() {
            break;
        }
        let legal = state.legal_action_indexes();
        let stones = &legal[..legal.len() - 1];
        let index = if stones.is_empty() {
            PASS_INDEX
        } else {
            stones[choice as usize % stones.len()]
        };
        let action = Action::from_index(state.turn(), index).unwrap();
        state.play_move(action).unwrap();
    }
    state
}

/// Legal points for the side to move, found by trying every empty cell.
fn brute_force_legal(state: &GameState) -> Vec<usize> {
    let board = state.board(0);
    let me = state.turn();
    let mut legal = Vec::new();
    for pt in 0..CELLS {
        if !board.is_empty_at(pt) {
            continue;
        }
        let mut next: Board = *board;
        next.set(pt, Some(me));
        if next.chain_at(pt).0.len() == TETRIS_CHAIN_SIZE {
            continue;
        }
        let mut captured = false;
        for n in neighbors(pt) {
            if next.get(n) == Some(me.opponent()) {
                let (members, liberties) = next.chain_at(n);
                if liberties == 0 {
                    captured = true;
                    for stone in members {
                        next.set(stone, None);
                    }
                }
            }
        }
        if captured {
            if (1..HISTORY_LEN).step_by(2).any(|i| *state.board(i) == next) {
                continue;
            }
        } else if next.chain_at(pt).1 == 0 {
            continue;
        }
        legal.push(pt);
    }
    legal.push(PASS_INDEX);
    legal
}

fn choices() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(any::<u16>(), 0..160)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn hash_matches_recomputation(choices in choices()) {
        let state = replay(&choices);
        prop_assert_eq!(state.hash(), state.compute_hash());
    }

    #[test]
    fn chains_match_flood_fill(choices in choices()) {
        let state = replay(&choices);
        let board = state.board(0);
        for pt in 0..CELLS {
            if board.is_empty_at(pt) {
                prop_assert!(state.chain_head(pt).is_none());
                continue;
            }
            let (mut expected, liberties) = board.chain_at(pt);
            let mut members = state.chain_members(pt).to_vec();
            expected.sort_unstable();
            members.sort_unstable();
            prop_assert_eq!(members, expected);
            prop_assert_eq!(state.chain_liberties(pt), Some(liberties as u32));
            prop_assert!(state.chain_members(pt).len() != TETRIS_CHAIN_SIZE);
        }
    }

    #[test]
    fn legal_moves_match_brute_force(choices in choices()) {
        let state = replay(&choices);
        prop_assume!(!state.is_done());
        prop_assert_eq!(state.legal_action_indexes().to_vec(), brute_force_legal(&state));
    }

    #[test]
    fn scoring_is_pure_and_bounded(choices in choices()) {
        let state = replay(&choices);
        let first = state.score();
        prop_assert_eq!(first, state.score());
        prop_assert!((first + state.komi()).abs() <= CELLS as f32);
        let black = state.board(0).stones(Color::Black).count() as f32;
        let white = state.board(0).stones(Color::White).count() as f32;
        prop_assert!(first + state.komi() <= CELLS as f32 - white);
        prop_assert!(first + state.komi() >= black - CELLS as f32);
    }
}
