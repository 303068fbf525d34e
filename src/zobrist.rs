//! Random feature keys for incremental position hashing.
//!
//! A [`GameState`](crate::game::GameState) hash is the XOR of one key per
//! present feature: a black stone on a cell, a white stone on a cell, and
//! "black to move". Tables are immutable once built and shared through `Arc`.

use std::sync::{Arc, OnceLock};

use crate::board::{Color, Point};
use crate::constants::{CELLS, ZOBRIST_FEATURES, ZOBRIST_SEED};

/// An immutable table of non-zero random keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZobristTable {
    values: Vec<u64>,
}

impl ZobristTable {
    /// Build a table with `features` keys drawn from a seeded generator.
    pub fn with_seed(features: usize, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        Self {
            values: (0..features).map(|_| rng.u64(1..=u64::MAX)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn value(&self, index: usize) -> u64 {
        self.values[index]
    }

    /// Key for a stone of `color` on `pt`.
    #[inline]
    pub fn stone(&self, color: Color, pt: Point) -> u64 {
        match color {
            Color::Black => self.values[pt],
            Color::White => self.values[CELLS + pt],
        }
    }

    /// Key toggled whenever the side to move changes.
    #[inline]
    pub fn black_to_move(&self) -> u64 {
        self.values[2 * CELLS]
    }
}

/// The process-wide table used by [`GameState::new`](crate::game::GameState::new).
///
/// Built once from a fixed seed so hashes are stable across runs.
pub fn default_table() -> Arc<ZobristTable> {
    static TABLE: OnceLock<Arc<ZobristTable>> = OnceLock::new();
    TABLE
        .get_or_init(|| Arc::new(ZobristTable::with_seed(ZOBRIST_FEATURES, ZOBRIST_SEED)))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_nonzero() {
        let table = ZobristTable::with_seed(ZOBRIST_FEATURES, 7);
        assert_eq!(table.len(), ZOBRIST_FEATURES);
        assert!((0..table.len()).all(|i| table.value(i) != 0));
    }

    #[test]
    fn test_same_seed_same_table() {
        assert_eq!(
            ZobristTable::with_seed(ZOBRIST_FEATURES, 42),
            ZobristTable::with_seed(ZOBRIST_FEATURES, 42)
        );
    }

    #[test]
    fn test_stone_keys_differ_by_color() {
        let table = default_table();
        for pt in 0..CELLS {
            assert_ne!(table.stone(Color::Black, pt), table.stone(Color::White, pt));
        }
    }

    #[test]
    fn test_default_table_is_shared() {
        assert!(Arc::ptr_eq(&default_table(), &default_table()));
    }
}
