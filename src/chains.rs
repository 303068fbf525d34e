//! Union-find over occupied cells.
//!
//! Every stone points at a parent cell; following parents ends at the chain
//! head. Only the head carries the member list and the liberty count, the
//! slots of every other cell are stale. Merging attaches the smaller chain
//! under the larger one and re-parents all its members, so chains stay flat
//! and `find` rarely has to halve a path.

use crate::board::{neighbors, Board, Color, Point};
use crate::constants::CELLS;

#[derive(Clone)]
pub struct Chains {
    parent: [Point; CELLS],
    liberties: [u32; CELLS],
    members: Vec<Vec<Point>>,
}

impl Default for Chains {
    fn default() -> Self {
        Self::new()
    }
}

impl Chains {
    pub fn new() -> Self {
        Self {
            parent: std::array::from_fn(|pt| pt),
            liberties: [0; CELLS],
            members: vec![Vec::new(); CELLS],
        }
    }

    /// Find the head of `pt`'s chain, halving the path on the way.
    pub fn find(&mut self, mut pt: Point) -> Point {
        while self.parent[pt] != pt {
            let grandparent = self.parent[self.parent[pt]];
            self.parent[pt] = grandparent;
            pt = grandparent;
        }
        pt
    }

    /// Find the head of `pt`'s chain without compressing.
    pub fn head(&self, mut pt: Point) -> Point {
        while self.parent[pt] != pt {
            pt = self.parent[pt];
        }
        pt
    }

    /// Liberty count of the chain headed by `head`.
    #[inline]
    pub fn liberties(&self, head: Point) -> u32 {
        self.liberties[head]
    }

    /// Members of the chain headed by `head`.
    #[inline]
    pub fn members(&self, head: Point) -> &[Point] {
        &self.members[head]
    }

    #[inline]
    pub fn size(&self, head: Point) -> usize {
        self.members[head].len()
    }

    /// Start a single-stone chain on `pt`.
    pub fn place(&mut self, pt: Point) {
        self.parent[pt] = pt;
        self.liberties[pt] = 0;
        self.members[pt].clear();
        self.members[pt].push(pt);
    }

    /// Merge the chains of `a` and `b`; returns the surviving head.
    pub fn union(&mut self, a: Point, b: Point) -> Point {
        let mut big = self.find(a);
        let mut small = self.find(b);
        if big == small {
            return big;
        }
        if self.members[big].len() < self.members[small].len() {
            std::mem::swap(&mut big, &mut small);
        }
        let moved = std::mem::take(&mut self.members[small]);
        for &pt in &moved {
            self.parent[pt] = big;
        }
        self.members[big].extend(moved);
        big
    }

    /// Take one liberty away from the chain headed by `head`.
    pub fn remove_liberty(&mut self, head: Point) -> u32 {
        debug_assert!(self.liberties[head] > 0, "chain at {head} has no liberty to remove");
        self.liberties[head] -= 1;
        self.liberties[head]
    }

    /// Dissolve the chain headed by `head`, returning its former members.
    pub fn remove(&mut self, head: Point) -> Vec<Point> {
        let stones = std::mem::take(&mut self.members[head]);
        for &pt in &stones {
            self.parent[pt] = pt;
            self.liberties[pt] = 0;
        }
        stones
    }

    /// Recount the distinct empty cells adjacent to the chain headed by `head`.
    pub fn refresh_liberties(&mut self, board: &Board, head: Point) {
        let mut seen = [false; CELLS];
        let mut count = 0;
        for &pt in &self.members[head] {
            for n in neighbors(pt) {
                if board.is_empty_at(n) && !seen[n] {
                    seen[n] = true;
                    count += 1;
                }
            }
        }
        self.liberties[head] = count;
    }

    /// Heads of all chains with at least one stone of the given color on `board`.
    pub fn heads_of(&self, board: &Board, color: Color) -> Vec<Point> {
        board
            .stones(color)
            .filter(|&pt| self.parent[pt] == pt && !self.members[pt].is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::point;

    fn put(board: &mut Board, chains: &mut Chains, pt: Point, color: Color) -> Point {
        board.set(pt, Some(color));
        chains.place(pt);
        let mut head = pt;
        for n in neighbors(pt) {
            if board.get(n) == Some(color) {
                head = chains.union(head, n);
            }
        }
        chains.refresh_liberties(board, head);
        head
    }

    #[test]
    fn test_single_stone_is_its_own_head() {
        let mut board = Board::new();
        let mut chains = Chains::new();
        let pt = point(4, 4);
        let head = put(&mut board, &mut chains, pt, Color::Black);
        assert_eq!(head, pt);
        assert_eq!(chains.find(pt), pt);
        assert_eq!(chains.liberties(head), 4);
        assert_eq!(chains.members(head), &[pt]);
    }

    #[test]
    fn test_union_keeps_larger_head() {
        let mut board = Board::new();
        let mut chains = Chains::new();
        put(&mut board, &mut chains, point(2, 2), Color::Black);
        let big = put(&mut board, &mut chains, point(2, 3), Color::Black);
        put(&mut board, &mut chains, point(2, 4), Color::Black);
        let head = put(&mut board, &mut chains, point(2, 5), Color::Black);

        assert_eq!(head, big, "the first two-stone chain absorbs later stones");
        assert_eq!(chains.size(head), 4);
        for y in 2..=5 {
            assert_eq!(chains.find(point(2, y)), head);
            assert_eq!(chains.head(point(2, y)), head);
        }
        assert_eq!(chains.liberties(head), 10);
    }

    #[test]
    fn test_remove_liberty_counts_down() {
        let mut board = Board::new();
        let mut chains = Chains::new();
        let head = put(&mut board, &mut chains, point(0, 0), Color::Black);
        assert_eq!(chains.remove_liberty(head), 1);
        assert_eq!(chains.remove_liberty(head), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "no liberty to remove")]
    fn test_remove_liberty_below_zero_panics() {
        let mut board = Board::new();
        let mut chains = Chains::new();
        let head = put(&mut board, &mut chains, point(0, 0), Color::Black);
        chains.remove_liberty(head);
        chains.remove_liberty(head);
        chains.remove_liberty(head);
    }

    #[test]
    fn test_remove_resets_members() {
        let mut board = Board::new();
        let mut chains = Chains::new();
        put(&mut board, &mut chains, point(0, 0), Color::White);
        let head = put(&mut board, &mut chains, point(0, 1), Color::White);
        let removed = chains.remove(head);
        assert_eq!(removed.len(), 2);
        for pt in removed {
            assert_eq!(chains.head(pt), pt);
            assert!(chains.members(pt).is_empty());
        }
    }
}
