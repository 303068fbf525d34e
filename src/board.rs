//! Stone colors, board points and the flat board grid.

use std::fmt;

use crate::constants::{CELLS, N, NEIGHBORS};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// +1 for Black, -1 for White. Values are stored from Black's perspective.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Color::Black => 1.0,
            Color::White => -1.0,
        }
    }

    /// Single-letter form used by GTP and SGF.
    pub fn letter(self) -> char {
        match self {
            Color::Black => 'B',
            Color::White => 'W',
        }
    }
}

/// A cell of the board as a flat index `x * N + y`.
pub type Point = usize;

#[inline]
pub fn point(x: usize, y: usize) -> Point {
    x * N + y
}

#[inline]
pub fn coords(pt: Point) -> (usize, usize) {
    (pt / N, pt % N)
}

/// Orthogonal neighbours of `pt` that are on the board.
pub fn neighbors(pt: Point) -> impl Iterator<Item = Point> {
    let (x, y) = coords(pt);
    NEIGHBORS.iter().filter_map(move |&(dx, dy)| {
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < N && ny < N).then(|| point(nx, ny))
    })
}

/// One board snapshot; `None` is an empty cell.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [Option<Color>; CELLS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self { cells: [None; CELLS] }
    }

    #[inline]
    pub fn get(&self, pt: Point) -> Option<Color> {
        self.cells[pt]
    }

    #[inline]
    pub fn set(&mut self, pt: Point, stone: Option<Color>) {
        self.cells[pt] = stone;
    }

    #[inline]
    pub fn is_empty_at(&self, pt: Point) -> bool {
        self.cells[pt].is_none()
    }

    pub fn stones(&self, color: Color) -> impl Iterator<Item = Point> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(pt, &c)| (c == Some(color)).then_some(pt))
    }

    /// Flood fill from `start` through same-colored stones.
    ///
    /// Returns the chain members and the number of distinct empty cells
    /// adjacent to the chain.
    pub fn chain_at(&self, start: Point) -> (Vec<Point>, usize) {
        let Some(color) = self.cells[start] else {
            return (Vec::new(), 0);
        };
        let mut stack = vec![start];
        let mut visited = [false; CELLS];
        let mut liberty_seen = [false; CELLS];
        let mut members = Vec::new();
        let mut liberties = 0;

        visited[start] = true;
        while let Some(pt) = stack.pop() {
            members.push(pt);
            for n in neighbors(pt) {
                match self.cells[n] {
                    None if !liberty_seen[n] => {
                        liberty_seen[n] = true;
                        liberties += 1;
                    }
                    Some(c) if c == color && !visited[n] => {
                        visited[n] = true;
                        stack.push(n);
                    }
                    _ => {}
                }
            }
        }
        (members, liberties)
    }

    /// Mark every cell reachable from a stone of `color` without crossing
    /// a stone of the opposite color.
    pub fn reachable_from(&self, color: Color) -> [bool; CELLS] {
        let blocker = Some(color.opponent());
        let mut reached = [false; CELLS];
        let mut stack: Vec<Point> = self.stones(color).collect();
        for &pt in &stack {
            reached[pt] = true;
        }
        while let Some(pt) = stack.pop() {
            for n in neighbors(pt) {
                if !reached[n] && self.cells[n] != blocker {
                    reached[n] = true;
                    stack.push(n);
                }
            }
        }
        reached
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for x in 0..N {
            for y in 0..N {
                let ch = match self.get(point(x, y)) {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n{self}")
    }
}
