//! A single ply: play, pass or resign, for one color.
//!
//! An [`Action`] is a signed integer. Its magnitude is the action index plus
//! one (`x * N + y` for plays, [`PASS_INDEX`] for pass, [`RESIGN_INDEX`] for
//! resign) and its sign is the color: positive for Black, negative for White.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::board::{coords, point, Color, Point};
use crate::constants::{CELLS, N, PASS_INDEX, RESIGN_INDEX};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Play { x: usize, y: usize },
    Pass,
    Resign,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Action(i32);

/// Malformed protocol input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseActionError {
    #[error("expected `play <color> <vertex>`, got {0:?}")]
    Format(String),
    #[error("unknown color {0:?}")]
    Color(String),
    #[error("invalid vertex {0:?}")]
    Vertex(String),
}

impl Action {
    /// Build from a canonical index; `None` if the index is out of range.
    pub fn from_index(color: Color, index: usize) -> Option<Action> {
        (index <= RESIGN_INDEX).then(|| Self::encode(color, index))
    }

    /// A stone on row `x`, column `y`.
    ///
    /// # Panics
    /// If the coordinates are off the board.
    pub fn play(color: Color, x: usize, y: usize) -> Action {
        assert!(x < N && y < N, "play ({x}, {y}) is off the {N}x{N} board");
        Self::encode(color, point(x, y))
    }

    pub fn pass(color: Color) -> Action {
        Self::encode(color, PASS_INDEX)
    }

    pub fn resign(color: Color) -> Action {
        Self::encode(color, RESIGN_INDEX)
    }

    pub fn new(color: Color, kind: ActionKind) -> Action {
        match kind {
            ActionKind::Play { x, y } => Self::play(color, x, y),
            ActionKind::Pass => Self::pass(color),
            ActionKind::Resign => Self::resign(color),
        }
    }

    fn encode(color: Color, index: usize) -> Action {
        let magnitude = index as i32 + 1;
        match color {
            Color::Black => Action(magnitude),
            Color::White => Action(-magnitude),
        }
    }

    #[inline]
    pub fn color(self) -> Color {
        if self.0 > 0 { Color::Black } else { Color::White }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0.unsigned_abs() as usize - 1
    }

    pub fn kind(self) -> ActionKind {
        match self.index() {
            PASS_INDEX => ActionKind::Pass,
            RESIGN_INDEX => ActionKind::Resign,
            pt => {
                let (x, y) = coords(pt);
                ActionKind::Play { x, y }
            }
        }
    }

    /// The board point of a play, `None` for pass and resign.
    pub fn point(self) -> Option<Point> {
        let index = self.index();
        (index < CELLS).then_some(index)
    }

    /// GTP vertex, e.g. `D4`; columns skip `I` and rows count up from the bottom.
    pub fn gtp_vertex(self) -> String {
        match self.kind() {
            ActionKind::Pass => "pass".into(),
            ActionKind::Resign => "resign".into(),
            ActionKind::Play { x, y } => {
                let mut col = b'A' + y as u8;
                if col >= b'I' {
                    col += 1;
                }
                format!("{}{}", col as char, N - x)
            }
        }
    }

    /// SGF token, e.g. `;B[cd]`. A pass is `;B[]` and a resignation has no token.
    pub fn to_sgf(self) -> String {
        let color = self.color().letter();
        match self.kind() {
            ActionKind::Resign => String::new(),
            ActionKind::Pass => format!(";{color}[]"),
            ActionKind::Play { x, y } => {
                format!(";{color}[{}{}]", (b'a' + x as u8) as char, (b'a' + y as u8) as char)
            }
        }
    }

    /// Build an action from a GTP color word and vertex.
    pub fn from_gtp(color: &str, vertex: &str) -> Result<Action, ParseActionError> {
        let color = parse_color(color)?;
        let vertex = vertex.to_ascii_lowercase();
        match vertex.as_str() {
            "pass" => return Ok(Action::pass(color)),
            "resign" => return Ok(Action::resign(color)),
            _ => {}
        }
        let bad = || ParseActionError::Vertex(vertex.clone());
        let mut chars = vertex.chars();
        let col_char = chars.next().filter(|c| c.is_ascii_lowercase()).ok_or_else(bad)?;
        if col_char == 'i' {
            return Err(bad());
        }
        let mut y = (col_char as u8 - b'a') as usize;
        // Skip 'I' column (Go convention to avoid confusion with 'J')
        if col_char > 'i' {
            y -= 1;
        }
        let digits = chars.as_str();
        if digits.is_empty()
            || digits.len() > 2
            || digits.starts_with('0')
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(bad());
        }
        let row: usize = digits.parse().map_err(|_| bad())?;
        if y >= N || row == 0 || row > N {
            return Err(bad());
        }
        Ok(Action::play(color, N - row, y))
    }
}

/// Parse a GTP color word.
pub fn parse_color(s: &str) -> Result<Color, ParseActionError> {
    match s.to_ascii_lowercase().as_str() {
        "b" | "black" => Ok(Color::Black),
        "w" | "white" => Ok(Color::White),
        _ => Err(ParseActionError::Color(s.to_string())),
    }
}

impl FromStr for Action {
    type Err = ParseActionError;

    /// Parse a `play <color> <vertex>` protocol command.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            [cmd, color, vertex] if cmd.eq_ignore_ascii_case("play") => {
                Action::from_gtp(color, vertex)
            }
            _ => Err(ParseActionError::Format(s.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = self.color().letter();
        match self.kind() {
            ActionKind::Play { x, y } => write!(f, "{color} play ({x}, {y})"),
            ActionKind::Pass => write!(f, "{color} pass"),
            ActionKind::Resign => write!(f, "{color} resign"),
        }
    }
}
