//! Game records in SGF.
//!
//! A record is built move by move while a game is played and closed with a
//! result tag: `B+R` / `W+R` for a resignation, otherwise the score margin
//! (`B+3.5`, `W+7.5`) or `0` for a draw.

use crate::action::Action;
use crate::board::Color;
use crate::constants::N;

const DRAW_MARGIN: f32 = 1e-8;

#[derive(Debug, Clone)]
pub struct SgfRecord {
    text: String,
}

impl SgfRecord {
    pub fn new(komi: f32) -> Self {
        Self {
            text: format!("(;GM[1]FF[4]CA[UTF-8]SZ[{N}]KM[{komi:.2}]\nPW[White]PB[Black]\n"),
        }
    }

    /// Append one ply, optionally followed by the root visit counts that chose it.
    pub fn push_move(&mut self, action: Action, visits: Option<&[(usize, u32)]>) {
        self.text.push_str(&action.to_sgf());
        if let Some(visits) = visits {
            let counts: Vec<String> = visits.iter().map(|(index, n)| format!("{index} {n}")).collect();
            self.text.push_str(&format!("C[{}]\n", counts.join(",")));
        }
    }

    /// Close the record with its result tag.
    pub fn finish(mut self, winner: Option<Color>, resigned: bool, score: f32) -> String {
        self.text
            .push_str(&format!("RE[{}])", result_tag(winner, resigned, score)));
        self.text
    }
}

/// The SGF result value, e.g. `B+R`, `W+7.5` or `0`.
pub fn result_tag(winner: Option<Color>, resigned: bool, score: f32) -> String {
    if resigned {
        return match winner {
            Some(color) => format!("{}+R", color.letter()),
            None => "0".into(),
        };
    }
    if score > DRAW_MARGIN {
        format!("B+{score}")
    } else if score < -DRAW_MARGIN {
        format!("W+{}", -score)
    } else {
        "0".into()
    }
}
