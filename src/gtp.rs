//! Go Text Protocol (GTP) implementation.
//!
//! GTP is a text-based protocol for communicating with Go-playing programs.
//! This module implements the subset of GTP version 2 needed to play games
//! through a graphical interface or a game server.
//!
//! ## Supported Commands
//!
//! - `name` - Return engine name
//! - `version` - Return engine version
//! - `protocol_version` - Return GTP protocol version (2)
//! - `list_commands` - List all supported commands
//! - `known_command <cmd>` - Check if a command is supported
//! - `quit` - Exit the program
//! - `boardsize <size>` - Accept the compiled board size only
//! - `clear_board` - Reset the board to empty and forget the search
//! - `komi <value>` - Set komi
//! - `play <color> <vertex>` - Play a move
//! - `genmove <color>` - Generate and play a move for the given color
//! - `final_score` - Score the current board, e.g. `W+7.5`
//! - `winrate` - Black's win rate from the last generated move
//!
//! Malformed or illegal input gets a `?` response. Asking for a move for the
//! side that is not to move, or a failing search, ends the session.

use std::io::{self, BufRead, Write};

use log::{debug, error, info};
use thiserror::Error;

use crate::action::{parse_color, Action};
use crate::board::Color;
use crate::constants::{DEFAULT_KOMI, N};
use crate::game::{GameError, GameState};
use crate::mcts::{SearchError, win_rate_for};
use crate::player::Player;
use crate::sgf::result_tag;

/// The list of known GTP commands.
const KNOWN_COMMANDS: &[&str] = &[
    "boardsize",
    "clear_board",
    "final_score",
    "genmove",
    "known_command",
    "komi",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "version",
    "winrate",
];

/// Errors that end a GTP session.
#[derive(Debug, Error)]
pub enum GtpError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("genmove for {requested:?} but {to_move:?} is to move")]
    WrongTurn { requested: Color, to_move: Color },
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    #[error("engine produced an illegal move: {0}")]
    Game(#[from] GameError),
}

/// GTP engine state.
pub struct GtpEngine {
    /// Current game position
    state: GameState,
    player: Box<dyn Player>,
    komi: f32,
    /// Black's win rate as seen by the last `genmove` search
    last_win_rate: Option<f32>,
}

impl GtpEngine {
    pub fn new(player: Box<dyn Player>) -> Self {
        Self {
            state: GameState::new(DEFAULT_KOMI),
            player,
            komi: DEFAULT_KOMI,
            last_win_rate: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Run the GTP command loop, reading from stdin and writing to stdout.
    pub fn run(&mut self) -> Result<(), GtpError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_io(stdin.lock(), stdout.lock())
    }

    /// Run the GTP command loop over arbitrary streams.
    pub fn run_io<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<(), GtpError> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            debug!("received: {line}");

            // Parse optional command ID
            let (id, command_line) = Self::parse_id(line);

            // Parse command and arguments
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((first, args)) = parts.split_first() else {
                continue;
            };
            let command = first.to_lowercase();

            let (success, message) = match self.execute(&command, args) {
                Ok(response) => response,
                Err(e) => {
                    error!("GTP session aborted: {e}");
                    return Err(e);
                }
            };

            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            if message.is_empty() {
                write!(output, "{prefix}{id_str}\n\n")?;
            } else {
                write!(output, "{prefix}{id_str} {message}\n\n")?;
            }
            output.flush()?;
            debug!("{:?}", self.state.board(0));

            // Quit if requested
            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        if end > 0 {
            if let Ok(id) = trimmed[..end].parse::<u32>() {
                return (Some(id), trimmed[end..].trim());
            }
        }
        (None, trimmed)
    }

    /// Execute a GTP command and return (success, response).
    ///
    /// `Err` means the session cannot continue.
    fn execute(&mut self, command: &str, args: &[&str]) -> Result<(bool, String), GtpError> {
        let reply = match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, "2".to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => match args.first() {
                Some(cmd) => {
                    let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                    (true, known.to_string())
                }
                None => (false, "missing argument".to_string()),
            },

            "quit" => (true, String::new()),

            "boardsize" => match args.first().map(|s| s.parse::<usize>()) {
                None => (false, "missing argument".to_string()),
                Some(Ok(size)) if size == N => (true, String::new()),
                Some(Ok(size)) => (
                    false,
                    format!("unacceptable size, only {N} is supported (got {size})"),
                ),
                Some(Err(_)) => (false, "invalid size".to_string()),
            },

            "clear_board" => {
                self.state = GameState::new(self.komi);
                self.player.reset();
                self.last_win_rate = None;
                (true, String::new())
            }

            "komi" => match args.first().map(|s| s.parse::<f32>()) {
                Some(Ok(komi)) => {
                    self.komi = komi;
                    self.state.set_komi(komi);
                    (true, String::new())
                }
                Some(Err(_)) => (false, "invalid komi".to_string()),
                None => (false, "missing argument".to_string()),
            },

            "play" => self.play(args),

            "genmove" => return self.genmove(args),

            "final_score" => {
                let state = &self.state;
                (true, result_tag(state.winner(), false, state.score()))
            }

            "winrate" => match self.last_win_rate {
                Some(wr) => (true, format!("{:.1}", wr * 100.0)),
                None => (false, "no search has been run".to_string()),
            },

            _ => (false, format!("unknown command: {command}")),
        };
        Ok(reply)
    }

    fn play(&mut self, args: &[&str]) -> (bool, String) {
        let line = format!("play {}", args.join(" "));
        let action = match line.parse::<Action>() {
            Ok(action) => action,
            Err(e) => return (false, e.to_string()),
        };
        match self.state.play_move(action) {
            Ok(()) => (true, String::new()),
            Err(e) => (false, e.to_string()),
        }
    }

    fn genmove(&mut self, args: &[&str]) -> Result<(bool, String), GtpError> {
        let color = match args.first().map(|s| parse_color(s)) {
            Some(Ok(color)) => color,
            Some(Err(e)) => return Ok((false, e.to_string())),
            None => return Ok((false, "missing argument".to_string())),
        };
        if self.state.is_done() {
            return Ok((false, "game is over".to_string()));
        }
        if color != self.state.turn() {
            return Err(GtpError::WrongTurn {
                requested: color,
                to_move: self.state.turn(),
            });
        }

        let action = self.player.get_move(&self.state)?;
        self.last_win_rate = self.player.win_rate(&self.state);
        if let Some(visits) = self.player.visit_counts(&self.state) {
            debug!("visits: {visits:?}");
        }
        self.state.play_move(action)?;
        match self.last_win_rate {
            Some(wr) => info!(
                "genmove {}: {} (win rate {:.1}%)",
                color.letter(),
                action.gtp_vertex(),
                win_rate_for(color, wr) * 100.0
            ),
            None => info!("genmove {}: {}", color.letter(), action.gtp_vertex()),
        }
        Ok((true, action.gtp_vertex()))
    }
}
