use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::board::{Board, BOARD_SIZE};
use crate::models::game_session::Color;

/// A move as declared by the client. Nothing here is checked against chess
/// rules; the submitted board is taken at face value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveRequest {
    pub from_row: Option<u8>,
    pub from_col: Option<u8>,
    pub to_row: Option<u8>,
    pub to_col: Option<u8>,
    pub piece: Option<String>,
    pub captured_piece: Option<String>,
    #[serde(default)]
    pub castled: bool,
    pub promotion: Option<String>,
    pub player_color: Option<Color>,
    pub board: Option<Board>,
    pub fen_after: Option<String>,
}

/// A move whose payload has passed shape validation.
#[derive(Debug, Clone)]
pub struct ValidatedMove {
    pub from: (u8, u8),
    pub to: (u8, u8),
    pub piece: String,
    pub captured: bool,
    pub castled: bool,
    pub board: Board,
    pub fen_after: Option<String>,
}

impl MoveRequest {
    pub fn validate(&self) -> Result<ValidatedMove, String> {
        let (Some(from_row), Some(from_col), Some(to_row), Some(to_col)) =
            (self.from_row, self.from_col, self.to_row, self.to_col)
        else {
            return Err("Move coordinates cannot be null".to_string());
        };

        let limit = BOARD_SIZE as u8;
        if [from_row, from_col, to_row, to_col].iter().any(|c| *c >= limit) {
            return Err("Move coordinates must be within the board".to_string());
        }

        let piece = match self.piece.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Err("Piece cannot be null".to_string()),
        };

        let board = match &self.board {
            Some(board) if board.is_well_formed() => board.clone(),
            Some(_) => {
                return Err(
                    "Board must be 8x8 with an empty string or one piece letter per square"
                        .to_string(),
                )
            }
            None => return Err("Board cannot be null".to_string()),
        };

        Ok(ValidatedMove {
            from: (from_row, from_col),
            to: (to_row, to_col),
            piece,
            captured: self
                .captured_piece
                .as_deref()
                .is_some_and(|p| !p.is_empty()),
            castled: self.castled,
            board,
            fen_after: self.fen_after.clone().filter(|f| !f.is_empty()),
        })
    }
}

fn file_of(col: u8) -> char {
    (b'a' + col) as char
}

fn rank_of(row: u8) -> u8 {
    8 - row
}

impl ValidatedMove {
    /// Short algebraic-style notation: `O-O`, `O-O-O`, `e4`, `Nxf3`.
    pub fn notation(&self) -> String {
        if self.castled {
            return if self.to.1 == 6 {
                "O-O".to_string()
            } else {
                "O-O-O".to_string()
            };
        }

        let piece = if self.piece.eq_ignore_ascii_case("p") {
            String::new()
        } else {
            self.piece.to_uppercase()
        };
        let capture = if self.captured { "x" } else { "" };

        format!(
            "{}{}{}{}",
            piece,
            capture,
            file_of(self.to.1),
            rank_of(self.to.0)
        )
    }

    /// Coordinate notation stored on the durable record, e.g. `e2e4`.
    pub fn uci(&self) -> String {
        format!(
            "{}{}{}{}",
            file_of(self.from.1),
            rank_of(self.from.0),
            file_of(self.to.1),
            rank_of(self.to.0)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResult {
    pub match_id: String,
    pub player_id: String,
    pub player_color: Color,
    pub board: Board,
    pub white_to_move: bool,
    pub notation: String,
    pub white_seconds: Option<i64>,
    pub black_seconds: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) fn pawn_push() -> MoveRequest {
    let mut board = Board::initial();
    board.0[6][4] = String::new();
    board.0[4][4] = "P".to_string();
    MoveRequest {
        from_row: Some(6),
        from_col: Some(4),
        to_row: Some(4),
        to_col: Some(4),
        piece: Some("P".to_string()),
        board: Some(board),
        ..Default::default()
    }
}
