use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::board::Board;
use crate::models::match_record::{MatchRecord, MatchStatus};
use crate::models::variant::GameVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameOverReason {
    TimeOut,
    Resignation,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Waiting,
    InProgress,
    GameOver {
        reason: GameOverReason,
        winner_id: Option<String>,
    },
}

impl SessionStatus {
    fn rank(&self) -> u8 {
        match self {
            SessionStatus::Waiting => 0,
            SessionStatus::InProgress => 1,
            SessionStatus::GameOver { .. } => 2,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, SessionStatus::InProgress)
    }

    pub fn is_over(&self) -> bool {
        matches!(self, SessionStatus::GameOver { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal session transition from {from:?} to {to:?}")]
pub struct IllegalTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

/// Live, authoritative state of one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub match_id: String,
    pub player1_id: String,
    pub player2_id: String,
    pub variant: GameVariant,
    pub board: Board,
    pub white_to_move: bool,
    pub status: SessionStatus,
    pub last_move_at: DateTime<Utc>,
    pub white_seconds: Option<i64>,
    pub black_seconds: Option<i64>,
    pub ply: u32,
    pub last_move_notation: Option<String>,
}

impl SessionState {
    /// Builds the session for a match on first access. A record that already
    /// carries moves resumes from its stored FEN, with the side to move taken
    /// from ply parity.
    pub fn from_record(record: &MatchRecord) -> Self {
        let board = record
            .fen_snapshot
            .as_deref()
            .and_then(Board::from_fen)
            .unwrap_or_else(Board::initial);

        let status = match record.status {
            MatchStatus::InProgress => SessionStatus::InProgress,
            MatchStatus::Draw => SessionStatus::GameOver {
                reason: record.end_reason.unwrap_or(GameOverReason::Draw),
                winner_id: None,
            },
            MatchStatus::Player1Won | MatchStatus::Player2Won => SessionStatus::GameOver {
                reason: record.end_reason.unwrap_or(GameOverReason::Resignation),
                winner_id: record.winner_id().map(str::to_string),
            },
        };

        SessionState {
            match_id: record.id.clone(),
            player1_id: record.player1_id.clone(),
            player2_id: record.player2_id.clone(),
            variant: record.variant,
            board,
            white_to_move: record.white_to_move(),
            status,
            last_move_at: Utc::now(),
            white_seconds: record.white_seconds,
            black_seconds: record.black_seconds,
            ply: record.current_ply,
            last_move_notation: record.last_move_notation.clone(),
        }
    }

    pub fn color_of(&self, player_id: &str) -> Option<Color> {
        if self.player1_id == player_id {
            Some(Color::White)
        } else if self.player2_id == player_id {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn player_for(&self, color: Color) -> &str {
        match color {
            Color::White => &self.player1_id,
            Color::Black => &self.player2_id,
        }
    }

    pub fn opponent_of(&self, player_id: &str) -> Option<&str> {
        self.color_of(player_id)
            .map(|color| self.player_for(color.opposite()))
    }

    pub fn side_to_move(&self) -> Color {
        if self.white_to_move {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn is_turn_of(&self, player_id: &str) -> bool {
        self.player_for(self.side_to_move()) == player_id
    }

    pub fn fen(&self) -> String {
        self.board.to_fen(self.white_to_move)
    }

    pub fn clock_of(&self, color: Color) -> Option<i64> {
        match color {
            Color::White => self.white_seconds,
            Color::Black => self.black_seconds,
        }
    }

    pub fn set_clock(&mut self, color: Color, seconds: i64) {
        match color {
            Color::White => self.white_seconds = Some(seconds),
            Color::Black => self.black_seconds = Some(seconds),
        }
    }

    /// Moves the status forward. `GAME_OVER` is terminal and states are never revisited.
    pub fn transition(&mut self, next: SessionStatus) -> Result<(), IllegalTransition> {
        if next.rank() <= self.status.rank() {
            return Err(IllegalTransition {
                from: self.status.clone(),
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Ends the game. Fails if it is already over.
    pub fn finish(
        &mut self,
        reason: GameOverReason,
        winner_id: Option<String>,
    ) -> Result<(), IllegalTransition> {
        self.transition(SessionStatus::GameOver { reason, winner_id })
    }

    /// Copies the live state onto the durable record, ready to be saved.
    pub fn apply_to(&self, record: &mut MatchRecord) {
        let now = Utc::now();
        record.current_ply = self.ply;
        record.fen_snapshot = Some(self.fen());
        record.white_seconds = self.white_seconds;
        record.black_seconds = self.black_seconds;
        record.last_move_notation = self.last_move_notation.clone();
        record.updated_at = Some(now);
        if let SessionStatus::GameOver { reason, winner_id } = &self.status {
            record.status = match winner_id.as_deref() {
                Some(id) if id == self.player1_id => MatchStatus::Player1Won,
                Some(_) => MatchStatus::Player2Won,
                None => MatchStatus::Draw,
            };
            record.end_reason = Some(*reason);
            record.finished_at.get_or_insert(now);
        }
    }
}

/// One participant's view of a live session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub match_id: String,
    pub player_color: Color,
    pub is_my_turn: bool,
    pub status: SessionStatus,
    pub board: Board,
    pub fen: String,
    pub variant: GameVariant,
    pub white_seconds: Option<i64>,
    pub black_seconds: Option<i64>,
    pub ply: u32,
    pub last_move_notation: Option<String>,
    pub opponent_id: String,
}
