use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::board::Board;
use crate::models::game_session::GameOverReason;
use crate::models::variant::GameVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    InProgress,
    Player1Won,
    Player2Won,
    Draw,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::InProgress => "IN_PROGRESS",
            MatchStatus::Player1Won => "PLAYER1_WON",
            MatchStatus::Player2Won => "PLAYER2_WON",
            MatchStatus::Draw => "DRAW",
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, MatchStatus::InProgress)
    }
}

/// Durable record of a match. Lags behind the live session and is
/// rewritten after every accepted transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub player1_id: String,
    pub player2_id: String,
    pub variant: GameVariant,
    pub status: MatchStatus,
    pub current_ply: u32,
    pub white_seconds: Option<i64>,
    pub black_seconds: Option<i64>,
    pub fen_snapshot: Option<String>,
    /// Coordinate form of the last accepted move, e.g. `e2e4`.
    pub last_move_notation: Option<String>,
    pub end_reason: Option<GameOverReason>,
    pub created_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MatchRecord {
    /// A freshly paired match: player1 plays white, clocks seeded from the variant.
    pub fn new(player1_id: &str, player2_id: &str, variant: GameVariant) -> Self {
        let now = Utc::now();
        MatchRecord {
            id: Uuid::new_v4().to_string(),
            player1_id: player1_id.to_string(),
            player2_id: player2_id.to_string(),
            variant,
            status: MatchStatus::InProgress,
            current_ply: 0,
            white_seconds: variant.base_seconds(),
            black_seconds: variant.base_seconds(),
            fen_snapshot: Some(Board::initial().to_fen(true)),
            last_move_notation: None,
            end_reason: None,
            created_at: now,
            started_at: now,
            finished_at: None,
            updated_at: None,
        }
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        self.player1_id == player_id || self.player2_id == player_id
    }

    /// Side to move derived from ply parity; used when no live session exists.
    pub fn white_to_move(&self) -> bool {
        self.current_ply % 2 == 0
    }

    pub fn winner_id(&self) -> Option<&str> {
        match self.status {
            MatchStatus::Player1Won => Some(&self.player1_id),
            MatchStatus::Player2Won => Some(&self.player2_id),
            MatchStatus::InProgress | MatchStatus::Draw => None,
        }
    }

    /// Whether `next` may replace this stored record: finished records are
    /// never overwritten and plies never go backwards.
    pub fn accepts_update(&self, next: &MatchRecord) -> bool {
        !self.status.is_finished() && self.current_ply <= next.current_ply
    }
}
