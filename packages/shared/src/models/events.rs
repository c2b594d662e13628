use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::board::Board;
use crate::models::game_session::{Color, GameOverReason};
use crate::models::move_request::MoveResult;

/// Unicast destination for draw offers and rejections.
pub const DRAW_OFFERS_QUEUE: &str = "/queue/draw-offers";

/// Broadcast topic every participant of a match subscribes to.
pub fn game_state_topic(match_id: &str) -> String {
    format!("/topic/game-state/{}", match_id)
}

/// Payloads pushed through the notification port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    PlayerJoined {
        match_id: String,
        player_id: String,
        player_color: Color,
        timestamp: i64,
    },
    MoveMade {
        match_id: String,
        player_id: String,
        player_color: Color,
        board: Board,
        white_to_move: bool,
        notation: String,
        white_seconds: Option<i64>,
        black_seconds: Option<i64>,
        timestamp: i64,
    },
    GameOver {
        match_id: String,
        reason: GameOverReason,
        winner_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        resigned_by: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        accepted_by: Option<String>,
        timestamp: i64,
    },
    DrawOffer {
        match_id: String,
        from: String,
        timestamp: i64,
    },
    DrawRejected {
        match_id: String,
        by: String,
        timestamp: i64,
    },
    ChatMessage {
        match_id: String,
        from: String,
        message: String,
        timestamp: i64,
    },
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl GameEvent {
    pub fn player_joined(match_id: &str, player_id: &str, player_color: Color) -> Self {
        GameEvent::PlayerJoined {
            match_id: match_id.to_string(),
            player_id: player_id.to_string(),
            player_color,
            timestamp: now_millis(),
        }
    }

    pub fn move_made(result: &MoveResult) -> Self {
        GameEvent::MoveMade {
            match_id: result.match_id.clone(),
            player_id: result.player_id.clone(),
            player_color: result.player_color,
            board: result.board.clone(),
            white_to_move: result.white_to_move,
            notation: result.notation.clone(),
            white_seconds: result.white_seconds,
            black_seconds: result.black_seconds,
            timestamp: result.timestamp.timestamp_millis(),
        }
    }

    pub fn game_over(match_id: &str, reason: GameOverReason, winner_id: Option<String>) -> Self {
        GameEvent::GameOver {
            match_id: match_id.to_string(),
            reason,
            winner_id,
            resigned_by: None,
            accepted_by: None,
            timestamp: now_millis(),
        }
    }

    pub fn resignation(match_id: &str, winner_id: &str, resigned_by: &str) -> Self {
        GameEvent::GameOver {
            match_id: match_id.to_string(),
            reason: GameOverReason::Resignation,
            winner_id: Some(winner_id.to_string()),
            resigned_by: Some(resigned_by.to_string()),
            accepted_by: None,
            timestamp: now_millis(),
        }
    }

    pub fn draw_agreed(match_id: &str, accepted_by: &str) -> Self {
        GameEvent::GameOver {
            match_id: match_id.to_string(),
            reason: GameOverReason::Draw,
            winner_id: None,
            resigned_by: None,
            accepted_by: Some(accepted_by.to_string()),
            timestamp: now_millis(),
        }
    }

    pub fn draw_offer(match_id: &str, from: &str) -> Self {
        GameEvent::DrawOffer {
            match_id: match_id.to_string(),
            from: from.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn draw_rejected(match_id: &str, by: &str) -> Self {
        GameEvent::DrawRejected {
            match_id: match_id.to_string(),
            by: by.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn chat(match_id: &str, from: &str, message: &str) -> Self {
        GameEvent::ChatMessage {
            match_id: match_id.to_string(),
            from: from.to_string(),
            message: message.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn match_id(&self) -> &str {
        match self {
            GameEvent::PlayerJoined { match_id, .. }
            | GameEvent::MoveMade { match_id, .. }
            | GameEvent::GameOver { match_id, .. }
            | GameEvent::DrawOffer { match_id, .. }
            | GameEvent::DrawRejected { match_id, .. }
            | GameEvent::ChatMessage { match_id, .. } => match_id,
        }
    }
}
