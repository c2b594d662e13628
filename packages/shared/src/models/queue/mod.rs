use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::variant::GameVariant;

/// A player waiting for an opponent in one variant's pool.
/// At most one ticket exists per (player, variant).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WaitingTicket {
    pub player_id: String,
    pub variant: GameVariant,
    pub enqueued_at: DateTime<Utc>,
}

impl WaitingTicket {
    pub fn new(player_id: &str, variant: GameVariant) -> Self {
        WaitingTicket {
            player_id: player_id.to_string(),
            variant,
            enqueued_at: Utc::now(),
        }
    }

    pub fn has_expired(&self, now: DateTime<Utc>, wait_timeout: chrono::Duration) -> bool {
        now - self.enqueued_at > wait_timeout
    }
}

/// Result of enqueueing or polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueOutcome {
    Waiting,
    Paired { match_id: String },
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantQueueStatus {
    pub variant: GameVariant,
    pub waiting: usize,
    pub pairing: usize,
}
