use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::models::events::GameEvent;
use crate::repositories::errors::notification_repository_errors::NotificationRepositoryError;

#[cfg(test)]
use mockall::automock;

const CHANNEL_CAPACITY: usize = 64;

/// An event together with the destination it was addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub destination: String,
    pub event: GameEvent,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Fire-and-forget delivery to everyone subscribed to `topic`.
    async fn broadcast(&self, topic: &str, event: &GameEvent)
        -> Result<(), NotificationRepositoryError>;

    /// Delivery to a single player. Fails with `Unreachable` when the player
    /// has no live subscription.
    async fn unicast(
        &self,
        player_id: &str,
        destination: &str,
        event: &GameEvent,
    ) -> Result<(), NotificationRepositoryError>;
}

/// Fan-out hub backing the WebSocket endpoint. One broadcast channel per
/// topic and one per connected player.
#[derive(Default)]
pub struct InProcessNotificationRepository {
    topics: DashMap<String, broadcast::Sender<Notification>>,
    players: DashMap<String, broadcast::Sender<Notification>>,
}

impl InProcessNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_topic(&self, topic: &str) -> broadcast::Receiver<Notification> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn subscribe_player(&self, player_id: &str) -> broadcast::Receiver<Notification> {
        info!("Player {} subscribed for notifications", player_id);
        self.players
            .entry(player_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Forgets channels nobody listens to any more.
    pub fn prune(&self) -> usize {
        let before = self.topics.len() + self.players.len();
        self.topics.retain(|_, tx| tx.receiver_count() > 0);
        self.players.retain(|_, tx| tx.receiver_count() > 0);
        before - (self.topics.len() + self.players.len())
    }
}

#[async_trait]
impl NotificationRepository for InProcessNotificationRepository {
    async fn broadcast(
        &self,
        topic: &str,
        event: &GameEvent,
    ) -> Result<(), NotificationRepositoryError> {
        let delivered = self
            .topics
            .get(topic)
            .and_then(|tx| {
                tx.send(Notification {
                    destination: topic.to_string(),
                    event: event.clone(),
                })
                .ok()
            })
            .unwrap_or(0);
        debug!("Broadcast to {} reached {} subscribers", topic, delivered);
        Ok(())
    }

    async fn unicast(
        &self,
        player_id: &str,
        destination: &str,
        event: &GameEvent,
    ) -> Result<(), NotificationRepositoryError> {
        let sent = self.players.get(player_id).and_then(|tx| {
            tx.send(Notification {
                destination: destination.to_string(),
                event: event.clone(),
            })
            .ok()
        });
        match sent {
            Some(_) => Ok(()),
            None => Err(NotificationRepositoryError::Unreachable(
                player_id.to_string(),
            )),
        }
    }
}
