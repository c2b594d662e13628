use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    models::{
        match_record::MatchRecord,
        queue::{QueueOutcome, VariantQueueStatus, WaitingTicket},
        variant::GameVariant,
    },
    repositories::match_repository::MatchRepository,
    services::errors::matchmaking_service_errors::MatchmakingServiceError,
};

/// A pairing the waiting player has not collected yet.
struct PendingPairing {
    match_id: String,
    paired_at: DateTime<Utc>,
}

/// Waiting players for one variant.
#[derive(Default)]
struct WaitingPool {
    tickets: HashMap<String, WaitingTicket>,
    /// Both players of a pairing whose match record is being written.
    in_flight: HashSet<String>,
    /// Waiting player -> pairing, until their next poll picks it up or it
    /// outlives the wait timeout.
    paired: HashMap<String, PendingPairing>,
    /// Players whose ticket was swept, with the sweep time; their next poll
    /// reports a timeout.
    expired: HashMap<String, DateTime<Utc>>,
}

impl WaitingPool {
    /// Removes the player's pending pairing, returning its match id only if
    /// it is still within `wait_timeout`.
    fn take_pairing(
        &mut self,
        player_id: &str,
        now: DateTime<Utc>,
        wait_timeout: Duration,
    ) -> Option<String> {
        let pending = self.paired.remove(player_id)?;
        if now - pending.paired_at > wait_timeout {
            debug!(
                "Dropped uncollected pairing {} for {}",
                pending.match_id, player_id
            );
            return None;
        }
        Some(pending.match_id)
    }
}

pub struct MatchmakingService {
    repository: Arc<dyn MatchRepository + Send + Sync>,
    pools: [Mutex<WaitingPool>; 3],
    wait_timeout: Duration,
}

impl MatchmakingService {
    pub fn new(repository: Arc<dyn MatchRepository + Send + Sync>, wait_timeout: Duration) -> Self {
        MatchmakingService {
            repository,
            pools: Default::default(),
            wait_timeout,
        }
    }

    fn pool(&self, variant: GameVariant) -> &Mutex<WaitingPool> {
        let index = match variant {
            GameVariant::Standard => 0,
            GameVariant::Blitz => 1,
            GameVariant::Rapid => 2,
        };
        &self.pools[index]
    }

    /// Pairs the caller with a waiting player, or queues them.
    ///
    /// The player who waited becomes player1 (white). The record is written
    /// with both players reserved but outside the pool lock; on failure the
    /// opponent gets their ticket back.
    pub async fn enqueue(
        &self,
        player_id: &str,
        variant: GameVariant,
    ) -> Result<QueueOutcome, MatchmakingServiceError> {
        if player_id.trim().is_empty() {
            return Err(MatchmakingServiceError::NotAuthenticated);
        }

        let opponent = {
            let mut pool = self.pool(variant).lock().await;
            if pool.tickets.contains_key(player_id) || pool.in_flight.contains(player_id) {
                return Err(MatchmakingServiceError::AlreadyQueued);
            }
            if let Some(match_id) = pool.take_pairing(player_id, Utc::now(), self.wait_timeout) {
                return Ok(QueueOutcome::Paired { match_id });
            }
            pool.expired.remove(player_id);

            // Longest waiting opponent first.
            let opponent_id = pool
                .tickets
                .values()
                .filter(|ticket| ticket.player_id != player_id)
                .min_by_key(|ticket| ticket.enqueued_at)
                .map(|ticket| ticket.player_id.clone());

            let Some(opponent) = opponent_id.and_then(|id| pool.tickets.remove(&id)) else {
                pool.tickets
                    .insert(player_id.to_string(), WaitingTicket::new(player_id, variant));
                info!("Player {} is waiting for a {} match", player_id, variant);
                return Ok(QueueOutcome::Waiting);
            };

            pool.in_flight.insert(opponent.player_id.clone());
            pool.in_flight.insert(player_id.to_string());
            opponent
        };

        let record = MatchRecord::new(&opponent.player_id, player_id, variant);
        let created = self.repository.create_match(&record).await;

        let mut pool = self.pool(variant).lock().await;
        pool.in_flight.remove(player_id);
        pool.in_flight.remove(&opponent.player_id);

        match created {
            Ok(()) => {
                info!(
                    "Paired {} (white) with {} (black) in match {}",
                    opponent.player_id, player_id, record.id
                );
                pool.paired.insert(
                    opponent.player_id.clone(),
                    PendingPairing {
                        match_id: record.id.clone(),
                        paired_at: Utc::now(),
                    },
                );
                Ok(QueueOutcome::Paired {
                    match_id: record.id,
                })
            }
            Err(e) => {
                error!(
                    "Failed to create match for {} and {}: {}",
                    opponent.player_id, player_id, e
                );
                pool.tickets.insert(opponent.player_id.clone(), opponent);
                Err(e.into())
            }
        }
    }

    pub async fn poll(
        &self,
        player_id: &str,
        variant: GameVariant,
    ) -> Result<QueueOutcome, MatchmakingServiceError> {
        let mut pool = self.pool(variant).lock().await;
        let now = Utc::now();

        if let Some(match_id) = pool.take_pairing(player_id, now, self.wait_timeout) {
            return Ok(QueueOutcome::Paired { match_id });
        }
        if pool.in_flight.contains(player_id) {
            return Ok(QueueOutcome::Waiting);
        }
        if pool.expired.remove(player_id).is_some() {
            return Ok(QueueOutcome::TimedOut);
        }

        let expired = match pool.tickets.get(player_id) {
            Some(ticket) => ticket.has_expired(now, self.wait_timeout),
            None => return Err(MatchmakingServiceError::NotWaiting),
        };
        if expired {
            pool.tickets.remove(player_id);
            info!("Player {} timed out waiting for a {} match", player_id, variant);
            return Ok(QueueOutcome::TimedOut);
        }
        Ok(QueueOutcome::Waiting)
    }

    /// Returns whether a ticket was removed. A pairing already in progress
    /// is not undone, but an uncollected pairing notice is discarded.
    pub async fn cancel(&self, player_id: &str, variant: GameVariant) -> bool {
        let mut pool = self.pool(variant).lock().await;
        pool.expired.remove(player_id);
        if let Some(pending) = pool.paired.remove(player_id) {
            debug!(
                "Player {} cancelled before collecting match {}",
                player_id, pending.match_id
            );
        }
        let removed = pool.tickets.remove(player_id).is_some();
        if removed {
            info!("Player {} left the {} queue", player_id, variant);
        }
        removed
    }

    /// Drops every ticket older than the wait timeout across all variants,
    /// along with pairing and timeout notices nobody collected in time.
    /// Returns the number of tickets dropped.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let wait_timeout = self.wait_timeout;
        let mut swept = 0;
        for variant in GameVariant::ALL {
            let mut pool = self.pool(variant).lock().await;

            pool.paired
                .retain(|_, pending| now - pending.paired_at <= wait_timeout);
            pool.expired
                .retain(|_, swept_at| now - *swept_at <= wait_timeout);

            let stale: Vec<String> = pool
                .tickets
                .values()
                .filter(|ticket| ticket.has_expired(now, wait_timeout))
                .map(|ticket| ticket.player_id.clone())
                .collect();
            for player_id in stale {
                pool.tickets.remove(&player_id);
                pool.expired.insert(player_id, now);
                swept += 1;
            }
        }
        if swept > 0 {
            info!("Swept {} expired matchmaking tickets", swept);
        }
        swept
    }

    pub async fn queue_status(&self) -> Vec<VariantQueueStatus> {
        let mut status = Vec::with_capacity(GameVariant::ALL.len());
        for variant in GameVariant::ALL {
            let pool = self.pool(variant).lock().await;
            status.push(VariantQueueStatus {
                variant,
                waiting: pool.tickets.len(),
                pairing: pool.in_flight.len() / 2,
            });
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
    use crate::repositories::match_repository::{InMemoryMatchRepository, MockMatchRepository};

    fn service() -> (MatchmakingService, Arc<InMemoryMatchRepository>) {
        let repo = Arc::new(InMemoryMatchRepository::new());
        (
            MatchmakingService::new(repo.clone(), Duration::seconds(60)),
            repo,
        )
    }

    async fn backdate(service: &MatchmakingService, variant: GameVariant, player: &str, secs: i64) {
        let mut pool = service.pool(variant).lock().await;
        if let Some(ticket) = pool.tickets.get_mut(player) {
            ticket.enqueued_at = Utc::now() - Duration::seconds(secs);
        }
    }

    #[tokio::test]
    async fn test_enqueue_twice_is_rejected() {
        let (service, _) = service();
        assert_eq!(
            service.enqueue("alice", GameVariant::Blitz).await.unwrap(),
            QueueOutcome::Waiting
        );
        assert!(matches!(
            service.enqueue("alice", GameVariant::Blitz).await,
            Err(MatchmakingServiceError::AlreadyQueued)
        ));
        assert_eq!(service.pool(GameVariant::Blitz).lock().await.tickets.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_player_is_not_authenticated() {
        let (service, _) = service();
        assert!(matches!(
            service.enqueue("  ", GameVariant::Rapid).await,
            Err(MatchmakingServiceError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_two_players_pair_into_one_match() {
        let (service, repo) = service();
        service.enqueue("alice", GameVariant::Rapid).await.unwrap();

        let QueueOutcome::Paired { match_id } =
            service.enqueue("bob", GameVariant::Rapid).await.unwrap()
        else {
            panic!("second player should be paired");
        };

        assert_eq!(
            service.poll("alice", GameVariant::Rapid).await.unwrap(),
            QueueOutcome::Paired {
                match_id: match_id.clone()
            }
        );

        let record = repo.get_match(&match_id).await.unwrap();
        assert_eq!(record.player1_id, "alice");
        assert_eq!(record.player2_id, "bob");
        assert_eq!(record.white_seconds, Some(600));

        let pool = service.pool(GameVariant::Rapid).lock().await;
        assert!(pool.tickets.is_empty());
        assert!(pool.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_third_player_cannot_join_formed_pair() {
        let (service, _) = service();
        service.enqueue("alice", GameVariant::Blitz).await.unwrap();
        service.enqueue("bob", GameVariant::Blitz).await.unwrap();

        assert_eq!(
            service.enqueue("carol", GameVariant::Blitz).await.unwrap(),
            QueueOutcome::Waiting
        );
    }

    #[tokio::test]
    async fn test_variants_are_isolated() {
        let (service, _) = service();
        service.enqueue("alice", GameVariant::Blitz).await.unwrap();
        assert_eq!(
            service.enqueue("bob", GameVariant::Rapid).await.unwrap(),
            QueueOutcome::Waiting
        );
    }

    #[tokio::test]
    async fn test_poll_unknown_player_is_not_waiting() {
        let (service, _) = service();
        assert!(matches!(
            service.poll("ghost", GameVariant::Blitz).await,
            Err(MatchmakingServiceError::NotWaiting)
        ));
    }

    #[tokio::test]
    async fn test_poll_times_out_stale_ticket() {
        let (service, _) = service();
        service.enqueue("alice", GameVariant::Blitz).await.unwrap();
        assert_eq!(
            service.poll("alice", GameVariant::Blitz).await.unwrap(),
            QueueOutcome::Waiting
        );

        backdate(&service, GameVariant::Blitz, "alice", 61).await;
        assert_eq!(
            service.poll("alice", GameVariant::Blitz).await.unwrap(),
            QueueOutcome::TimedOut
        );
        assert!(matches!(
            service.poll("alice", GameVariant::Blitz).await,
            Err(MatchmakingServiceError::NotWaiting)
        ));
    }

    #[tokio::test]
    async fn test_cancel_reports_presence() {
        let (service, _) = service();
        service.enqueue("alice", GameVariant::Rapid).await.unwrap();
        assert!(service.cancel("alice", GameVariant::Rapid).await);
        assert!(!service.cancel("alice", GameVariant::Rapid).await);
        assert_eq!(
            service.enqueue("bob", GameVariant::Rapid).await.unwrap(),
            QueueOutcome::Waiting
        );
    }

    #[tokio::test]
    async fn test_sweep_expires_tickets_once() {
        let (service, _) = service();
        service.enqueue("alice", GameVariant::Blitz).await.unwrap();
        service.enqueue("bob", GameVariant::Rapid).await.unwrap();
        backdate(&service, GameVariant::Blitz, "alice", 120).await;

        assert_eq!(service.sweep_expired().await, 1);
        assert_eq!(
            service.poll("alice", GameVariant::Blitz).await.unwrap(),
            QueueOutcome::TimedOut
        );
        assert!(service.poll("alice", GameVariant::Blitz).await.is_err());
        assert_eq!(
            service.poll("bob", GameVariant::Rapid).await.unwrap(),
            QueueOutcome::Waiting
        );
    }

    async fn backdate_pairing(service: &MatchmakingService, variant: GameVariant, player: &str, secs: i64) {
        let mut pool = service.pool(variant).lock().await;
        if let Some(pending) = pool.paired.get_mut(player) {
            pending.paired_at = Utc::now() - Duration::seconds(secs);
        }
    }

    #[tokio::test]
    async fn test_cancel_discards_uncollected_pairing() {
        let (service, _) = service();
        service.enqueue("alice", GameVariant::Blitz).await.unwrap();
        let QueueOutcome::Paired { match_id: old_match } =
            service.enqueue("bob", GameVariant::Blitz).await.unwrap()
        else {
            panic!("second player should be paired");
        };

        assert!(!service.cancel("alice", GameVariant::Blitz).await);
        assert!(service.pool(GameVariant::Blitz).lock().await.paired.is_empty());

        let outcome = service.enqueue("alice", GameVariant::Blitz).await.unwrap();
        assert_eq!(outcome, QueueOutcome::Waiting);
        assert_ne!(outcome, QueueOutcome::Paired { match_id: old_match });
    }

    #[tokio::test]
    async fn test_sweep_drops_stale_notices() {
        let (service, _) = service();
        service.enqueue("alice", GameVariant::Rapid).await.unwrap();
        service.enqueue("bob", GameVariant::Rapid).await.unwrap();
        service.enqueue("carol", GameVariant::Blitz).await.unwrap();
        backdate(&service, GameVariant::Blitz, "carol", 120).await;
        assert_eq!(service.sweep_expired().await, 1);

        backdate_pairing(&service, GameVariant::Rapid, "alice", 120).await;
        {
            let mut pool = service.pool(GameVariant::Blitz).lock().await;
            if let Some(swept_at) = pool.expired.get_mut("carol") {
                *swept_at = Utc::now() - Duration::seconds(120);
            }
        }
        assert_eq!(service.sweep_expired().await, 0);

        assert!(service.pool(GameVariant::Rapid).lock().await.paired.is_empty());
        assert!(service.pool(GameVariant::Blitz).lock().await.expired.is_empty());
        assert_eq!(
            service.enqueue("alice", GameVariant::Rapid).await.unwrap(),
            QueueOutcome::Waiting
        );
    }

    #[tokio::test]
    async fn test_stale_pairing_is_not_handed_out() {
        let (service, _) = service();
        service.enqueue("alice", GameVariant::Standard).await.unwrap();
        service.enqueue("bob", GameVariant::Standard).await.unwrap();
        backdate_pairing(&service, GameVariant::Standard, "alice", 120).await;

        assert!(matches!(
            service.poll("alice", GameVariant::Standard).await,
            Err(MatchmakingServiceError::NotWaiting)
        ));
    }

    #[tokio::test]
    async fn test_failed_match_creation_restores_opponent() {
        let mut repo = MockMatchRepository::new();
        repo.expect_create_match()
            .times(1)
            .returning(|_| Err(MatchRepositoryError::DynamoDb("unavailable".to_string())));
        let service = MatchmakingService::new(Arc::new(repo), Duration::seconds(60));

        service.enqueue("alice", GameVariant::Blitz).await.unwrap();
        backdate(&service, GameVariant::Blitz, "alice", 10).await;
        let original = service.pool(GameVariant::Blitz).lock().await.tickets["alice"].enqueued_at;

        let result = service.enqueue("bob", GameVariant::Blitz).await;
        assert!(matches!(result, Err(MatchmakingServiceError::Repository(_))));

        let pool = service.pool(GameVariant::Blitz).lock().await;
        assert_eq!(pool.tickets["alice"].enqueued_at, original);
        assert!(!pool.tickets.contains_key("bob"));
        assert!(pool.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_queue_status_counts_waiting_players() {
        let (service, _) = service();
        service.enqueue("alice", GameVariant::Blitz).await.unwrap();
        service.enqueue("bob", GameVariant::Rapid).await.unwrap();

        let status = service.queue_status().await;
        assert_eq!(status.len(), 3);
        let blitz = status
            .iter()
            .find(|s| s.variant == GameVariant::Blitz)
            .unwrap();
        assert_eq!(blitz.waiting, 1);
        assert_eq!(blitz.pairing, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueues_pair_everyone_exactly_once() {
        let (service, _) = service();
        let service = Arc::new(service);
        let players: Vec<String> = (0..20).map(|i| format!("player-{i}")).collect();

        let handles: Vec<_> = players
            .iter()
            .cloned()
            .map(|player| {
                let service = service.clone();
                tokio::spawn(async move {
                    let outcome = service.enqueue(&player, GameVariant::Blitz).await.unwrap();
                    (player, outcome)
                })
            })
            .collect();

        let mut match_of: HashMap<String, String> = HashMap::new();
        for handle in handles {
            let (player, outcome) = handle.await.unwrap();
            if let QueueOutcome::Paired { match_id } = outcome {
                match_of.insert(player, match_id);
            }
        }
        for player in &players {
            if match_of.contains_key(player) {
                continue;
            }
            if let QueueOutcome::Paired { match_id } =
                service.poll(player, GameVariant::Blitz).await.unwrap()
            {
                match_of.insert(player.clone(), match_id);
            }
        }

        assert_eq!(match_of.len(), players.len());
        let mut per_match: HashMap<&str, usize> = HashMap::new();
        for match_id in match_of.values() {
            *per_match.entry(match_id.as_str()).or_default() += 1;
        }
        assert_eq!(per_match.len(), players.len() / 2);
        assert!(per_match.values().all(|count| *count == 2));
    }
}
