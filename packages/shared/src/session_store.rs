use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::game_session::SessionState;
use crate::models::match_record::MatchRecord;

pub type SharedSession = Arc<Mutex<SessionState>>;

/// Live sessions keyed by match id, one lock per match.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, SharedSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, match_id: &str) -> Option<SharedSession> {
        self.sessions.get(match_id).map(|entry| entry.value().clone())
    }

    /// Returns the live session for `record`, creating it from the record if
    /// none exists. Concurrent callers for the same match get the same session.
    pub fn get_or_create(&self, record: &MatchRecord) -> SharedSession {
        self.sessions
            .entry(record.id.clone())
            .or_insert_with(|| {
                debug!("Creating live session for match {}", record.id);
                Arc::new(Mutex::new(SessionState::from_record(record)))
            })
            .value()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops finished sessions idle for longer than `retention`. Sessions
    /// whose lock is currently held are skipped until the next pass.
    pub fn evict_finished(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let candidates: Vec<(String, SharedSession)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut evicted = 0;
        for (match_id, session) in candidates {
            let stale = match session.try_lock() {
                Ok(state) => state.status.is_over() && now - state.last_move_at > retention,
                Err(_) => false,
            };
            if stale
                && self
                    .sessions
                    .remove_if(&match_id, |_, current| Arc::ptr_eq(current, &session))
                    .is_some()
            {
                evicted += 1;
            }
        }
        evicted
    }
}
