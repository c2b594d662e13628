use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::{
    clock::{self, ClockOutcome},
    models::{
        board::Board,
        events::{game_state_topic, GameEvent, DRAW_OFFERS_QUEUE},
        game_session::{GameOverReason, SessionSnapshot, SessionState},
        move_request::{MoveRequest, MoveResult},
    },
    repositories::{
        errors::match_repository_errors::MatchRepositoryError,
        match_repository::MatchRepository, notification_repository::NotificationRepository,
    },
    services::errors::game_session_service_errors::GameSessionServiceError,
    session_store::{SessionStore, SharedSession},
};

enum MoveOutcome {
    Applied(MoveResult, SessionState),
    Flagged(String, SessionState),
}

/// Arbitrates live matches: turn order, clocks and how a game ends.
///
/// Every mutation happens under the match's session lock. Storage writes and
/// notifications are issued after the lock is released.
#[derive(Clone)]
pub struct GameSessionService {
    matches: Arc<dyn MatchRepository + Send + Sync>,
    notifications: Arc<dyn NotificationRepository + Send + Sync>,
    sessions: Arc<SessionStore>,
}

fn ensure_in_progress(state: &SessionState) -> Result<(), GameSessionServiceError> {
    if state.status.is_over() {
        return Err(GameSessionServiceError::GameAlreadyFinished);
    }
    if !state.status.is_in_progress() {
        return Err(GameSessionServiceError::GameNotActive);
    }
    Ok(())
}

fn ensure_authenticated(player_id: &str) -> Result<(), GameSessionServiceError> {
    if player_id.trim().is_empty() {
        return Err(GameSessionServiceError::NotAuthenticated);
    }
    Ok(())
}

fn snapshot_of(
    state: &SessionState,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<SessionSnapshot, GameSessionServiceError> {
    let player_color = state
        .color_of(player_id)
        .ok_or(GameSessionServiceError::NotParticipant)?;
    let (white_seconds, black_seconds) = clock::remaining_at(state, now);
    Ok(SessionSnapshot {
        match_id: state.match_id.clone(),
        player_color,
        is_my_turn: state.status.is_in_progress() && state.is_turn_of(player_id),
        status: state.status.clone(),
        board: state.board.clone(),
        fen: state.fen(),
        variant: state.variant,
        white_seconds,
        black_seconds,
        ply: state.ply,
        last_move_notation: state.last_move_notation.clone(),
        opponent_id: state.player_for(player_color.opposite()).to_string(),
    })
}

impl GameSessionService {
    pub fn new(
        matches: Arc<dyn MatchRepository + Send + Sync>,
        notifications: Arc<dyn NotificationRepository + Send + Sync>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        GameSessionService {
            matches,
            notifications,
            sessions,
        }
    }

    /// Live session for a participant, created from the stored record on
    /// first access.
    async fn participant_session(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<SharedSession, GameSessionServiceError> {
        ensure_authenticated(player_id)?;

        if let Some(session) = self.sessions.get(match_id) {
            let is_participant = session.lock().await.color_of(player_id).is_some();
            if !is_participant {
                return Err(GameSessionServiceError::NotParticipant);
            }
            return Ok(session);
        }

        let record = self.matches.get_match(match_id).await?;
        if !record.is_participant(player_id) {
            return Err(GameSessionServiceError::NotParticipant);
        }
        Ok(self.sessions.get_or_create(&record))
    }

    fn live_session(&self, match_id: &str) -> Result<SharedSession, GameSessionServiceError> {
        self.sessions
            .get(match_id)
            .ok_or(GameSessionServiceError::GameNotActive)
    }

    pub async fn join(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<SessionSnapshot, GameSessionServiceError> {
        let session = self.participant_session(match_id, player_id).await?;
        let snapshot = snapshot_of(&*session.lock().await, player_id, Utc::now())?;

        info!(
            "Player {} joined match {} as {:?}",
            player_id, match_id, snapshot.player_color
        );
        self.broadcast(
            match_id,
            GameEvent::player_joined(match_id, player_id, snapshot.player_color),
        )
        .await;
        Ok(snapshot)
    }

    pub async fn get_session_snapshot(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<SessionSnapshot, GameSessionServiceError> {
        let session = self.participant_session(match_id, player_id).await?;
        let snapshot = snapshot_of(&*session.lock().await, player_id, Utc::now())?;
        Ok(snapshot)
    }

    /// Applies a client-declared move. The mover's clock is charged first; if
    /// it runs out the game ends on time and the move is discarded.
    pub async fn submit_move(
        &self,
        match_id: &str,
        player_id: &str,
        request: &MoveRequest,
    ) -> Result<MoveResult, GameSessionServiceError> {
        ensure_authenticated(player_id)?;
        let mv = request
            .validate()
            .map_err(GameSessionServiceError::InvalidMovePayload)?;
        let session = self.live_session(match_id)?;

        let outcome = {
            let mut state = session.lock().await;
            ensure_in_progress(&state)?;

            if let (Some(declared), Some(actual)) =
                (request.player_color, state.color_of(player_id))
            {
                if declared != actual {
                    return Err(GameSessionServiceError::InvalidMovePayload(
                        "Player color does not match".to_string(),
                    ));
                }
            }
            if !state.is_turn_of(player_id) {
                return Err(GameSessionServiceError::OutOfTurn);
            }

            let mover = state.side_to_move();
            let now = Utc::now();
            match clock::charge_mover(&mut state, now) {
                ClockOutcome::Expired => {
                    let winner_id = state.player_for(mover.opposite()).to_string();
                    state
                        .finish(GameOverReason::TimeOut, Some(winner_id.clone()))
                        .map_err(|_| GameSessionServiceError::GameAlreadyFinished)?;
                    state.last_move_at = now;
                    MoveOutcome::Flagged(winner_id, state.clone())
                }
                ClockOutcome::Running { .. } | ClockOutcome::Untimed => {
                    state.board = mv.board.clone();
                    state.white_to_move = !state.white_to_move;
                    state.ply += 1;
                    state.last_move_at = now;
                    state.last_move_notation = Some(mv.uci());

                    let result = MoveResult {
                        match_id: match_id.to_string(),
                        player_id: player_id.to_string(),
                        player_color: mover,
                        board: state.board.clone(),
                        white_to_move: state.white_to_move,
                        notation: mv.notation(),
                        white_seconds: state.white_seconds,
                        black_seconds: state.black_seconds,
                        timestamp: now,
                    };
                    MoveOutcome::Applied(result, state.clone())
                }
            }
        };

        match outcome {
            MoveOutcome::Flagged(winner_id, state) => {
                info!(
                    "Player {} ran out of time in match {}, {} wins",
                    player_id, match_id, winner_id
                );
                self.persist(&state, None).await;
                self.broadcast(
                    match_id,
                    GameEvent::game_over(match_id, GameOverReason::TimeOut, Some(winner_id.clone())),
                )
                .await;
                Err(GameSessionServiceError::TimeExpired { winner_id })
            }
            MoveOutcome::Applied(result, state) => {
                debug!(
                    "Match {} ply {}: {} played {}",
                    match_id, state.ply, player_id, result.notation
                );
                self.persist(&state, mv.fen_after.as_deref()).await;
                self.broadcast(match_id, GameEvent::move_made(&result)).await;
                Ok(result)
            }
        }
    }

    pub async fn resign(&self, match_id: &str, player_id: &str) -> Result<(), GameSessionServiceError> {
        ensure_authenticated(player_id)?;
        let session = self.live_session(match_id)?;

        let (state, winner_id) = {
            let mut state = session.lock().await;
            let winner_id = state
                .opponent_of(player_id)
                .ok_or(GameSessionServiceError::NotParticipant)?
                .to_string();
            ensure_in_progress(&state)?;
            state
                .finish(GameOverReason::Resignation, Some(winner_id.clone()))
                .map_err(|_| GameSessionServiceError::GameAlreadyFinished)?;
            state.last_move_at = Utc::now();
            (state.clone(), winner_id)
        };

        info!("Player {} resigned match {}", player_id, match_id);
        self.persist(&state, None).await;
        self.broadcast(
            match_id,
            GameEvent::resignation(match_id, &winner_id, player_id),
        )
        .await;
        Ok(())
    }

    /// Sends a draw offer to the opponent only. Nothing is recorded.
    ///
    /// Unlike other notifications this one must land: when the opponent has
    /// no live subscription the delivery failure fails the call with
    /// `OpponentUnavailable`.
    pub async fn offer_draw(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<(), GameSessionServiceError> {
        ensure_authenticated(player_id)?;
        let session = self.live_session(match_id)?;

        let opponent_id = {
            let state = session.lock().await;
            let opponent_id = state
                .opponent_of(player_id)
                .ok_or(GameSessionServiceError::NotParticipant)?
                .to_string();
            ensure_in_progress(&state)?;
            opponent_id
        };

        self.notifications
            .unicast(
                &opponent_id,
                DRAW_OFFERS_QUEUE,
                &GameEvent::draw_offer(match_id, player_id),
            )
            .await
            .map_err(|e| {
                warn!("Draw offer in match {} not delivered: {}", match_id, e);
                GameSessionServiceError::OpponentUnavailable
            })?;
        info!("Player {} offered a draw in match {}", player_id, match_id);
        Ok(())
    }

    pub async fn accept_draw(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<(), GameSessionServiceError> {
        ensure_authenticated(player_id)?;
        let session = self.live_session(match_id)?;

        let state = {
            let mut state = session.lock().await;
            if state.color_of(player_id).is_none() {
                return Err(GameSessionServiceError::NotParticipant);
            }
            ensure_in_progress(&state)?;
            state
                .finish(GameOverReason::Draw, None)
                .map_err(|_| GameSessionServiceError::GameAlreadyFinished)?;
            state.last_move_at = Utc::now();
            state.clone()
        };

        info!("Player {} accepted a draw in match {}", player_id, match_id);
        self.persist(&state, None).await;
        self.broadcast(match_id, GameEvent::draw_agreed(match_id, player_id))
            .await;
        Ok(())
    }

    /// Tells the opponent a draw offer was declined. Silently does nothing
    /// when the game is not running or the caller is not playing in it.
    pub async fn reject_draw(&self, match_id: &str, player_id: &str) {
        let Some(session) = self.sessions.get(match_id) else {
            return;
        };
        let opponent_id = {
            let state = session.lock().await;
            if !state.status.is_in_progress() {
                return;
            }
            match state.opponent_of(player_id) {
                Some(opponent_id) => opponent_id.to_string(),
                None => return,
            }
        };

        if let Err(e) = self
            .notifications
            .unicast(
                &opponent_id,
                DRAW_OFFERS_QUEUE,
                &GameEvent::draw_rejected(match_id, player_id),
            )
            .await
        {
            debug!("Draw rejection in match {} not delivered: {}", match_id, e);
        }
    }

    pub async fn send_chat(
        &self,
        match_id: &str,
        player_id: &str,
        message: &str,
    ) -> Result<(), GameSessionServiceError> {
        ensure_authenticated(player_id)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(GameSessionServiceError::InvalidMovePayload(
                "Message cannot be empty".to_string(),
            ));
        }
        let session = self.live_session(match_id)?;
        if session.lock().await.color_of(player_id).is_none() {
            return Err(GameSessionServiceError::NotParticipant);
        }

        self.broadcast(match_id, GameEvent::chat(match_id, player_id, message))
            .await;
        Ok(())
    }

    /// Drops finished sessions idle for longer than `retention`.
    pub fn evict_finished(&self, retention: Duration) -> usize {
        let evicted = self.sessions.evict_finished(Utc::now(), retention);
        if evicted > 0 {
            info!("Evicted {} finished sessions", evicted);
        }
        evicted
    }

    async fn persist(&self, state: &SessionState, fen_after: Option<&str>) {
        match self.write_record(state, fen_after).await {
            Ok(true) => {}
            Ok(false) => debug!(
                "Stored record for match {} is newer, skipped ply {}",
                state.match_id, state.ply
            ),
            Err(e) => error!("Failed to persist match {}: {}", state.match_id, e),
        }
    }

    async fn write_record(
        &self,
        state: &SessionState,
        fen_after: Option<&str>,
    ) -> Result<bool, MatchRepositoryError> {
        let mut record = self.matches.get_match(&state.match_id).await?;
        if record.status.is_finished() {
            warn!(
                "Match {} is already {} in storage",
                record.id,
                record.status.as_str()
            );
            return Ok(false);
        }

        state.apply_to(&mut record);
        if let Some(fen) = fen_after.filter(|fen| Board::from_fen(fen).is_some()) {
            record.fen_snapshot = Some(fen.to_string());
        }
        self.matches.save_match(&record).await
    }

    async fn broadcast(&self, match_id: &str, event: GameEvent) {
        if let Err(e) = self
            .notifications
            .broadcast(&game_state_topic(match_id), &event)
            .await
        {
            warn!("Broadcast for match {} failed: {}", match_id, e);
        }
    }
}
