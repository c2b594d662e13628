use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::models::{
    queue::{QueueOutcome, VariantQueueStatus},
    variant::GameVariant,
};

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/game", post(enqueue))
        .route("/game/check-match", get(check_match))
        .route("/game/cancel-waiting", post(cancel_waiting))
        .route("/game/queue-status", get(queue_status))
}

#[derive(Debug, Deserialize)]
pub struct GameTypeQuery {
    game_type: Option<String>,
}

impl GameTypeQuery {
    /// Missing `game_type` means a standard game.
    fn variant(&self) -> Result<GameVariant, ApiError> {
        match self.game_type.as_deref() {
            None => Ok(GameVariant::default()),
            Some(raw) => raw
                .parse::<GameVariant>()
                .map_err(|e| ApiError::BadRequest(e.to_string())),
        }
    }
}

async fn enqueue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<GameTypeQuery>,
) -> Result<Json<QueueOutcome>, ApiError> {
    let variant = query.variant()?;
    let outcome = state
        .matchmaking_service
        .enqueue(&user.player_id, variant)
        .await?;
    Ok(Json(outcome))
}

async fn check_match(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<GameTypeQuery>,
) -> Result<Json<QueueOutcome>, ApiError> {
    let variant = query.variant()?;
    let outcome = state
        .matchmaking_service
        .poll(&user.player_id, variant)
        .await?;
    Ok(Json(outcome))
}

async fn cancel_waiting(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<GameTypeQuery>,
) -> Result<Json<Value>, ApiError> {
    let variant = query.variant()?;
    let cancelled = state
        .matchmaking_service
        .cancel(&user.player_id, variant)
        .await;
    Ok(Json(json!({ "cancelled": cancelled })))
}

async fn queue_status(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Json<Vec<VariantQueueStatus>> {
    Json(state.matchmaking_service.queue_status().await)
}
