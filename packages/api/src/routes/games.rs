use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shared::models::{
    game_session::SessionSnapshot,
    move_request::{MoveRequest, MoveResult},
};

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/games/{match_id}", get(get_session))
        .route("/api/games/{match_id}/join", post(join))
        .route("/api/games/{match_id}/move", post(submit_move))
        .route("/api/games/{match_id}/resign", post(resign))
        .route("/api/games/{match_id}/draw", post(offer_draw))
        .route("/api/games/{match_id}/draw/accept", post(accept_draw))
        .route("/api/games/{match_id}/draw/reject", post(reject_draw))
        .route("/api/games/{match_id}/chat", post(chat))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

async fn get_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .game_session_service
        .get_session_snapshot(&match_id, &user.player_id)
        .await?;
    Ok(Json(snapshot))
}

async fn join(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .game_session_service
        .join(&match_id, &user.player_id)
        .await?;
    Ok(Json(snapshot))
}

async fn submit_move(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<MoveResult>, ApiError> {
    let result = state
        .game_session_service
        .submit_move(&match_id, &user.player_id, &request)
        .await?;
    Ok(Json(result))
}

async fn resign(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .game_session_service
        .resign(&match_id, &user.player_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn offer_draw(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .game_session_service
        .offer_draw(&match_id, &user.player_id)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn accept_draw(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .game_session_service
        .accept_draw(&match_id, &user.player_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reject_draw(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
) -> StatusCode {
    state
        .game_session_service
        .reject_draw(&match_id, &user.player_id)
        .await;
    StatusCode::NO_CONTENT
}

async fn chat(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(match_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .game_session_service
        .send_chat(&match_id, &user.player_id, &request.message)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
