use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::services::errors::{
    auth_service_errors::AuthServiceError, game_session_service_errors::GameSessionServiceError,
    matchmaking_service_errors::MatchmakingServiceError,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    AuthService(#[from] AuthServiceError),
    #[error(transparent)]
    MatchmakingService(#[from] MatchmakingServiceError),
    #[error(transparent)]
    GameSessionService(#[from] GameSessionServiceError),
    #[error("Not authenticated")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        use GameSessionServiceError as Game;
        use MatchmakingServiceError as Queue;

        match self {
            ApiError::Unauthorized
            | ApiError::AuthService(
                AuthServiceError::NotAuthenticated
                | AuthServiceError::InvalidToken
                | AuthServiceError::ExpiredToken,
            )
            | ApiError::MatchmakingService(Queue::NotAuthenticated) => {
                (StatusCode::UNAUTHORIZED, "not_authenticated")
            }
            ApiError::AuthService(
                AuthServiceError::JwtError(_) | AuthServiceError::UserRepository(_),
            ) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),

            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),

            ApiError::MatchmakingService(Queue::AlreadyQueued) => {
                (StatusCode::CONFLICT, "already_queued")
            }
            ApiError::MatchmakingService(Queue::NotWaiting) => (StatusCode::NOT_FOUND, "not_waiting"),
            ApiError::MatchmakingService(Queue::Repository(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }

            ApiError::GameSessionService(err) => match err {
                Game::NotAuthenticated => (StatusCode::UNAUTHORIZED, "not_authenticated"),
                Game::NotParticipant => (StatusCode::FORBIDDEN, "not_participant"),
                Game::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                Game::GameNotActive => (StatusCode::CONFLICT, "game_not_active"),
                Game::GameAlreadyFinished => (StatusCode::CONFLICT, "game_already_finished"),
                Game::TimeExpired { .. } => (StatusCode::CONFLICT, "time_expired"),
                Game::OutOfTurn => (StatusCode::CONFLICT, "out_of_turn"),
                Game::InvalidMovePayload(_) => (StatusCode::BAD_REQUEST, "invalid_move"),
                Game::OpponentUnavailable => (StatusCode::CONFLICT, "opponent_unavailable"),
                Game::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = match &self {
            ApiError::GameSessionService(GameSessionServiceError::TimeExpired { winner_id }) => {
                json!({ "error": code, "message": message, "winner_id": winner_id })
            }
            _ => json!({ "error": code, "message": message }),
        };

        (status, Json(body)).into_response()
    }
}
