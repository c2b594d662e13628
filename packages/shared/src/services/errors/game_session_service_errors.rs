use crate::repositories::errors::match_repository_errors::MatchRepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum GameSessionServiceError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Player is not part of this game")]
    NotParticipant,
    #[error("Game not found")]
    NotFound,
    #[error("Game is not active")]
    GameNotActive,
    #[error("Game is already finished")]
    GameAlreadyFinished,
    /// The mover's clock ran out before the move could be applied.
    #[error("Time expired, {winner_id} wins")]
    TimeExpired { winner_id: String },
    #[error("Not your turn")]
    OutOfTurn,
    #[error("Invalid move: {0}")]
    InvalidMovePayload(String),
    #[error("Opponent is not connected")]
    OpponentUnavailable,
    #[error("Repository error: {0}")]
    Repository(MatchRepositoryError),
}

impl From<MatchRepositoryError> for GameSessionServiceError {
    fn from(err: MatchRepositoryError) -> Self {
        match err {
            MatchRepositoryError::NotFound => GameSessionServiceError::NotFound,
            other => GameSessionServiceError::Repository(other),
        }
    }
}
