use crate::repositories::errors::match_repository_errors::MatchRepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum MatchmakingServiceError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Player is already waiting for a match")]
    AlreadyQueued,
    #[error("Player is not waiting for a match")]
    NotWaiting,
    #[error("Repository error: {0}")]
    Repository(#[from] MatchRepositoryError),
}
