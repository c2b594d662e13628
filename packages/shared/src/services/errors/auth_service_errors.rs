use crate::repositories::errors::user_repository_errors::UserRepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Invalid JWT token")]
    InvalidToken,
    #[error("JWT token has expired")]
    ExpiredToken,
    #[error("JWT error: {0}")]
    JwtError(String),
    #[error("User repository error: {0}")]
    UserRepository(#[from] UserRepositoryError),
}
