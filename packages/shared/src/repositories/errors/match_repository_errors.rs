#[derive(Debug, thiserror::Error)]
pub enum MatchRepositoryError {
    #[error("Match not found")]
    NotFound,
    #[error("Match already exists")]
    AlreadyExists,
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
}
