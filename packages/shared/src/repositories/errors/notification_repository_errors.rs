#[derive(Debug, thiserror::Error)]
pub enum NotificationRepositoryError {
    /// The player has no live subscription to deliver to.
    #[error("Player {0} is not connected")]
    Unreachable(String),
}
