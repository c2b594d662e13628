pub mod errors;
pub mod match_repository;
pub mod notification_repository;
pub mod user_repository;
