pub mod auth_service;
pub mod errors;
pub mod game_session_service;
pub mod matchmaking_service;
