pub mod auth;
pub mod board;
pub mod events;
pub mod game_session;
pub mod match_record;
pub mod move_request;
pub mod queue;
pub mod user;
pub mod variant;
