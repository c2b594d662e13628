pub mod games;
pub mod health;
pub mod matchmaking;
pub mod ws;
