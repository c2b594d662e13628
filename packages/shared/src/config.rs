use std::env;
use std::str::FromStr;

use chrono::Duration;

#[derive(Clone, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// DynamoDB table for match records. In-memory storage when unset.
    pub matches_table: Option<String>,
    /// DynamoDB table for users. In-memory storage when unset.
    pub users_table: Option<String>,
    pub matchmaking_wait_timeout_secs: i64,
    pub session_retention_secs: i64,
    pub sweep_interval_secs: u64,
    /// Usernames created at startup when users are kept in memory.
    pub seed_users: Vec<String>,
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed_or("PORT", 8080),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me".to_string()),
            matches_table: non_empty("MATCHES_TABLE"),
            users_table: non_empty("USERS_TABLE"),
            matchmaking_wait_timeout_secs: parsed_or("MATCHMAKING_WAIT_TIMEOUT_SECS", 60),
            session_retention_secs: parsed_or("SESSION_RETENTION_SECS", 600),
            sweep_interval_secs: parsed_or("SWEEP_INTERVAL_SECS", 30),
            seed_users: env::var("SEED_USERS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::seconds(self.matchmaking_wait_timeout_secs)
    }

    pub fn session_retention(&self) -> Duration {
        Duration::seconds(self.session_retention_secs)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: "dev-secret-change-me".to_string(),
            matches_table: None,
            users_table: None,
            matchmaking_wait_timeout_secs: 60,
            session_retention_secs: 600,
            sweep_interval_secs: 30,
            seed_users: Vec::new(),
        }
    }
}
