use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use api::state::AppState;
use shared::config::Settings;
use shared::models::user::User;
use shared::repositories::match_repository::{
    DynamoDbMatchRepository, InMemoryMatchRepository, MatchRepository,
};
use shared::repositories::user_repository::{
    DynamoDbUserRepository, InMemoryUserRepository, UserRepository,
};

type Repositories = (
    Arc<dyn MatchRepository + Send + Sync>,
    Arc<dyn UserRepository + Send + Sync>,
);

async fn repositories(settings: &Settings) -> Repositories {
    if let (Some(matches_table), Some(users_table)) =
        (settings.matches_table.clone(), settings.users_table.clone())
    {
        tracing::info!(
            "Using DynamoDB tables {} and {}",
            matches_table,
            users_table
        );
        let config = aws_config::load_from_env().await;
        let client = aws_sdk_dynamodb::Client::new(&config);
        return (
            Arc::new(DynamoDbMatchRepository::new(client.clone(), matches_table)),
            Arc::new(DynamoDbUserRepository::new(client, users_table)),
        );
    }

    tracing::info!("MATCHES_TABLE/USERS_TABLE not set - using in-memory storage");
    (
        Arc::new(InMemoryMatchRepository::new()),
        Arc::new(InMemoryUserRepository::new()),
    )
}

async fn seed_users(
    settings: &Settings,
    users: &(dyn UserRepository + Send + Sync),
    state: &AppState,
) -> anyhow::Result<()> {
    for username in &settings.seed_users {
        users
            .create_user(&User::new(username))
            .await
            .with_context(|| format!("Failed to seed user {}", username))?;
        let token = state
            .auth_service
            .generate_token(username)
            .with_context(|| format!("Failed to issue a token for {}", username))?;
        tracing::info!("Seeded user {} with dev token {}", username, token.token);
    }
    Ok(())
}

/// Periodic matchmaking sweep, finished-session eviction and channel cleanup.
fn spawn_hygiene(state: AppState, settings: &Settings) {
    let interval = settings.sweep_interval();
    let retention = settings.session_retention();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let expired = state.matchmaking_service.sweep_expired().await;
            let evicted = state.game_session_service.evict_finished(retention);
            let pruned = state.notification_hub.prune();
            tracing::debug!(
                "Hygiene pass: {} tickets expired, {} sessions evicted, {} channels pruned",
                expired,
                evicted,
                pruned
            );
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::from_env();
    let (matches, users) = repositories(&settings).await;
    let state = AppState::new(&settings, matches, users.clone());

    if settings.matches_table.is_none() || settings.users_table.is_none() {
        seed_users(&settings, users.as_ref(), &state).await?;
    }
    spawn_hygiene(state.clone(), &settings);

    let app = api::app(state);

    let addr = settings.bind_address();
    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
