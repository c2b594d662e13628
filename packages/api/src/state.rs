use std::sync::Arc;

use shared::config::Settings;
use shared::repositories::match_repository::MatchRepository;
use shared::repositories::notification_repository::InProcessNotificationRepository;
use shared::repositories::user_repository::UserRepository;
use shared::services::auth_service::{AuthService, AuthServiceTrait};
use shared::services::game_session_service::GameSessionService;
use shared::services::matchmaking_service::MatchmakingService;
use shared::session_store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServiceTrait>,
    pub matchmaking_service: Arc<MatchmakingService>,
    pub game_session_service: Arc<GameSessionService>,
    pub notification_hub: Arc<InProcessNotificationRepository>,
}

impl AppState {
    /// Wires the services once for the lifetime of the process.
    pub fn new(
        settings: &Settings,
        matches: Arc<dyn MatchRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        let notification_hub = Arc::new(InProcessNotificationRepository::new());
        let sessions = Arc::new(SessionStore::new());

        AppState {
            auth_service: Arc::new(AuthService::new(users, settings.jwt_secret.clone())),
            matchmaking_service: Arc::new(MatchmakingService::new(
                matches.clone(),
                settings.wait_timeout(),
            )),
            game_session_service: Arc::new(GameSessionService::new(
                matches,
                notification_hub.clone(),
                sessions,
            )),
            notification_hub,
        }
    }
}
