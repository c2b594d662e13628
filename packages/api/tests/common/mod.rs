#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use reqwest::{Client, Response};
use serde_json::Value;
use shared::config::Settings;
use shared::models::board::Board;
use shared::models::user::User;
use shared::repositories::match_repository::InMemoryMatchRepository;
use shared::repositories::user_repository::{InMemoryUserRepository, UserRepository};
use shared::services::auth_service::AuthServiceTrait;

pub struct TestPlayer {
    pub id: String,
    pub token: String,
}

pub struct TestApp {
    pub base_url: String,
    pub ws_url: String,
    pub client: Client,
    pub players: HashMap<String, TestPlayer>,
}

/// Serves the app on an ephemeral port with in-memory storage and three
/// registered players: alice, bob and carol.
pub async fn spawn_app() -> TestApp {
    let settings = Settings::default();
    let users = Arc::new(InMemoryUserRepository::new());
    let matches = Arc::new(InMemoryMatchRepository::new());

    let mut accounts = Vec::new();
    for username in ["alice", "bob", "carol"] {
        let user = User::new(username);
        users
            .create_user(&user)
            .await
            .expect("Failed to create test user");
        accounts.push(user);
    }

    let state = AppState::new(&settings, matches, users);
    let players = accounts
        .into_iter()
        .map(|user| {
            let token = state
                .auth_service
                .generate_token(&user.username)
                .expect("Failed to issue token")
                .token;
            (user.username, TestPlayer { id: user.id, token })
        })
        .collect();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, api::app(state))
            .await
            .expect("Test server failed");
    });

    TestApp {
        base_url: format!("http://{}", addr),
        ws_url: format!("ws://{}/ws", addr),
        client: Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client"),
        players,
    }
}

impl TestApp {
    pub fn player(&self, name: &str) -> &TestPlayer {
        &self.players[name]
    }

    pub fn token(&self, name: &str) -> &str {
        &self.player(name).token
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut req = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {}", t));
        }
        req.send().await.expect("Failed to send GET request")
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut req = self.client.post(format!("{}{}", self.base_url, path));
        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {}", t));
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        req.send().await.expect("Failed to send POST request")
    }

    /// Queues alice then bob for `game_type` and returns the match id.
    /// Alice waited first, so she plays white.
    pub async fn pair(&self, game_type: &str) -> String {
        let path = format!("/game?game_type={}", game_type);

        let resp = self.post(&path, Some(self.token("alice")), None).await;
        let body: Value = resp.json().await.expect("Invalid enqueue JSON");
        assert_eq!(body["status"], "WAITING");

        let resp = self.post(&path, Some(self.token("bob")), None).await;
        let body: Value = resp.json().await.expect("Invalid enqueue JSON");
        assert_eq!(body["status"], "PAIRED");
        body["match_id"]
            .as_str()
            .expect("Paired without a match id")
            .to_string()
    }
}

/// Body for a move from `from` to `to` on the board after the move.
pub fn move_body(piece: &str, from: (usize, usize), to: (usize, usize), board: &Board) -> Value {
    serde_json::json!({
        "from_row": from.0,
        "from_col": from.1,
        "to_row": to.0,
        "to_col": to.1,
        "piece": piece,
        "board": board,
    })
}

/// White's e2-e4 from the initial position.
pub fn e4() -> (Value, Board) {
    let mut board = Board::initial();
    board.0[6][4] = String::new();
    board.0[4][4] = "P".to_string();
    (move_body("P", (6, 4), (4, 4), &board), board)
}

/// Black's e7-e5 after e4.
pub fn e5(after_e4: &Board) -> Value {
    let mut board = after_e4.clone();
    board.0[1][4] = String::new();
    board.0[3][4] = "p".to_string();
    move_body("p", (1, 4), (3, 4), &board)
}
