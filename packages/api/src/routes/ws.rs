use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use shared::models::events::game_state_topic;
use shared::repositories::notification_repository::Notification;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct WsAuth {
    token: Option<String>,
}

/// Client → Server messages
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe { match_id: String },
    Unsubscribe { match_id: String },
    Ping,
}

/// Server → Client messages
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum ServerMessage {
    Subscribed { match_id: String },
    Unsubscribed { match_id: String },
    Pong,
    Error { message: String },
    Event(Notification),
}

/// Authenticates from `?token=` before upgrading; browsers cannot set headers
/// on a WebSocket handshake.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(auth): Query<WsAuth>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = auth.token.filter(|t| !t.is_empty()) else {
        return ApiError::Unauthorized.into_response();
    };
    match state.auth_service.current_player(&token).await {
        Ok(player_id) => ws
            .on_upgrade(move |socket| handle_socket(socket, state, player_id))
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Failed to encode websocket message: {}", e);
            None
        }
    }
}

fn reply(outbox: &mpsc::UnboundedSender<String>, message: &ServerMessage) {
    if let Some(text) = encode(message) {
        let _ = outbox.send(text);
    }
}

/// Pumps one notification channel into the socket's outbox.
fn forward(
    mut notifications: broadcast::Receiver<Notification>,
    outbox: mpsc::UnboundedSender<String>,
    player_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(notification) => {
                    let Some(text) = encode(&ServerMessage::Event(notification)) else {
                        continue;
                    };
                    if outbox.send(text).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Player {} missed {} notifications", player_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: AppState, player_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outgoing) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(text) = outgoing.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let inbox = forward(
        state.notification_hub.subscribe_player(&player_id),
        outbox.clone(),
        player_id.clone(),
    );
    let mut topics: HashMap<String, JoinHandle<()>> = HashMap::new();
    info!("Player {} connected", player_id);

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        let message = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Unreadable message from {}: {}", player_id, e);
                reply(
                    &outbox,
                    &ServerMessage::Error {
                        message: format!("Invalid message: {}", e),
                    },
                );
                continue;
            }
        };

        match message {
            ClientMessage::Ping => reply(&outbox, &ServerMessage::Pong),
            ClientMessage::Subscribe { match_id } => {
                if let Err(e) = state
                    .game_session_service
                    .get_session_snapshot(&match_id, &player_id)
                    .await
                {
                    reply(
                        &outbox,
                        &ServerMessage::Error {
                            message: e.to_string(),
                        },
                    );
                    continue;
                }
                topics.entry(match_id.clone()).or_insert_with(|| {
                    forward(
                        state
                            .notification_hub
                            .subscribe_topic(&game_state_topic(&match_id)),
                        outbox.clone(),
                        player_id.clone(),
                    )
                });
                reply(&outbox, &ServerMessage::Subscribed { match_id });
            }
            ClientMessage::Unsubscribe { match_id } => {
                if let Some(task) = topics.remove(&match_id) {
                    task.abort();
                }
                reply(&outbox, &ServerMessage::Unsubscribed { match_id });
            }
        }
    }

    for (_, task) in topics {
        task.abort();
    }
    inbox.abort();
    writer.abort();
    let pruned = state.notification_hub.prune();
    info!(
        "Player {} disconnected, pruned {} idle channels",
        player_id, pruned
    );
}
