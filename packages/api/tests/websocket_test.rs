mod common;

use std::time::Duration;

use common::{e4, spawn_app, TestApp};
use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(app: &TestApp, name: &str) -> Socket {
    let url = format!("{}?token={}", app.ws_url, app.token(name));
    let (socket, _) = connect_async(url)
        .await
        .expect("Failed to open websocket");
    socket
}

async fn send(socket: &mut Socket, message: Value) {
    socket
        .send(Message::Text(message.to_string()))
        .await
        .expect("Failed to send websocket message");
}

/// Next JSON text frame, skipping control frames.
async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("Timed out waiting for a websocket message")
            .expect("Websocket closed")
            .expect("Websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("Invalid websocket JSON");
        }
    }
}

/// Round-trips a ping so the connection is known to be fully registered.
async fn handshake(socket: &mut Socket) {
    send(socket, json!({ "action": "ping" })).await;
    assert_eq!(next_json(socket).await["type"], "PONG");
}

#[tokio::test]
async fn test_connection_requires_a_token() {
    let app = spawn_app().await;
    assert!(connect_async(app.ws_url.clone()).await.is_err());
    assert!(connect_async(format!("{}?token=garbage", app.ws_url))
        .await
        .is_err());
}

#[tokio::test]
async fn test_draw_offer_needs_a_connected_opponent() {
    let app = spawn_app().await;
    let match_id = app.pair("standard").await;
    let games = format!("/api/games/{}", match_id);
    app.post(&format!("{}/join", games), Some(app.token("alice")), None)
        .await;

    let resp = app
        .post(&format!("{}/draw", games), Some(app.token("alice")), None)
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "opponent_unavailable");

    let mut bob = connect(&app, "bob").await;
    handshake(&mut bob).await;

    let resp = app
        .post(&format!("{}/draw", games), Some(app.token("alice")), None)
        .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let pushed = next_json(&mut bob).await;
    assert_eq!(pushed["type"], "EVENT");
    assert_eq!(pushed["destination"], "/queue/draw-offers");
    assert_eq!(pushed["event"]["type"], "DRAW_OFFER");
    assert_eq!(pushed["event"]["from"], app.player("alice").id.as_str());

    let resp = app
        .post(
            &format!("{}/draw/reject", games),
            Some(app.token("bob")),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_subscribed_players_see_moves() {
    let app = spawn_app().await;
    let match_id = app.pair("blitz").await;
    let games = format!("/api/games/{}", match_id);

    let mut bob = connect(&app, "bob").await;
    send(&mut bob, json!({ "action": "subscribe", "match_id": match_id })).await;
    let reply = next_json(&mut bob).await;
    assert_eq!(reply["type"], "SUBSCRIBED");
    assert_eq!(reply["match_id"], match_id.as_str());

    let resp = app
        .post(&format!("{}/move", games), Some(app.token("alice")), Some(e4().0))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let pushed = next_json(&mut bob).await;
    assert_eq!(pushed["destination"], format!("/topic/game-state/{}", match_id));
    assert_eq!(pushed["event"]["type"], "MOVE_MADE");
    assert_eq!(pushed["event"]["notation"], "e4");
    assert_eq!(pushed["event"]["white_to_move"], false);
}

#[tokio::test]
async fn test_outsider_cannot_subscribe() {
    let app = spawn_app().await;
    let match_id = app.pair("rapid").await;

    let mut carol = connect(&app, "carol").await;
    send(&mut carol, json!({ "action": "subscribe", "match_id": match_id })).await;
    let reply = next_json(&mut carol).await;
    assert_eq!(reply["type"], "ERROR");
}
