mod support;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn create_lobby(payload: Value) {
    let base_url = support::ensure_server();
    let res = reqwest::Client::new()
        .post(format!("{base_url}/lobbies"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("server message in time")
            .expect("socket open")
            .expect("valid frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("server sends json");
        }
    }
}

/// Reads messages until a snapshot satisfies `accept`.
async fn wait_for_snapshot(socket: &mut Socket, accept: impl Fn(&Value) -> bool) -> Value {
    loop {
        let msg = next_json(socket).await;
        if msg["type"] == "Snapshot" && accept(&msg["data"]) {
            return msg["data"].clone();
        }
    }
}

async fn send(socket: &mut Socket, payload: Value) {
    socket
        .send(Message::Text(payload.to_string().into()))
        .await
        .expect("send command");
}

async fn attach(code: &str) -> (Socket, String) {
    let (mut socket, _) = connect_async(support::ws_url(code))
        .await
        .expect("websocket connect");
    let identity = next_json(&mut socket).await;
    assert_eq!(identity["type"], "Identity");
    let conn_id = identity["data"]["connection_id"]
        .as_str()
        .expect("connection id")
        .to_string();
    (socket, conn_id)
}

#[tokio::test]
async fn connection_receives_identity_and_snapshot() {
    let code = support::random_join_code();
    create_lobby(json!({ "lobby_id": code, "seed": 5 })).await;

    let (mut socket, conn_id) = attach(&code).await;
    let snapshot = next_json(&mut socket).await;
    assert_eq!(snapshot["type"], "Snapshot");
    assert_eq!(snapshot["data"]["ship"]["seed"], 5);
    assert_eq!(snapshot["data"]["ship"]["phase"], "lobby");
    assert!(snapshot["data"]["presence"][conn_id.as_str()].is_object());
}

#[tokio::test]
async fn presence_update_is_replicated() {
    let code = support::random_join_code();
    create_lobby(json!({ "lobby_id": code })).await;
    let (mut socket, conn_id) = attach(&code).await;

    send(
        &mut socket,
        json!({ "type": "SetPresence", "data": { "displayName": "Ada", "role": "bailer" } }),
    )
    .await;

    let snapshot = wait_for_snapshot(&mut socket, |data| {
        data["presence"][conn_id.as_str()]["displayName"] == "Ada"
    })
    .await;
    assert_eq!(snapshot["presence"][conn_id.as_str()]["role"], "bailer");
}

#[tokio::test]
async fn single_peer_hosts_the_countdown_into_play() {
    let code = support::random_join_code();
    create_lobby(json!({ "lobby_id": code, "mission": "free_sail" })).await;
    let (mut socket, conn_id) = attach(&code).await;

    wait_for_snapshot(&mut socket, |data| data["hostConnectionId"] == conn_id.as_str()).await;

    send(
        &mut socket,
        json!({ "type": "StartCountdown", "data": { "seconds": 0.2 } }),
    )
    .await;
    let playing = wait_for_snapshot(&mut socket, |data| data["ship"]["phase"] == "playing").await;
    assert_eq!(playing["ship"]["health"], 100.0);
}

#[tokio::test]
async fn rejected_commands_report_errors() {
    let code = support::random_join_code();
    create_lobby(json!({ "lobby_id": code })).await;
    let (mut socket, _) = attach(&code).await;

    socket
        .send(Message::Text("{not json".to_string().into()))
        .await
        .expect("send garbage");
    let error = loop {
        let msg = next_json(&mut socket).await;
        if msg["type"] == "Error" {
            break msg;
        }
    };
    assert!(
        error["data"]["message"]
            .as_str()
            .is_some_and(|m| m.starts_with("invalid message"))
    );

    send(
        &mut socket,
        json!({ "type": "StartCountdown", "data": { "seconds": 500 } }),
    )
    .await;
    let error = loop {
        let msg = next_json(&mut socket).await;
        if msg["type"] == "Error" {
            break msg;
        }
    };
    assert!(
        error["data"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("countdown"))
    );
}

#[tokio::test]
async fn unknown_lobby_is_refused() {
    support::ensure_server();
    let result = connect_async(support::ws_url("QQQ-000")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn socket_without_lobby_joins_the_default_lobby() {
    let base = support::ensure_server();
    let host = base.strip_prefix("http://").expect("http base url");
    let (mut socket, _) = connect_async(format!("ws://{host}/ws"))
        .await
        .expect("websocket connect");
    let identity = next_json(&mut socket).await;
    assert_eq!(identity["data"]["lobby_id"], "SEA-000");
}
