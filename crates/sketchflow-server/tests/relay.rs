//! End-to-end tests against a live relay on an ephemeral port.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use sketchflow_server::{Config, RoomRelay, router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::new(RoomRelay::new()), &Config::default());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn recv_json(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn assert_silent(ws: &mut Client) {
    let next = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(next.is_err(), "unexpected message: {:?}", next);
}

async fn join(ws: &mut Client, room: &str) -> Value {
    send_json(ws, json!({"type": "join", "room": room})).await;
    recv_json(ws).await
}

#[tokio::test]
async fn join_acknowledges_with_member_count() {
    let addr = spawn_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;

    assert_eq!(join(&mut a, "room1").await, json!({"type": "joined", "room": "room1", "peer_count": 1}));
    assert_eq!(join(&mut b, "room1").await, json!({"type": "joined", "room": "room1", "peer_count": 2}));
}

#[tokio::test]
async fn push_reaches_peers_but_not_sender() {
    let addr = spawn_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "room1").await;
    join(&mut b, "room1").await;

    let elements = json!([{"id": "0b6f0a59-3a2c-4f55-9d0c-2f1e8b9c7a10", "tool": "circle"}]);
    send_json(&mut a, json!({"type": "push_snapshot", "room": "room1", "elements": elements})).await;

    assert_eq!(
        recv_json(&mut b).await,
        json!({"type": "pull_snapshot", "room": "room1", "elements": elements})
    );
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn rooms_do_not_leak() {
    let addr = spawn_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    let mut c = connect(addr).await;
    join(&mut a, "room1").await;
    join(&mut b, "room1").await;
    join(&mut c, "room2").await;

    send_json(&mut a, json!({"type": "push_snapshot", "room": "room1", "elements": []})).await;
    assert_eq!(recv_json(&mut b).await["type"], "pull_snapshot");
    assert_silent(&mut c).await;
}

#[tokio::test]
async fn departed_peer_is_skipped() {
    let addr = spawn_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "room1").await;
    join(&mut b, "room1").await;

    send_json(&mut b, json!({"type": "leave", "room": "room1"})).await;
    // Frames on one connection are handled in order, so this ack means the leave is done.
    assert_eq!(join(&mut b, "room2").await["peer_count"], 1);

    send_json(&mut a, json!({"type": "push_snapshot", "room": "room1", "elements": []})).await;
    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
}

#[tokio::test]
async fn disconnected_peer_leaves_room() {
    let addr = spawn_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "room1").await;
    join(&mut b, "room1").await;

    b.close(None).await.unwrap();
    drop(b);

    // The relay may see the close after the next join, so poll until it lands.
    let mut c = connect(addr).await;
    let mut count = Value::Null;
    for _ in 0..50 {
        count = join(&mut c, "room1").await["peer_count"].clone();
        send_json(&mut c, json!({"type": "leave", "room": "room1"})).await;
        if count == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(count, 2);

    send_json(&mut a, json!({"type": "push_snapshot", "room": "room1", "elements": []})).await;
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn invalid_frame_gets_error_reply() {
    let addr = spawn_server().await;
    let mut a = connect(addr).await;

    a.send(Message::Text("{\"type\":\"teleport\"}".to_string().into())).await.unwrap();
    let reply = recv_json(&mut a).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["message"].as_str().unwrap().starts_with("Invalid message"));

    // The connection stays usable.
    assert_eq!(join(&mut a, "room1").await["type"], "joined");
}

#[tokio::test]
async fn push_from_non_member_is_ignored() {
    let addr = spawn_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut b, "room1").await;

    send_json(&mut a, json!({"type": "push_snapshot", "room": "room1", "elements": []})).await;
    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", path, addr);
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn health_endpoints() {
    let addr = spawn_server().await;

    let response = http_get(addr, "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));

    let response = http_get(addr, "/api/health").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#"{"status":"healthy"}"#));
}
