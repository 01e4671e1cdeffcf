//! End-to-end tests over a real WebSocket on localhost
//!
//! Run with: cargo test --test websocket_test

use futures_util::{SinkExt, StreamExt};
use obs_remote::{ObsClient, ObsError};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const STEP: Duration = Duration::from_secs(5);

type ServerSocket = WebSocketStream<tokio::net::TcpStream>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn recv_json(ws: &mut ServerSocket) -> Value {
    loop {
        match ws.next().await.expect("client hung up").unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame {:?}", other),
        }
    }
}

async fn send_json(ws: &mut ServerSocket, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_connect_authenticate_and_request() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;

        let request = recv_json(&mut ws).await;
        assert_eq!(request["request-type"], "GetAuthRequired");
        send_json(
            &mut ws,
            json!({
                "message-id": request["message-id"],
                "status": "ok",
                "authRequired": true,
                "salt": "+IxH4CnCiqpX1rM9scsNynZzbOe4KhDeYcTNS3PDaeY=",
                "challenge": "ztTBnnuqrqaKDzRM3xcVdbYm"
            }),
        )
        .await;

        let request = recv_json(&mut ws).await;
        assert_eq!(request["request-type"], "Authenticate");
        assert_eq!(request["auth"], "xpyl/DAKWiwsv36ZLpazBN7T03lq2VoCcKUmY3Xiy2w=");
        send_json(&mut ws, json!({"message-id": request["message-id"], "status": "ok"})).await;

        let request = recv_json(&mut ws).await;
        assert_eq!(request["request-type"], "GetCurrentScene");
        send_json(&mut ws, json!({"update-type": "SwitchScenes", "scene-name": "Live"})).await;
        send_json(
            &mut ws,
            json!({"message-id": request["message-id"], "status": "ok", "name": "Live", "sources": []}),
        )
        .await;

        // Wait for the client to go away
        while let Some(Ok(frame)) = ws.next().await {
            if frame.is_close() {
                break;
            }
        }
    });

    let client = timeout(STEP, ObsClient::connect(&url, "supersecret"))
        .await
        .unwrap()
        .unwrap();
    let mut switches = client.subscribe("SwitchScenes");

    let scene = timeout(STEP, client.get_current_scene()).await.unwrap().unwrap();
    assert_eq!(scene.name, "Live");
    assert!(scene.sources.is_empty());

    let update = timeout(STEP, switches.recv()).await.unwrap().unwrap();
    assert_eq!(update["scene-name"], "Live");

    client.close().await.unwrap();
    timeout(STEP, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connect_refused() {
    let (listener, url) = bind().await;
    drop(listener);

    let result = timeout(STEP, ObsClient::connect(&url, "")).await.unwrap();
    assert!(matches!(result, Err(ObsError::Connection(_))));
}

#[tokio::test]
async fn test_server_hangup_during_handshake() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _ = recv_json(&mut ws).await;
        let _ = ws.close(None).await;
    });

    let result = timeout(STEP, ObsClient::connect(&url, "")).await.unwrap();
    assert!(matches!(result, Err(ObsError::ConnectionClosed)));
}
