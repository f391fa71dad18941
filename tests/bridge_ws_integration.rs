//! Integration tests for the host bridge.
//!
//! Each test spins up an Axum server on a random port backed by an in-memory
//! store, connects via tokio-tungstenite, and exercises the real WS contract.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use diagram_sync::bridge::sync_routes;
use diagram_sync::config::ThumbnailConfig;
use diagram_sync::diagram::DiagramRecord;
use diagram_sync::store::{DiagramStore, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start an Axum server on a random port, return (port, store).
async fn start_server() -> (u16, Arc<LibSqlBackend>) {
    let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let app = sync_routes(store.clone(), ThumbnailConfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, store)
}

async fn connect(port: u16) -> (SplitSink<WsStream, Message>, SplitStream<WsStream>) {
    let (ws, _resp) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
        .await
        .expect("WS connect failed");
    ws.split()
}

async fn send_json(tx: &mut SplitSink<WsStream, Message>, value: Value) {
    tx.send(Message::Text(value.to_string().into()))
        .await
        .expect("WS send failed");
}

/// Read the next text frame as JSON.
async fn next_json(rx: &mut SplitStream<WsStream>) -> Value {
    loop {
        match rx.next().await.unwrap().unwrap() {
            Message::Text(txt) => return serde_json::from_str(&txt).expect("invalid JSON from server"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected Text frame, got {:?}", other),
        }
    }
}

/// Decode the JSON string carried in a notification's payload.
fn payload_of(frame: &Value) -> Value {
    serde_json::from_str(frame["payload"].as_str().expect("payload string")).unwrap()
}

#[tokio::test]
async fn local_save_then_list() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store) = start_server().await;
        let (mut tx, mut rx) = connect(port).await;

        send_json(&mut tx, json!({"type": "render", "svg": "<g><text>A</text></g>"})).await;
        send_json(
            &mut tx,
            json!({
                "type": "saveDiagram",
                "diagram": {"title": "A", "text": "a->b", "diagram": "usm", "isRemote": false}
            }),
        )
        .await;

        let frame = next_json(&mut rx).await;
        assert_eq!(frame["type"], "notification");
        assert_eq!(frame["port"], "saveToLocalCompleted");
        let saved = payload_of(&frame);
        let id = saved["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        assert_eq!(saved["createdAt"], saved["updatedAt"]);
        assert!(
            saved["thumbnail"]
                .as_str()
                .unwrap()
                .starts_with("data:image/svg+xml;base64,")
        );

        send_json(&mut tx, json!({"type": "getDiagrams"})).await;
        let frame = next_json(&mut rx).await;
        assert_eq!(frame["port"], "gotLocalDiagramJson");
        let listed = payload_of(&frame);
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], id.as_str());
        assert_eq!(listed[0]["title"], "A");
        assert_eq!(listed[0]["isRemote"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn remote_save_promotes_out_of_local_store() {
    timeout(TEST_TIMEOUT, async {
        let (port, store) = start_server().await;
        store
            .put(&DiagramRecord {
                id: Some("x".into()),
                title: "shared".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let (mut tx, mut rx) = connect(port).await;
        send_json(
            &mut tx,
            json!({
                "type": "saveDiagram",
                "diagram": {"id": "x", "title": "shared", "text": "t", "isRemote": true, "isPublic": true}
            }),
        )
        .await;

        let frame = next_json(&mut rx).await;
        assert_eq!(frame["port"], "saveToRemote");
        let forwarded = payload_of(&frame);
        assert_eq!(forwarded["id"], "x");
        assert_eq!(forwarded["isRemote"], true);
        assert_eq!(forwarded["isPublic"], true);

        send_json(&mut tx, json!({"type": "getDiagrams"})).await;
        let frame = next_json(&mut rx).await;
        assert_eq!(frame["port"], "gotLocalDiagramJson");
        assert!(payload_of(&frame).as_array().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn remove_waits_for_confirmation() {
    timeout(TEST_TIMEOUT, async {
        let (port, store) = start_server().await;
        store
            .put(&DiagramRecord {
                id: Some("d1".into()),
                title: "Roadmap".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let (mut tx, mut rx) = connect(port).await;
        send_json(
            &mut tx,
            json!({"type": "removeDiagrams", "diagram": {"id": "d1", "title": "Roadmap", "isRemote": false}}),
        )
        .await;

        let prompt = next_json(&mut rx).await;
        assert_eq!(prompt["type"], "confirm");
        assert_eq!(
            prompt["message"],
            "Are you sure you want to delete \"Roadmap\" diagram?"
        );
        assert!(store.get("d1").await.unwrap().is_some());

        send_json(
            &mut tx,
            json!({"type": "confirm", "requestId": prompt["requestId"], "approved": true}),
        )
        .await;

        let frame = next_json(&mut rx).await;
        assert_eq!(frame["port"], "removedDiagram");
        let pair = frame["payload"].as_array().unwrap();
        assert_eq!(pair[1], true);
        let removed: Value = serde_json::from_str(pair[0].as_str().unwrap()).unwrap();
        assert_eq!(removed["id"], "d1");
        assert!(store.get("d1").await.unwrap().is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn declined_remove_sends_nothing() {
    timeout(TEST_TIMEOUT, async {
        let (port, store) = start_server().await;
        store
            .put(&DiagramRecord {
                id: Some("d1".into()),
                title: "Keep".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let (mut tx, mut rx) = connect(port).await;
        send_json(
            &mut tx,
            json!({"type": "removeDiagrams", "diagram": {"id": "d1", "title": "Keep"}}),
        )
        .await;

        let prompt = next_json(&mut rx).await;
        send_json(
            &mut tx,
            json!({"type": "confirm", "requestId": prompt["requestId"], "approved": false}),
        )
        .await;

        // The next frame must be the listing, not a removal notice.
        send_json(&mut tx, json!({"type": "getDiagrams"})).await;
        let frame = next_json(&mut rx).await;
        assert_eq!(frame["port"], "gotLocalDiagramJson");
        let listed = payload_of(&frame);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["id"], "d1");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn pending_confirmation_does_not_block_saves() {
    timeout(TEST_TIMEOUT, async {
        let (port, _store) = start_server().await;
        let (mut tx, mut rx) = connect(port).await;

        send_json(
            &mut tx,
            json!({"type": "removeDiagrams", "diagram": {"id": "gone", "title": "Later"}}),
        )
        .await;
        let prompt = next_json(&mut rx).await;
        assert_eq!(prompt["type"], "confirm");

        send_json(
            &mut tx,
            json!({"type": "saveDiagram", "diagram": {"title": "B", "text": "b"}}),
        )
        .await;
        let frame = next_json(&mut rx).await;
        assert_eq!(frame["port"], "saveToLocalCompleted");
        assert_eq!(payload_of(&frame)["title"], "B");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_request_gets_error_frame() {
    timeout(TEST_TIMEOUT, async {
        let (port, store) = start_server().await;
        let (mut tx, mut rx) = connect(port).await;

        send_json(
            &mut tx,
            json!({"type": "saveDiagram", "diagram": {"title": "A", "createdAt": null}}),
        )
        .await;

        let frame = next_json(&mut rx).await;
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["request"], "saveDiagram");
        assert!(!frame["message"].as_str().unwrap().is_empty());
        assert!(store.list().await.unwrap().is_empty());

        // The connection stays usable afterwards.
        send_json(&mut tx, json!({"type": "getDiagrams"})).await;
        let frame = next_json(&mut rx).await;
        assert_eq!(frame["port"], "gotLocalDiagramJson");
    })
    .await
    .expect("test timed out");
}
