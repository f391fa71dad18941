//! WebSocket endpoint carrying the host boundary.
//!
//! Every connection gets its own coordinator, render surface, and
//! confirmation state; the store is shared. Requests run in their own task so
//! a removal waiting on the user does not hold up later saves.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ThumbnailConfig;
use crate::store::DiagramStore;
use crate::sync::{Confirm, Notification, Request, SyncCoordinator};
use crate::thumbnail::{MemorySurface, SvgThumbnailRenderer};

/// Capacity of each connection's outbound queues.
const OUTBOUND_CAPACITY: usize = 256;

// ── JSON Protocol ───────────────────────────────────────────────────────

/// Host → server frames that are not sync requests.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ControlMessage {
    /// Answer to a pending confirmation prompt.
    #[serde(rename_all = "camelCase")]
    Confirm { request_id: Uuid, approved: bool },
    /// The host's current rendering of the diagram, used for thumbnails.
    Render { svg: String },
}

/// Server → host frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServerMessage {
    Notification {
        port: &'static str,
        payload: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    Confirm { request_id: Uuid, message: String },
    Error {
        request: &'static str,
        message: String,
    },
}

impl From<Notification> for ServerMessage {
    fn from(notification: Notification) -> Self {
        Self::Notification {
            port: notification.port(),
            payload: notification.payload(),
        }
    }
}

// ── Confirmation over the socket ────────────────────────────────────────

/// Asks the connected host and waits for its `confirm` frame.
///
/// Prompts still open when the connection closes resolve to "no".
struct WsConfirm {
    pending: Mutex<HashMap<Uuid, oneshot::Sender<bool>>>,
    outbound: mpsc::Sender<ServerMessage>,
}

impl WsConfirm {
    fn new(outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            outbound,
        }
    }

    /// Deliver the host's answer. Returns `false` for unknown or stale ids.
    async fn resolve(&self, request_id: Uuid, approved: bool) -> bool {
        match self.pending.lock().await.remove(&request_id) {
            Some(tx) => tx.send(approved).is_ok(),
            None => false,
        }
    }

    async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        if !pending.is_empty() {
            debug!(count = pending.len(), "Dropping unanswered confirmations");
        }
        pending.clear();
    }
}

#[async_trait]
impl Confirm for WsConfirm {
    async fn confirm(&self, message: &str) -> bool {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id, tx);

        let prompt = ServerMessage::Confirm {
            request_id,
            message: message.to_string(),
        };
        if self.outbound.send(prompt).await.is_err() {
            self.pending.lock().await.remove(&request_id);
            return false;
        }

        rx.await.unwrap_or(false)
    }
}

// ── Router ──────────────────────────────────────────────────────────────

/// State shared across handlers.
#[derive(Clone)]
struct BridgeState {
    store: Arc<dyn DiagramStore>,
    thumbnail: ThumbnailConfig,
}

/// Build the Axum router with the sync WebSocket and health routes.
pub fn sync_routes(store: Arc<dyn DiagramStore>, thumbnail: ThumbnailConfig) -> Router {
    let state = BridgeState { store, thumbnail };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<BridgeState>) -> impl IntoResponse {
    match state.store.schema_version().await {
        Ok(version) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "service": "diagram-sync",
                "schemaVersion": version,
            })),
        ),
        Err(e) => {
            warn!(error = %e, "Health check could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "service": "diagram-sync",
                    "error": e.to_string(),
                })),
            )
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<BridgeState>) -> impl IntoResponse {
    info!("Host connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Per-connection wiring around one coordinator.
struct Connection {
    coordinator: Arc<SyncCoordinator>,
    confirm: Arc<WsConfirm>,
    surface: Arc<MemorySurface>,
    target_id: String,
    outbound: mpsc::Sender<ServerMessage>,
}

async fn handle_socket(mut socket: WebSocket, state: BridgeState) {
    info!("Host connected");

    let (notify_tx, mut notify_rx) = mpsc::channel::<Notification>(OUTBOUND_CAPACITY);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);

    let surface = MemorySurface::new();
    let renderer = SvgThumbnailRenderer::new(surface.clone(), state.thumbnail.clone());
    let confirm = Arc::new(WsConfirm::new(outbound_tx.clone()));
    let coordinator = Arc::new(SyncCoordinator::new(
        Arc::clone(&state.store),
        Arc::new(renderer),
        confirm.clone(),
        notify_tx,
    ));

    let conn = Connection {
        coordinator,
        confirm,
        surface,
        target_id: state.thumbnail.target_id.clone(),
        outbound: outbound_tx,
    };

    loop {
        tokio::select! {
            Some(notification) = notify_rx.recv() => {
                if send_frame(&mut socket, &ServerMessage::from(notification)).await.is_err() {
                    debug!("Host disconnected during notification send");
                    break;
                }
            }

            Some(message) = outbound_rx.recv() => {
                if send_frame(&mut socket, &message).await.is_err() {
                    debug!("Host disconnected during send");
                    break;
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, &conn).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Host disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // Close the queues first so prompts raised from here on fail to send.
    drop(outbound_rx);
    drop(notify_rx);
    conn.confirm.cancel_all().await;
    info!("Host connection closed");
}

async fn send_frame(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize server frame");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}

/// The request name a frame claims to be, if its `type` is one.
fn request_type(text: &str) -> Option<&'static str> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let kind = value.get("type")?.as_str()?;
    Request::NAMES.into_iter().find(|name| *name == kind)
}

async fn handle_client_message(text: &str, conn: &Connection) {
    match serde_json::from_str::<Request>(text) {
        Ok(request) => {
            let coordinator = Arc::clone(&conn.coordinator);
            let outbound = conn.outbound.clone();
            tokio::spawn(async move {
                let name = request.name();
                if let Err(e) = coordinator.handle(request).await {
                    warn!(request = name, error = %e, "Host request failed");
                    let _ = outbound
                        .send(ServerMessage::Error {
                            request: name,
                            message: e.to_string(),
                        })
                        .await;
                }
            });
            return;
        }
        Err(e) => {
            if let Some(name) = request_type(text) {
                warn!(request = name, error = %e, "Malformed host request");
                let _ = conn
                    .outbound
                    .send(ServerMessage::Error {
                        request: name,
                        message: format!("invalid {name} request: {e}"),
                    })
                    .await;
                return;
            }
        }
    }

    match serde_json::from_str::<ControlMessage>(text) {
        Ok(ControlMessage::Confirm {
            request_id,
            approved,
        }) => {
            if !conn.confirm.resolve(request_id, approved).await {
                warn!(request_id = %request_id, "Answer for unknown confirmation");
            }
        }
        Ok(ControlMessage::Render { svg }) => {
            conn.surface.mount(&conn.target_id, svg);
        }
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from host");
        }
    }
}
