//! WebSocket push of round events
//!
//! Clients still poll for state; this channel only tells them when to.
//! Delivery is best effort: a slow client that lags the broadcast buffer
//! skips the missed events and keeps going.

use super::handlers::AppState;
use crate::notifier::{GameEvent, RoundNotifier};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::broadcast::error::RecvError, time::interval};
use tracing::{debug, error, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

static CLIENT_COUNT: AtomicU64 = AtomicU64::new(0);

/// GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let notifier = state.notifier.clone();
    ws.on_upgrade(move |socket| handle_connection(socket, notifier))
}

pub fn client_count() -> u64 {
    CLIENT_COUNT.load(Ordering::SeqCst)
}

async fn handle_connection(socket: WebSocket, notifier: RoundNotifier) {
    let client_id = generate_client_id();
    let total = CLIENT_COUNT.fetch_add(1, Ordering::SeqCst) + 1;
    info!("WebSocket client {} connected (total: {})", client_id, total);

    let (mut sender, mut receiver) = socket.split();
    let mut events = notifier.subscribe();

    let receive_client = client_id.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!("Client {} requested close", receive_client);
                    break;
                }
                Ok(Message::Text(text)) => {
                    debug!("Ignoring message from client {}: {}", receive_client, text);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error from client {}: {}", receive_client, e);
                    break;
                }
            }
        }
    });

    let send_client = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = interval(HEARTBEAT_INTERVAL);
        loop {
            let event = tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Client {} lagged, skipped {} events", send_client, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = heartbeat.tick() => GameEvent::Heartbeat { timestamp: Utc::now() },
            };

            let message = match serde_json::to_string(&event) {
                Ok(text) => Message::Text(text),
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    continue;
                }
            };

            if sender.send(message).await.is_err() {
                debug!("Client {} disconnected", send_client);
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut receive_task => send_task.abort(),
        _ = &mut send_task => receive_task.abort(),
    }

    let remaining = CLIENT_COUNT.fetch_sub(1, Ordering::SeqCst) - 1;
    info!("WebSocket client {} disconnected (remaining: {})", client_id, remaining);
}

fn generate_client_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("ws_{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}
