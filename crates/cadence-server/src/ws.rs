//! `WebSocket` handler for the push subscription stream.
//!
//! Clients connect to `GET /socket`. The handler subscribes through the
//! gate, forwards every frame of its [`SubscriberChannel`] as a text
//! message (which preserves exact publish order -- the channel is a FIFO
//! drained only here), and answers pings. Client disconnects and write
//! failures tear down only this subscriber.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use cadence_core::SubscriberChannel;
use tracing::debug;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming status events.
///
/// # Route
///
/// `GET /socket`
pub async fn ws_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle the `WebSocket` lifecycle: subscribe, drain, unsubscribe.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut channel: SubscriberChannel = match state.gate.subscribe().await {
        Ok(channel) => channel,
        Err(e) => {
            debug!(error = %e, "subscription refused, closing socket");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    debug!(subscriber = %channel.id(), "WebSocket client connected");

    loop {
        tokio::select! {
            // Next outbound frame, in publish order.
            frame = channel.recv() => {
                match frame {
                    Some(frame) => {
                        let msg = Message::Text(frame.to_string().into());
                        if socket.send(msg).await.is_err() {
                            debug!(subscriber = %channel.id(), "WebSocket write failed, detaching");
                            break;
                        }
                    }
                    None => {
                        debug!(subscriber = %channel.id(), "status source gone, closing WebSocket");
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            // Client traffic: only close frames and pings matter.
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(subscriber = %channel.id(), "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(subscriber = %channel.id(), "WebSocket pong failed, detaching");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(subscriber = %channel.id(), error = %e, "WebSocket error");
                        break;
                    }
                    _ => {
                        // Ignore client text and binary frames.
                    }
                }
            }
        }
    }

    state.gate.unsubscribe(channel.id());
    channel.close();
}
