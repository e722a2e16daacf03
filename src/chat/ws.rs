use axum::extract::ws::{Message as WsFrame, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AppState;

use super::presence::ConnectionHandle;
use super::protocol::ClientEvent;

/// Upgrade handler for `GET /chat/ws`.
pub async fn chat_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |stream| handle_socket(stream, state))
}

/// Drives one connection: a spawned writer drains the relay's channel
/// into the socket while this task parses inbound frames. Whatever way
/// the connection ends, disconnect bookkeeping runs exactly once.
async fn handle_socket(stream: WebSocket, state: AppState) {
    let conn_id = Uuid::now_v7();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.relay.handle_connect(ConnectionHandle::new(conn_id, tx));

    let (mut sender, mut receiver) = stream.split();

    let mut writer_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize server event");
                    continue;
                }
            };
            if sender.send(WsFrame::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(WsFrame::Text(text)) => dispatch(&state, conn_id, &text),
            Ok(WsFrame::Close(_)) => break,
            Err(err) => {
                tracing::debug!(%conn_id, error = %err, "socket receive error");
                break;
            }
            // Binary frames are not part of the protocol; ping/pong is
            // handled by the transport.
            Ok(_) => {}
        }
    }

    state.relay.handle_disconnect(conn_id);
    writer_task.abort();
}

/// Parse one inbound frame and hand it to the relay. This channel has no
/// way to answer errors, so anything malformed is logged and dropped.
fn dispatch(state: &AppState, conn_id: Uuid, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(%conn_id, error = %err, "dropping malformed chat frame");
            return;
        }
    };

    match event {
        ClientEvent::JoinChat { user_id } => match Uuid::parse_str(&user_id) {
            Ok(user_id) => state.relay.handle_join(conn_id, user_id),
            Err(err) => {
                tracing::warn!(%conn_id, %user_id, error = %err, "dropping join with invalid user id");
            }
        },
        ClientEvent::SendMessage { sender_id, receiver_id, text, client_message_id } => {
            let (Ok(sender_id), Ok(receiver_id)) =
                (Uuid::parse_str(&sender_id), Uuid::parse_str(&receiver_id))
            else {
                tracing::warn!(%conn_id, %sender_id, %receiver_id, "dropping message with invalid ids");
                return;
            };
            state.relay.handle_send(sender_id, receiver_id, text, client_message_id);
        }
    }
}
