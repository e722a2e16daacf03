//! The message relay: owns presence, fans messages out to rooms.
//!
//! All registry state lives behind one mutex that is never held across
//! an await point; every mutation happens inside these handlers.
//! Persistence is issued on a spawned task so a slow or failing store
//! can never stall live delivery.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::presence::{ConnectionHandle, ConnectionId, PresenceRegistry};
use super::protocol::ServerEvent;
use super::store::{Message, MessageStore};

pub struct Relay<S> {
    store: Arc<S>,
    registry: Mutex<PresenceRegistry>,
}

impl<S: MessageStore> Relay<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            registry: Mutex::new(PresenceRegistry::new()),
        }
    }

    /// A socket opened. It gets no presence or relay effects until it
    /// declares who it is with a join.
    pub fn handle_connect(&self, handle: ConnectionHandle) {
        let conn_id = handle.id();
        self.lock_registry().connect(handle);
        tracing::debug!(%conn_id, "connection opened");
    }

    /// Bind the connection to the user's room, then tell everyone who is
    /// online. The full list goes to every connection on every join, not
    /// a delta to the joiner.
    pub fn handle_join(&self, conn_id: ConnectionId, user_id: Uuid) {
        let mut registry = self.lock_registry();
        registry.join(conn_id, user_id);
        tracing::info!(%user_id, %conn_id, "user joined chat");
        let users = registry.active_users();
        registry.broadcast(&ServerEvent::ActiveUsers { users });
    }

    /// Persist and fan out one message.
    ///
    /// Delivery goes to the receiver's room and to the sender's own room
    /// so the sender's other tabs stay in sync. Persistence runs on its
    /// own task; a store failure is logged per message and the live path
    /// proceeds regardless.
    pub fn handle_send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        text: String,
        client_message_id: Option<String>,
    ) {
        if text.is_empty() {
            tracing::warn!(%sender_id, %receiver_id, "dropping message with empty text");
            return;
        }

        let message = Message::new(sender_id, receiver_id, text, client_message_id);

        let store = Arc::clone(&self.store);
        let record = message.clone();
        tokio::spawn(async move {
            if let Err(err) = store.append(&record).await {
                tracing::error!(
                    message_id = %record.id,
                    sender_id = %record.sender_id,
                    error = %err,
                    "failed to persist message, relayed anyway"
                );
            }
        });

        let event = ServerEvent::receive_message(&message);
        let registry = self.lock_registry();
        registry.send_to_room(receiver_id, &event);
        if sender_id != receiver_id {
            registry.send_to_room(sender_id, &event);
        }
    }

    /// A socket closed. If that was the user's last handle, everyone
    /// gets a fresh active-user list.
    pub fn handle_disconnect(&self, conn_id: ConnectionId) {
        let mut registry = self.lock_registry();
        if let Some(user_id) = registry.leave(conn_id) {
            tracing::info!(%user_id, %conn_id, "user went offline");
            let users = registry.active_users();
            registry.broadcast(&ServerEvent::ActiveUsers { users });
        } else {
            tracing::debug!(%conn_id, "connection closed");
        }
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, PresenceRegistry> {
        // A poisoned registry means a panic inside bookkeeping; the maps
        // themselves stay structurally valid, so keep serving.
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}
