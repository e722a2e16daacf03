//! Live presence bookkeeping.
//!
//! Nothing here is persisted; the registry starts empty on every
//! process start and is rebuilt from `join_chat` declarations. It is
//! owned by the relay and mutated only behind the relay's lock.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::protocol::ServerEvent;

pub type ConnectionId = Uuid;

/// One live socket: an id plus the channel its writer task drains.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue an event for this connection. A send to a connection whose
    /// writer already went away is a no-op; disconnect bookkeeping
    /// catches up when the read loop exits.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }
}

/// user id -> live connections, with a reverse index so disconnects
/// never scan.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    /// Every live connection, joined or not. Presence broadcasts go to
    /// all of them.
    connections: HashMap<ConnectionId, ConnectionHandle>,
    /// Room membership: user id -> connections bound to it.
    rooms: HashMap<Uuid, HashSet<ConnectionId>>,
    /// Which room each joined connection is in.
    owners: HashMap<ConnectionId, Uuid>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly opened connection. No presence effects until it
    /// joins.
    pub fn connect(&mut self, handle: ConnectionHandle) {
        self.connections.insert(handle.id(), handle);
    }

    /// Bind a connection to the room named `user_id`.
    ///
    /// Idempotent per connection. A connection may be in one room at a
    /// time: joining as a different user moves it. Unknown connections
    /// (already disconnected) are ignored.
    pub fn join(&mut self, conn_id: ConnectionId, user_id: Uuid) {
        if !self.connections.contains_key(&conn_id) {
            tracing::warn!(%conn_id, %user_id, "join from unknown connection, ignoring");
            return;
        }

        if let Some(previous) = self.owners.get(&conn_id).copied() {
            if previous == user_id {
                return;
            }
            self.remove_from_room(conn_id, previous);
        }

        self.rooms.entry(user_id).or_default().insert(conn_id);
        self.owners.insert(conn_id, user_id);
    }

    /// Drop a connection entirely. Returns the user id if that user just
    /// went offline (last handle removed), which is the caller's cue to
    /// broadcast presence.
    pub fn leave(&mut self, conn_id: ConnectionId) -> Option<Uuid> {
        self.connections.remove(&conn_id);
        let user_id = self.owners.remove(&conn_id)?;
        self.remove_from_room(conn_id, user_id).then_some(user_id)
    }

    /// Users with at least one live handle.
    pub fn active_users(&self) -> Vec<Uuid> {
        self.rooms.keys().copied().collect()
    }

    /// Send an event to every live connection, joined or not.
    pub fn broadcast(&self, event: &ServerEvent) {
        for handle in self.connections.values() {
            handle.send(event.clone());
        }
    }

    /// Send an event to every member of one room.
    pub fn send_to_room(&self, user_id: Uuid, event: &ServerEvent) {
        let Some(members) = self.rooms.get(&user_id) else {
            return;
        };
        for conn_id in members {
            if let Some(handle) = self.connections.get(conn_id) {
                handle.send(event.clone());
            }
        }
    }

    /// Removes the handle from a room; true if the room emptied.
    fn remove_from_room(&mut self, conn_id: ConnectionId, user_id: Uuid) -> bool {
        let Some(members) = self.rooms.get_mut(&user_id) else {
            return false;
        };
        members.remove(&conn_id);
        if members.is_empty() {
            self.rooms.remove(&user_id);
            return true;
        }
        false
    }
}
