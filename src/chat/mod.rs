//! The real-time chat core: presence, relay, message persistence, and
//! the socket + history endpoints.

mod history;
pub mod presence;
pub mod protocol;
pub mod relay;
pub mod store;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use presence::{ConnectionHandle, ConnectionId, PresenceRegistry};
pub use relay::Relay;
pub use store::{Message, MessageStore, SqliteMessageStore, StorageError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/history/{user_id}/{other_user_id}", get(history::history))
        .route("/ws", get(ws::chat_ws))
}
