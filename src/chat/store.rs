use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// A chat message as persisted and as echoed over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    /// Unix milliseconds, assigned by the relay at send time.
    pub timestamp: i64,
    /// Client-generated id, carried verbatim for client-side de-duplication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
}

impl Message {
    pub fn new(
        sender_id: Uuid,
        receiver_id: Uuid,
        text: String,
        client_message_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            sender_id,
            receiver_id,
            text,
            timestamp: now_unix_ms(),
            client_message_id,
        }
    }
}

pub fn now_unix_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(#[from] uuid::Error),
}

/// Data-access seam for message persistence.
///
/// The relay only talks to this trait, so tests can swap in a store that
/// records or fails on demand.
pub trait MessageStore: Send + Sync + 'static {
    /// Persist one message; durable once the future resolves.
    fn append(&self, message: &Message)
        -> impl Future<Output = Result<(), StorageError>> + Send;

    /// All messages between the unordered pair `{a, b}`, ascending by
    /// timestamp (message id breaks millisecond ties in insert order).
    fn history(&self, a: Uuid, b: Uuid)
        -> impl Future<Output = Result<Vec<Message>, StorageError>> + Send;
}

#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MessageStore for SqliteMessageStore {
    async fn append(&self, message: &Message) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO messages (id,sender_id,receiver_id,text,timestamp,client_message_id)
             VALUES (?,?,?,?,?,?)",
        )
        .bind(message.id.to_string())
        .bind(message.sender_id.to_string())
        .bind(message.receiver_id.to_string())
        .bind(&message.text)
        .bind(message.timestamp)
        .bind(message.client_message_id.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn history(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, StorageError> {
        let rows: Vec<(String, String, String, String, i64, Option<String>)> = sqlx::query_as(
            "SELECT id,sender_id,receiver_id,text,timestamp,client_message_id FROM messages
             WHERE (sender_id=? AND receiver_id=?) OR (sender_id=? AND receiver_id=?)
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(b.to_string())
        .bind(a.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for (id, sender_id, receiver_id, text, timestamp, client_message_id) in rows {
            messages.push(Message {
                id: Uuid::parse_str(&id)?,
                sender_id: Uuid::parse_str(&sender_id)?,
                receiver_id: Uuid::parse_str(&receiver_id)?,
                text,
                timestamp,
                client_message_id,
            });
        }

        Ok(messages)
    }
}
