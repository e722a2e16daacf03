use sqlx::SqlitePool;

/// Create the tables the service needs if they are not there yet.
///
/// Uuids are stored as their string form, timestamps as unix
/// milliseconds.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id    TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name  TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id                TEXT PRIMARY KEY,
            sender_id         TEXT NOT NULL,
            receiver_id       TEXT NOT NULL,
            text              TEXT NOT NULL,
            timestamp         INTEGER NOT NULL,
            client_message_id TEXT
        )",
    )
    .execute(pool)
    .await?;

    // History is always queried by the unordered {sender, receiver} pair.
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_pair
         ON messages (sender_id, receiver_id, timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
