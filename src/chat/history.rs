use axum::{debug_handler, extract::{Path, State}, Json};
use uuid::Uuid;

use crate::AppResult;

use super::store::{Message, MessageStore, SqliteMessageStore};

/// `GET /chat/history/{userId}/{otherUserId}` — the whole conversation
/// between the pair, oldest first. Non-uuid path segments are rejected
/// by the extractor; store failures surface as a 500.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    Path((user_id, other_user_id)): Path<(Uuid, Uuid)>,
    State(store): State<SqliteMessageStore>,
) -> AppResult<Json<Vec<Message>>> {
    let messages = store.history(user_id, other_user_id).await?;
    Ok(Json(messages))
}
