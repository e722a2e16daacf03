//! Identity resolution: map an email to a stable user id, creating the
//! identity on first contact.
//!
//! This is deliberately not authentication — no credential is checked.
//! The surrounding platform owns real auth; this service only needs a
//! stable id per email.

use axum::{debug_handler, extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    // Option so a missing field is a 400, not an extractor reject.
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    user_id: Uuid,
    name: String,
}

#[debug_handler]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    Json(LoginRequest { email }): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (user_id, name) = resolve_identity(&db_pool, email.as_deref().unwrap_or("")).await?;
    Ok(Json(LoginResponse { user_id, name }))
}

/// Return the identity for `email`, creating it if absent.
///
/// The insert uses `ON CONFLICT(email) DO NOTHING` and re-selects, so two
/// concurrent first contacts for the same email converge on one row.
pub async fn resolve_identity(pool: &SqlitePool, email: &str) -> AppResult<(Uuid, String)> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("email required".to_string()));
    }

    if let Some(identity) = lookup(pool, email).await? {
        return Ok(identity);
    }

    let name = email.split_once('@').map(|(local, _)| local).unwrap_or(email);
    sqlx::query("INSERT INTO users (id,email,name) VALUES (?,?,?) ON CONFLICT(email) DO NOTHING")
        .bind(Uuid::now_v7().to_string())
        .bind(email)
        .bind(name)
        .execute(pool)
        .await?;

    lookup(pool, email)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("identity vanished after insert")))
}

async fn lookup(pool: &SqlitePool, email: &str) -> AppResult<Option<(Uuid, String)>> {
    let row: Option<(String, String)> = sqlx::query_as("SELECT id,name FROM users WHERE email=?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    match row {
        Some((id, name)) => {
            let id = Uuid::parse_str(&id)
                .map_err(crate::chat::StorageError::Corrupt)?;
            Ok(Some((id, name)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn first_contact_creates_identity_with_local_part_name() {
        let pool = test_pool().await;
        let (_, name) = resolve_identity(&pool, "alice@co.com").await.unwrap();
        assert_eq!(name, "alice");
    }

    #[tokio::test]
    async fn resolving_twice_returns_the_same_id() {
        let pool = test_pool().await;
        let (first, _) = resolve_identity(&pool, "alice@co.com").await.unwrap();
        let (second, _) = resolve_identity(&pool, "alice@co.com").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn distinct_emails_get_distinct_ids() {
        let pool = test_pool().await;
        let (alice, _) = resolve_identity(&pool, "alice@co.com").await.unwrap();
        let (bob, _) = resolve_identity(&pool, "bob@co.com").await.unwrap();
        assert_ne!(alice, bob);
    }

    #[tokio::test]
    async fn concurrent_first_contact_creates_one_identity() {
        let pool = test_pool().await;

        let (left, right) = tokio::join!(
            resolve_identity(&pool, "race@co.com"),
            resolve_identity(&pool, "race@co.com"),
        );
        assert_eq!(left.unwrap().0, right.unwrap().0);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email=?")
            .bind("race@co.com")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn empty_email_is_a_validation_error() {
        let pool = test_pool().await;
        for email in ["", "   "] {
            match resolve_identity(&pool, email).await {
                Err(AppError::Validation(_)) => {}
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn existing_identity_is_returned_unchanged() {
        let pool = test_pool().await;
        let (id, _) = resolve_identity(&pool, "carol@co.com").await.unwrap();

        // A later resolve must not rewrite the stored name.
        sqlx::query("UPDATE users SET name=? WHERE email=?")
            .bind("Carol D.")
            .bind("carol@co.com")
            .execute(&pool)
            .await
            .unwrap();

        let (same_id, name) = resolve_identity(&pool, "carol@co.com").await.unwrap();
        assert_eq!(same_id, id);
        assert_eq!(name, "Carol D.");
    }
}
