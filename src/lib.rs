pub mod appresult;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use chat::{Relay, SqliteMessageStore};

pub use appresult::{AppError, AppResult};
pub use config::Config;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub store: SqliteMessageStore,
    pub relay: Arc<Relay<SqliteMessageStore>>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool) -> Self {
        let store = SqliteMessageStore::new(db_pool.clone());
        let relay = Arc::new(Relay::new(store.clone()));
        Self { db_pool, store, relay }
    }
}
