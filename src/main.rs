use confab::{auth, chat, AppState, Config};
use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&config.database_url)
        .await?;
    confab::db::init_schema(&db_pool).await?;

    let app_state = AppState::new(db_pool);

    let app = Router::new()
        .nest("/auth", auth::router())
        .nest("/chat", chat::router())
        .with_state(app_state)
        // Open to any origin; this service is meant to sit behind a
        // trusted gateway.
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "chat relay listening");
    axum::serve(listener, app).await?;

    Ok(())
}
