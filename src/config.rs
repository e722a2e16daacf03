use anyhow::Context;

/// Service configuration, read from the environment (or a `.env` file).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match dotenv::var("PORT") {
            Ok(raw) => raw.parse().context("PORT must be a number")?,
            Err(_) => 5000,
        };

        let database_url = dotenv::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:confab.db?mode=rwc".to_string());

        Ok(Self { port, database_url })
    }
}
