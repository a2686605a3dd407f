//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(#[from] qf_engine::EngineError),
}

pub type Result<T> = std::result::Result<T, SimulatorError>;
