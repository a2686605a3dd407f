//! Application configuration loaded from environment variables.

use crate::errors::{Result, SimulatorError};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file holding recorded runs
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./simulations.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| SimulatorError::Config("Invalid API_PORT".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| SimulatorError::Config(format!("Missing env var: {key}")))
}
