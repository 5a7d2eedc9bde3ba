use serde::Deserialize;
use stammtisch_common::snowflake::{ProcessId, WorkerId};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct DbConfig {
    pub database_url: String,
    pub worker_id: WorkerId,
    pub process_id: ProcessId,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if e.not_found() {
                debug!("No .env file found");
            } else {
                return Err(e.into());
            }
        }

        envy::from_env().map_err(ConfigError::from)
    }
}
