//! Relay errors

use thiserror::Error;

use core_kernel::{CoreError, PortError};
use infra_db::DatabaseError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// The dead-letter store or the settlement adapter failed outside a
    /// delivery attempt
    #[error("Port error: {0}")]
    Port(#[from] PortError),
}
