//! services/api/src/error.rs
//!
//! Everything that can stop the onboarding server from starting or serving.

use crate::config::ConfigError;
use onboarding_core::{ports::PortError, slots::SchemaError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A port failure that was not absorbed by the flow controller.
    #[error("Port error: {0}")]
    Port(#[from] PortError),

    /// The slot schema could not be loaded; the server refuses to start.
    #[error("Slot schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("WebSocket error: {0}")]
    Websocket(#[from] axum::Error),

    /// Reading the slot schema or binding the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
