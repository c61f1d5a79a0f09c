// zone_engine_core/server/src/core/error.rs
use crate::core::types::ZoneId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Position ({x}, {z}) is outside zone {zone}")]
    OutOfBounds { zone: ZoneId, x: f32, z: f32 },

    #[error("Invalid bounds for zone {zone}: {reason}")]
    InvalidBounds { zone: ZoneId, reason: String },

    #[error("Map data error: {0}")]
    MapData(String),

    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
