//! Error types for Nebula

use thiserror::Error;

/// Main error type for Nebula
#[derive(Error, Debug)]
pub enum NebulaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found in {0}")]
    ConfigNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, NebulaError>;
