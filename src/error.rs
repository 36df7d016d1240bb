//! Error types for NetraConsole

use thiserror::Error;

/// NetraConsole error type
#[derive(Error, Debug)]
pub enum NetraError {
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Connection timed out")]
    Timeout,

    #[error("Connection closed")]
    Closed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for NetraError {
    fn from(e: serde_json::Error) -> Self {
        NetraError::Protocol(e.to_string())
    }
}

impl From<toml::de::Error> for NetraError {
    fn from(e: toml::de::Error) -> Self {
        NetraError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NetraError>;
