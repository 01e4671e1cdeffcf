//! Error types for obs-remote

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObsError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered the request with `status: "error"`.
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unrecognized reply status: {0}")]
    UnrecognizedStatus(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
