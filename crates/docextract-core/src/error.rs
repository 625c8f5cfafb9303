//! Error types for docextract.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing file, blank credential, or an otherwise malformed request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Every authentication format was rejected with 401.
    #[error("Invalid API key: the extraction service rejected the credential")]
    Unauthorized,

    #[error("Access forbidden: the API key lacks permission for this operation")]
    Forbidden,

    #[error("Extraction service error {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Connection, DNS, or timeout failure while talking to the upstream.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
