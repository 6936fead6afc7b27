//! Error types for sonarchat
//!
//! Request-level failures (missing credential, non-ok status, transport)
//! are fatal to the current exchange. Malformed stream records never
//! reach this type: the decoder skips them.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the chat client
#[derive(Error, Debug)]
pub enum ChatError {
    /// No credential configured; no request was sent
    #[error("No API key configured. Set one with `sonarchat config set --api-key <KEY>`")]
    MissingApiKey,

    /// The API answered with a non-success status
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The response body failed mid-stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// Carry-over buffer grew past its limit without a newline
    #[error("Stream buffer overflow: {size} bytes exceeds maximum {max}")]
    BufferOverflow { size: usize, max: usize },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Settings could not be read, validated or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file could not be attached
    #[error("Cannot attach {path}: {reason}")]
    Attachment { path: PathBuf, reason: String },
}

impl ChatError {
    /// True for failures of the exchange itself rather than local setup
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ChatError::Api { .. } | ChatError::Transport(_) | ChatError::Http(_)
        )
    }
}

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;
