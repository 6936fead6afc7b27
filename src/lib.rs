//! sonarchat - Terminal chat client for hosted sonar models
//!
//! Replies are streamed as newline-delimited JSON records and rendered
//! as they arrive.
//!
//! # Architecture
//!
//! - **streaming**: byte stream to text fragments (pull or handler based)
//! - **client**: the streaming HTTP request, failing before any decoding
//! - **config**: the persisted settings record
//! - **session**: history, attachments and one exchange at a time
//! - **render / repl / cli**: the terminal surface

pub mod errors;
pub mod types;
pub mod streaming;
pub mod client;
pub mod config;
pub mod session;
pub mod render;

// Re-export commonly used types
pub use errors::{ChatError, Result};
pub use session::{ChatSession, Exchange};

// Terminal surface
pub mod cli;
pub mod repl;
