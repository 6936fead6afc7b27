//! Streaming response module
//!
//! Turns a newline-delimited completion stream into assistant text
//! fragments, either pulled as a `Stream` or pushed to handlers.

pub mod decoder;
pub mod lines;
pub mod record;
pub mod stream;

// Re-export commonly used types
pub use decoder::{AbortHandle, Completion, ResponseDecoder, ResponseDecoderBuilder};
pub use lines::{LineDecoder, MAX_BUFFER_SIZE};
pub use record::parse_fragment;
pub use stream::{fragments, fragments_with_capacity};
