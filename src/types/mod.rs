//! Type definitions module
//!
//! Conversation messages and the request body sent to the API.

pub mod message;
pub mod request;

// Re-export commonly used types
pub use message::{Attachment, Message, Role};
pub use request::{ChatRequest, ContentPart, ImageUrl, WireContent, WireMessage};
