//! Request body for the streaming chat completions endpoint

use serde::Serialize;

use crate::types::{Message, Role};

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
}

impl ChatRequest {
    /// Streaming request for a conversation
    pub fn streaming(model: impl Into<String>, messages: &[Message]) -> Self {
        Self {
            model: model.into(),
            messages: messages.iter().map(WireMessage::from).collect(),
            stream: true,
        }
    }
}

/// A message as the API expects it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: WireContent,
}

/// Plain text, or text plus image parts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let mut text = message.content().to_string();

        // Files without a preview can only be named.
        let listed: Vec<&str> = message
            .attachments()
            .iter()
            .filter(|a| a.preview_data().is_none())
            .map(|a| a.name())
            .collect();
        if !listed.is_empty() {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str("Attached files: ");
            text.push_str(&listed.join(", "));
        }

        let images: Vec<ContentPart> = message
            .attachments()
            .iter()
            .filter_map(|a| a.data_uri())
            .map(|url| ContentPart::ImageUrl {
                image_url: ImageUrl { url },
            })
            .collect();

        let content = if images.is_empty() {
            WireContent::Text(text)
        } else {
            let mut parts = Vec::with_capacity(images.len() + 1);
            if !text.is_empty() {
                parts.push(ContentPart::Text { text });
            }
            parts.extend(images);
            WireContent::Parts(parts)
        };

        Self {
            role: message.role(),
            content,
        }
    }
}
