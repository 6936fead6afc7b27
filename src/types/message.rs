//! Conversation message types
//!
//! Messages and attachments are immutable once built: fields are private
//! and only read accessors are exposed.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::errors::{ChatError, Result};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A file attached to a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    name: String,
    mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview_data: Option<String>,
}

impl Attachment {
    /// Describe an attachment without reading it
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            preview_data: None,
        }
    }

    /// Attachment with a base64 preview, kept only for image types
    pub fn with_preview(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        let mut attachment = Self::new(name, mime_type);
        if attachment.is_image() {
            attachment.preview_data = Some(STANDARD.encode(bytes));
        }
        attachment
    }

    /// Load an attachment from disk
    ///
    /// The MIME type is guessed from the extension. Only images are read,
    /// to build their preview.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ChatError::Attachment {
                path: path.to_path_buf(),
                reason: "not a file path".to_string(),
            })?;

        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ChatError::Attachment {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !metadata.is_file() {
            return Err(ChatError::Attachment {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }

        if !mime_type.starts_with("image/") {
            return Ok(Self::new(name, mime_type));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ChatError::Attachment {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        tracing::debug!(name = %name, mime = %mime_type, bytes = bytes.len(), "loaded image attachment");
        Ok(Self::with_preview(name, mime_type, &bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn preview_data(&self) -> Option<&str> {
        self.preview_data.as_deref()
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// `data:` URI of the preview, if there is one
    pub fn data_uri(&self) -> Option<String> {
        self.preview_data
            .as_ref()
            .map(|data| format!("data:{};base64,{}", self.mime_type, data))
    }
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content, Vec::new())
    }

    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::new(Role::User, content, attachments)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, Vec::new())
    }

    fn new(role: Role, content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}
