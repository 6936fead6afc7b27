//! Chat completions streaming client
//!
//! Sends `POST {base_url}/chat/completions` with `stream: true` and a
//! bearer token, and hands back the raw response body. Every request-level
//! failure happens here, before a decoder is built:
//! - empty API key: no request is sent
//! - non-2xx status: the error body is read and returned

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;

use crate::config::Settings;
use crate::errors::{ChatError, Result};
use crate::types::ChatRequest;

/// Connect timeout (10 seconds)
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in [`ChatError::Api`]
const MAX_ERROR_BODY: usize = 500;

/// Response body of an accepted streaming request
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Anything that can open a streaming completion
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the request; return the body only for an ok response
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// HTTP backend for the hosted API
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ChatClient {
    /// Create client from stored settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::with_config(
            &settings.endpoint(),
            &settings.api_key,
            Duration::from_secs(settings.api.timeout_secs),
        )
    }

    /// Create client with custom configuration
    pub fn with_config(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(ChatError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    /// Get endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        if !self.has_api_key() {
            return Err(ChatError::MissingApiKey);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "sending streaming chat request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!(status, "chat request rejected");
            return Err(ChatError::Api {
                status,
                body: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| ChatError::Transport(e.to_string())));

        Ok(Box::pin(stream))
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("has_api_key", &self.has_api_key())
            .finish()
    }
}

/// Cut `text` to at most `max` bytes on a char boundary
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
