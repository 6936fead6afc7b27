//! Chat session
//!
//! Owns the settings, the conversation history and the files waiting to be
//! attached. One exchange runs at a time: `send` takes `&mut self`.

use std::sync::{Arc, Mutex};

use futures_util::Stream;

use crate::client::ChatBackend;
use crate::config::Settings;
use crate::errors::{ChatError, Result};
use crate::render::FragmentSink;
use crate::streaming::{fragments, AbortHandle, Completion, ResponseDecoder};
use crate::types::{Attachment, ChatRequest, Message};

/// Sink shared with the decoder's handlers
pub type SharedSink = Arc<Mutex<dyn FragmentSink>>;

/// Outcome of one user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Concatenated fragments
    pub reply: String,

    /// Whether the reply ran to the end or was aborted
    pub completion: Completion,
}

/// Conversation state plus the backend it talks to
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    settings: Settings,
    history: Vec<Message>,
    pending: Vec<Attachment>,
}

impl ChatSession {
    pub fn new(settings: Settings, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            settings,
            history: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Replace the backend, e.g. after the API key changed
    pub fn set_backend(&mut self, backend: Arc<dyn ChatBackend>) {
        self.backend = backend;
    }

    /// Completed user and assistant turns, oldest first
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Forget the conversation
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Queue a file for the next message
    pub fn attach(&mut self, attachment: Attachment) {
        self.pending.push(attachment);
    }

    pub fn pending_attachments(&self) -> &[Attachment] {
        &self.pending
    }

    pub fn clear_attachments(&mut self) {
        self.pending.clear();
    }

    /// Request for `user`: system message, history, then `user`
    pub fn build_request(&self, user: &Message) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);

        let system = self.settings.system_message();
        if !system.is_empty() {
            messages.push(Message::system(system));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(user.clone());

        ChatRequest::streaming(self.settings.model.as_str(), &messages)
    }

    /// Send one user turn and stream the reply into `sink`
    ///
    /// Queued attachments go with the message. Request-level failures
    /// return before anything reaches the sink, and leave the queue and
    /// history as they were. A finished or aborted reply is added to the
    /// history; a failed one is not.
    pub async fn send(
        &mut self,
        text: &str,
        sink: SharedSink,
        abort: AbortHandle,
    ) -> Result<Exchange> {
        if !self.settings.has_api_key() {
            return Err(ChatError::MissingApiKey);
        }

        let user = Message::user(text, std::mem::take(&mut self.pending));
        let request = self.build_request(&user);

        let body = match self.backend.open_stream(&request).await {
            Ok(body) => body,
            Err(e) => {
                self.pending = user.attachments().to_vec();
                return Err(e);
            }
        };

        let reply = Arc::new(Mutex::new(String::new()));
        let collected = Arc::clone(&reply);
        let fragment_sink = Arc::clone(&sink);
        let done_sink = Arc::clone(&sink);
        let error_sink = sink;

        let completion = ResponseDecoder::builder(body)
            .abort_handle(abort)
            .on_fragment(move |fragment| {
                if let Ok(mut text) = collected.lock() {
                    text.push_str(fragment);
                }
                if let Ok(mut sink) = fragment_sink.lock() {
                    sink.on_fragment(fragment);
                }
            })
            .on_done(move || {
                if let Ok(mut sink) = done_sink.lock() {
                    sink.on_done();
                }
            })
            .on_error(move |e| {
                if let Ok(mut sink) = error_sink.lock() {
                    sink.on_error(e);
                }
            })
            .build()
            .run()
            .await?;

        let reply = reply
            .lock()
            .map(|mut text| std::mem::take(&mut *text))
            .unwrap_or_default();

        tracing::debug!(?completion, chars = reply.len(), "exchange finished");

        self.history.push(user);
        if !reply.is_empty() {
            self.history.push(Message::assistant(reply.clone()));
        }

        Ok(Exchange { reply, completion })
    }

    /// One-off question as a pull-based fragment stream
    ///
    /// Uses the system message and queued attachments but neither reads
    /// nor updates the history. A request-level failure leaves the queue
    /// as it was.
    pub async fn ask_stream(&mut self, text: &str) -> Result<impl Stream<Item = Result<String>>> {
        if !self.settings.has_api_key() {
            return Err(ChatError::MissingApiKey);
        }

        let user = Message::user(text, std::mem::take(&mut self.pending));
        let mut messages = Vec::with_capacity(2);
        let system = self.settings.system_message();
        if !system.is_empty() {
            messages.push(Message::system(system));
        }
        messages.push(user);

        let request = ChatRequest::streaming(self.settings.model.as_str(), &messages);
        let body = match self.backend.open_stream(&request).await {
            Ok(body) => body,
            Err(e) => {
                if let Some(user) = messages.pop() {
                    self.pending = user.attachments().to_vec();
                }
                return Err(e);
            }
        };
        Ok(fragments(body))
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("model", &self.settings.model)
            .field("history", &self.history.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
