//! Handler-based streaming response decoder
//!
//! Handlers are registered on a builder before the decoder exists, and
//! [`ResponseDecoder::run`] takes the decoder by value, so each response
//! body gets exactly one read loop and no emission can be missed.

use std::fmt;

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::errors::{ChatError, Result};
use crate::streaming::lines::{LineDecoder, MAX_BUFFER_SIZE};

type FragmentHandler = Box<dyn FnMut(&str) + Send>;
type ErrorHandler = Box<dyn FnOnce(&ChatError) + Send>;
type DoneHandler = Box<dyn FnOnce() + Send>;

/// How a read loop that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response body ended
    Finished,

    /// The stream was aborted through an [`AbortHandle`]
    Aborted,
}

/// Stops a running read loop at its next suspension point
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    /// Create an unaborted handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a clean stop; the decoder reports completion, not an error
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Check whether abort was requested
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Builder collecting delivery handlers for a [`ResponseDecoder`]
pub struct ResponseDecoderBuilder<S> {
    stream: S,
    max_buffer_size: usize,
    abort: AbortHandle,
    on_fragment: Option<FragmentHandler>,
    on_error: Option<ErrorHandler>,
    on_done: Option<DoneHandler>,
}

impl<S> ResponseDecoderBuilder<S> {
    /// Called once per record with a non-empty content delta
    pub fn on_fragment(mut self, handler: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_fragment = Some(Box::new(handler));
        self
    }

    /// Called at most once, on transport failure or buffer overflow
    pub fn on_error(mut self, handler: impl FnOnce(&ChatError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Called at most once, when the stream ends or is aborted
    pub fn on_done(mut self, handler: impl FnOnce() + Send + 'static) -> Self {
        self.on_done = Some(Box::new(handler));
        self
    }

    /// Share an abort handle created before the request was sent
    pub fn abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// Override the carry-over limit
    pub fn max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn build(self) -> ResponseDecoder<S> {
        ResponseDecoder {
            stream: self.stream,
            lines: LineDecoder::with_capacity(self.max_buffer_size),
            abort: self.abort,
            on_fragment: self.on_fragment,
            on_error: self.on_error,
            on_done: self.on_done,
        }
    }
}

impl<S> fmt::Debug for ResponseDecoderBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseDecoderBuilder")
            .field("max_buffer_size", &self.max_buffer_size)
            .field("on_fragment", &self.on_fragment.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_done", &self.on_done.is_some())
            .finish()
    }
}

/// Decoder that owns one response body and pushes fragments to handlers
pub struct ResponseDecoder<S> {
    stream: S,
    lines: LineDecoder,
    abort: AbortHandle,
    on_fragment: Option<FragmentHandler>,
    on_error: Option<ErrorHandler>,
    on_done: Option<DoneHandler>,
}

/// Result of one suspension point
enum Step<B> {
    Chunk(B),
    End,
    Aborted,
    Failed(ChatError),
}

impl<S, B> ResponseDecoder<S>
where
    S: Stream<Item = Result<B>> + Unpin,
    B: AsRef<[u8]>,
{
    /// Start building a decoder over an ok response body
    pub fn builder(stream: S) -> ResponseDecoderBuilder<S> {
        ResponseDecoderBuilder {
            stream,
            max_buffer_size: MAX_BUFFER_SIZE,
            abort: AbortHandle::new(),
            on_fragment: None,
            on_error: None,
            on_done: None,
        }
    }

    /// Handle for aborting the read loop from elsewhere
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Run the read loop to the end of the stream
    ///
    /// Exactly one of the done and error handlers fires before this
    /// returns. The returned value mirrors which one it was.
    pub async fn run(mut self) -> Result<Completion> {
        let outcome = self.read_loop().await;

        match &outcome {
            Ok(completion) => {
                tracing::debug!(?completion, "response stream completed");
                if let Some(done) = self.on_done.take() {
                    done();
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "response stream failed");
                if let Some(on_error) = self.on_error.take() {
                    on_error(e);
                }
            }
        }

        outcome
    }

    async fn read_loop(&mut self) -> Result<Completion> {
        let token = self.abort.token.clone();

        loop {
            let step = tokio::select! {
                biased;
                _ = token.cancelled() => Step::Aborted,
                item = self.stream.next() => match item {
                    Some(Ok(chunk)) => Step::Chunk(chunk),
                    Some(Err(e)) => Step::Failed(e),
                    None => Step::End,
                },
            };

            match step {
                Step::Chunk(chunk) => {
                    for fragment in self.lines.push(chunk.as_ref()) {
                        if token.is_cancelled() {
                            return Ok(Completion::Aborted);
                        }
                        if let Some(on_fragment) = self.on_fragment.as_mut() {
                            on_fragment(&fragment);
                        }
                    }
                    self.lines.check_overflow()?;
                }
                Step::End => {
                    self.lines.finish();
                    return Ok(Completion::Finished);
                }
                Step::Aborted => return Ok(Completion::Aborted),
                Step::Failed(e) => return Err(e),
            }
        }
    }
}

impl<S> fmt::Debug for ResponseDecoder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseDecoder")
            .field("lines", &self.lines)
            .field("aborted", &self.abort.is_aborted())
            .finish()
    }
}
