//! Incremental line decoder for streaming responses
//!
//! Network reads do not line up with record boundaries, so bytes are
//! carried over between calls:
//! - UTF-8: an incomplete trailing code point waits for the next read
//! - Lines: everything after the last newline waits for the next read
//! - Buffer: 1MB maximum for a single unterminated line

use crate::errors::{ChatError, Result};
use crate::streaming::record::parse_fragment;

/// Maximum carry-over size (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Synchronous core of the streaming decoder
///
/// Feed it byte buffers in arrival order with [`push`](Self::push) and call
/// [`finish`](Self::finish) once the stream ends. No I/O happens here.
#[derive(Debug)]
pub struct LineDecoder {
    /// Bytes of a code point split across reads
    pending: Vec<u8>,

    /// Carry-over text: the unterminated tail of the stream so far
    buffer: String,

    /// Maximum carry-over size
    max_buffer_size: usize,
}

impl LineDecoder {
    /// Create new decoder with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create decoder with custom carry-over limit
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            pending: Vec::with_capacity(4),
            buffer: String::with_capacity(4096),
            max_buffer_size,
        }
    }

    /// Add bytes and return the fragments of every line they complete
    ///
    /// Fragments come back in line order. Lines that are blank, malformed
    /// or carry no content delta contribute nothing. Callers emit these
    /// before calling [`check_overflow`](Self::check_overflow).
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.decode_utf8(bytes);
        self.drain_lines()
    }

    /// Fail if the unterminated tail has grown past the limit
    pub fn check_overflow(&self) -> Result<()> {
        let carried = self.buffer.len() + self.pending.len();
        if carried > self.max_buffer_size {
            return Err(ChatError::BufferOverflow {
                size: carried,
                max: self.max_buffer_size,
            });
        }
        Ok(())
    }

    /// Final flush at end of stream
    ///
    /// Decodes any held-back bytes, then drops the unterminated trailing
    /// line without parsing it.
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        if !self.buffer.trim().is_empty() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "dropping unterminated line at end of stream"
            );
        }

        self.buffer.clear();
    }

    /// Decode bytes into the carry-over buffer
    ///
    /// Invalid sequences become U+FFFD. A truncated sequence at the end is
    /// kept in `pending` until more bytes arrive.
    fn decode_utf8(&mut self, bytes: &[u8]) {
        let joined;
        let mut input = if self.pending.is_empty() {
            bytes
        } else {
            let mut carried = std::mem::take(&mut self.pending);
            carried.extend_from_slice(bytes);
            joined = carried;
            &joined[..]
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[invalid..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Parse all complete lines and keep the partial tail
    fn drain_lines(&mut self) -> Vec<String> {
        let last_newline = match self.buffer.rfind('\n') {
            Some(index) => index,
            None => return Vec::new(),
        };

        let fragments = self.buffer[..last_newline]
            .split('\n')
            .filter_map(parse_fragment)
            .collect();

        self.buffer.drain(..=last_newline);
        fragments
    }

    /// Get current carry-over size in bytes
    pub fn buffer_size(&self) -> usize {
        self.buffer.len() + self.pending.len()
    }

    /// Check if nothing is carried over
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.pending.is_empty()
    }

    /// Discard all carried-over data
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending.clear();
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
