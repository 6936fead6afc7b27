//! Incremental response rendering
//!
//! Fragments are appended to a running buffer and written to the terminal
//! as they arrive. A spinner stands in for the reply until the first
//! fragment shows up.

use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::errors::ChatError;

/// Receiver of one exchange's output
pub trait FragmentSink: Send {
    /// One piece of assistant text, in arrival order
    fn on_fragment(&mut self, text: &str);

    /// The stream ended or was aborted
    fn on_done(&mut self) {}

    /// The stream failed
    fn on_error(&mut self, _error: &ChatError) {}
}

/// Writes a streamed reply to a terminal or any other writer
pub struct ResponseRenderer<W: Write + Send> {
    out: W,
    text: String,
    spinner: Option<ProgressBar>,
    failed: bool,
}

impl<W: Write + Send> ResponseRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            text: String::new(),
            spinner: None,
            failed: false,
        }
    }

    /// Renderer that shows a "typing" spinner until the first fragment
    pub fn with_spinner(out: W, message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            out,
            text: String::new(),
            spinner: Some(spinner),
            failed: false,
        }
    }

    /// Everything rendered so far
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(mut self) -> String {
        std::mem::take(&mut self.text)
    }

    /// Whether a stream failure has been written
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Remove the spinner if it is still showing
    pub fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn write(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write response output");
        }
    }

    fn end_line(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.write("\n");
        }
    }
}

impl<W: Write + Send> FragmentSink for ResponseRenderer<W> {
    fn on_fragment(&mut self, text: &str) {
        self.clear_spinner();
        self.text.push_str(text);
        self.write(text);
    }

    fn on_done(&mut self) {
        self.clear_spinner();
        self.end_line();
    }

    fn on_error(&mut self, error: &ChatError) {
        self.failed = true;
        self.clear_spinner();
        self.end_line();
        let line = format!("{} {}\n", "✗".red().bold(), error.to_string().red());
        self.write(&line);
    }
}

impl<W: Write + Send> Drop for ResponseRenderer<W> {
    fn drop(&mut self) {
        self.clear_spinner();
    }
}
