//! Interactive chat REPL
//!
//! Reads lines, runs slash commands, and streams replies for everything
//! else. Ctrl-C during a reply aborts that reply only.

pub mod commands;
pub mod display;
pub mod input;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::cli::Verbosity;
use crate::client::ChatClient;
use crate::config::{ModelId, ProjectMode};
use crate::errors::ChatError;
use crate::render::ResponseRenderer;
use crate::repl::commands::{is_command, Command};
use crate::repl::input::{Input, InputHandler};
use crate::session::ChatSession;
use crate::streaming::{AbortHandle, Completion};
use crate::types::Attachment;

/// REPL session coordinator
pub struct ReplSession {
    input: InputHandler,
    chat: ChatSession,
    settings_path: PathBuf,
    verbosity: Verbosity,
}

impl ReplSession {
    pub fn new(
        chat: ChatSession,
        input: InputHandler,
        settings_path: PathBuf,
        verbosity: Verbosity,
    ) -> Self {
        Self {
            input,
            chat,
            settings_path,
            verbosity,
        }
    }

    /// Run until `/exit` or Ctrl-D
    pub async fn run(&mut self) -> Result<()> {
        display::show_banner(env!("CARGO_PKG_VERSION"), self.chat.settings());
        if !self.chat.settings().has_api_key() {
            display::show_warning("No API key set. Use /key <KEY> or `sonarchat config set --api-key`.");
        }

        loop {
            let line = match self.input.read_line()? {
                Input::Line(line) => line,
                Input::Interrupted => continue,
                Input::Eof => break,
            };

            if line.is_empty() {
                continue;
            }

            if is_command(&line) {
                if !self.handle_command(commands::parse(&line)).await? {
                    break;
                }
                continue;
            }

            self.send(&line).await;
        }

        self.input.save_history()?;
        Ok(())
    }

    /// Returns false when the REPL should exit
    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Help => display::show_help(),
            Command::Exit => {
                display::show_info("Goodbye!");
                return Ok(false);
            }
            Command::Attach { path } => {
                let path = expand_home(&path);
                match Attachment::from_path(&path).await {
                    Ok(attachment) => {
                        display::show_success(&format!("Attached {}", attachment.name()));
                        self.chat.attach(attachment);
                    }
                    Err(e) => display::show_error(&e.to_string()),
                }
            }
            Command::Detach => {
                self.chat.clear_attachments();
                display::show_success("Attachments cleared");
            }
            Command::Model { name: None } => display::show_models(self.chat.settings().model),
            Command::Model { name: Some(name) } => match name.parse::<ModelId>() {
                Ok(model) => {
                    self.chat.settings_mut().model = model;
                    display::show_success(&format!("Model set to {}", model));
                }
                Err(e) => display::show_error(&e.to_string()),
            },
            Command::Mode { name: None } => display::show_modes(self.chat.settings().project_mode),
            Command::Mode { name: Some(name) } => match name.parse::<ProjectMode>() {
                Ok(mode) => {
                    self.chat.settings_mut().project_mode = mode;
                    display::show_success(&format!("Project mode set to {}", mode));
                }
                Err(e) => display::show_error(&e.to_string()),
            },
            Command::System { prompt: None } => {
                display::show_info(&self.chat.settings().system_message())
            }
            Command::System { prompt: Some(prompt) } => {
                self.chat.settings_mut().system_prompt = prompt;
                display::show_success("System prompt updated");
            }
            Command::Key { key } => {
                self.chat.settings_mut().api_key = key.trim().to_string();
                match ChatClient::from_settings(self.chat.settings()) {
                    Ok(client) => {
                        self.chat.set_backend(Arc::new(client));
                        display::show_success("API key updated (use /save to keep it)");
                    }
                    Err(e) => display::show_error(&e.to_string()),
                }
            }
            Command::Settings => {
                display::show_settings(self.chat.settings());
                display::show_attachments(self.chat.pending_attachments());
            }
            Command::Save => match self.chat.settings_mut().save_to(&self.settings_path) {
                Ok(()) => display::show_success(&format!(
                    "Settings saved to {}",
                    self.settings_path.display()
                )),
                Err(e) => display::show_error(&e.to_string()),
            },
            Command::Reset => {
                self.chat.clear();
                display::show_success("Started a new conversation");
            }
            Command::Clear => print!("\x1B[2J\x1B[1;1H"),
            Command::Unknown { input } => {
                display::show_error(&format!("Unknown command: {}", input));
                display::show_info("Type /help for available commands");
            }
        }
        Ok(true)
    }

    /// Stream one reply; errors are shown, not returned
    async fn send(&mut self, text: &str) {
        if !self.chat.settings().has_api_key() {
            display::show_error(&ChatError::MissingApiKey.to_string());
            return;
        }

        display::show_reply_label(self.chat.settings().model);
        let renderer = if self.verbosity.show_progress() {
            ResponseRenderer::with_spinner(io::stdout(), "Thinking…")
        } else {
            ResponseRenderer::new(io::stdout())
        };
        let sink = Arc::new(Mutex::new(renderer));

        let abort = AbortHandle::new();
        let watcher = {
            let abort = abort.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    abort.abort();
                }
            })
        };

        let result = self.chat.send(text, sink.clone(), abort).await;
        watcher.abort();
        let reported = match sink.lock() {
            Ok(mut renderer) => {
                renderer.clear_spinner();
                renderer.has_failed()
            }
            Err(_) => false,
        };

        match result {
            Ok(exchange) if exchange.completion == Completion::Aborted => {
                display::show_warning("Reply stopped.");
            }
            Ok(exchange) if exchange.reply.is_empty() => {
                display::show_warning("The model returned no content.");
            }
            Ok(_) => println!(),
            // Mid-stream failures were already written by the renderer.
            Err(_) if reported => {}
            Err(e) => display::show_error(&e.to_string()),
        }
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
