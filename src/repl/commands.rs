//! Slash commands for the chat REPL
//!
//! Anything not starting with `/` is a message for the model.

use std::path::PathBuf;

/// REPL command types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    Attach { path: PathBuf },
    Detach,
    Model { name: Option<String> },
    Mode { name: Option<String> },
    System { prompt: Option<String> },
    Key { key: String },
    Settings,
    Save,
    Reset,
    Clear,
    Unknown { input: String },
}

/// Check if input is a slash command
pub fn is_command(input: &str) -> bool {
    input.trim_start().starts_with('/')
}

/// Parse input string into a command
pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    let unknown = || Command::Unknown {
        input: trimmed.to_string(),
    };

    let body = match trimmed.strip_prefix('/') {
        Some(body) if !body.trim().is_empty() => body,
        _ => return unknown(),
    };

    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    match name.to_lowercase().as_str() {
        "help" | "h" | "?" => Command::Help,
        "exit" | "quit" | "q" => Command::Exit,
        "attach" | "a" => match argument {
            Some(path) => Command::Attach {
                path: PathBuf::from(path),
            },
            None => unknown(),
        },
        "detach" => Command::Detach,
        "model" => Command::Model { name: argument },
        "mode" => Command::Mode { name: argument },
        "system" => Command::System { prompt: argument },
        "key" => match argument {
            Some(key) => Command::Key { key },
            None => unknown(),
        },
        "settings" => Command::Settings,
        "save" => Command::Save,
        "reset" | "new" => Command::Reset,
        "clear" | "cls" => Command::Clear,
        _ => unknown(),
    }
}

/// Command list for `/help`
pub const HELP: &[(&str, &str)] = &[
    ("/help, /h", "Show this help message"),
    ("/attach <file>", "Attach a file to your next message"),
    ("/detach", "Drop files waiting to be sent"),
    ("/model [id]", "Show or switch the model"),
    ("/mode [mode]", "Show or switch the project mode"),
    ("/system [prompt]", "Show or replace the system prompt"),
    ("/key <key>", "Use a different API key"),
    ("/settings", "Show current settings"),
    ("/save", "Save current settings"),
    ("/reset, /new", "Start a new conversation"),
    ("/clear, /cls", "Clear screen"),
    ("/exit, /quit, /q", "Exit"),
];
