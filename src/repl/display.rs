//! Terminal output helpers shared by the REPL and the CLI

use colored::*;

use crate::config::{ModelId, ProjectMode, Settings};
use crate::repl::commands::HELP;
use crate::types::Attachment;

/// Show welcome banner
pub fn show_banner(version: &str, settings: &Settings) {
    let width = 64;
    let title = format!("  sonarchat {} - Interactive Chat", version);
    let info = format!(
        "  Model: {} | Mode: {} | Key: {}",
        settings.model,
        settings.project_mode,
        if settings.has_api_key() { "set" } else { "missing" }
    );

    println!("\n{}", "=".repeat(width).cyan());
    println!("{}", title.bold().cyan());
    println!("{}", info.dimmed());
    println!("{}\n", "=".repeat(width).cyan());
    println!(
        "Type your message (or {} for commands, {} to quit). Ctrl-C stops a reply.\n",
        "/help".green(),
        "/exit".green()
    );
}

/// Print the assistant label before a streamed reply
pub fn show_reply_label(model: ModelId) {
    println!("{}", format!("{}>", model).bold().magenta());
}

pub fn show_help() {
    println!("\n{}", "Available Commands:".bold().cyan());
    println!("{}", "=".repeat(60).cyan());

    for (cmd, desc) in HELP {
        println!("  {:<20} {}", cmd.green(), desc);
    }

    println!("\n{}", "Usage:".bold());
    println!("  - Type your message directly (no / prefix)");
    println!("  - Use {} for input history", "UP/DOWN arrows".cyan());
    println!("  - Press {} or {} to exit", "Ctrl-D".cyan(), "/exit".cyan());
    println!();
}

/// Print settings with the API key masked
pub fn show_settings(settings: &Settings) {
    println!("\n{}", "Settings:".bold().cyan());
    println!("{}", "=".repeat(60).cyan());
    println!("  {:<15} {}", "api key".green(), settings.masked_api_key());
    println!("  {:<15} {}", "model".green(), settings.model);
    println!("  {:<15} {}", "project mode".green(), settings.project_mode);
    println!("  {:<15} {}", "endpoint".green(), settings.endpoint());
    println!("  {:<15} {}s", "timeout".green(), settings.api.timeout_secs);
    println!("  {:<15} {}", "system prompt".green(), settings.system_prompt.dimmed());
    println!();
}

pub fn show_models(current: ModelId) {
    for model in ModelId::ALL {
        if model == current {
            println!("  {} {}", "*".green(), model.to_string().green().bold());
        } else {
            println!("    {}", model);
        }
    }
}

pub fn show_modes(current: ProjectMode) {
    for mode in ProjectMode::ALL {
        let marker = if mode == current { "*".green() } else { " ".normal() };
        let focus = mode.focus().unwrap_or("No extra focus");
        println!("  {} {:<12} {}", marker, mode.to_string(), focus.dimmed());
    }
}

pub fn show_attachments(attachments: &[Attachment]) {
    if attachments.is_empty() {
        println!("{}", "No files attached.".yellow());
        return;
    }
    for attachment in attachments {
        let preview = if attachment.preview_data().is_some() {
            " (preview)"
        } else {
            ""
        };
        println!(
            "  {} {} [{}]{}",
            "📎".normal(),
            attachment.name(),
            attachment.mime_type().dimmed(),
            preview.dimmed()
        );
    }
}

pub fn show_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn show_info(message: &str) {
    println!("{}", message.cyan());
}

pub fn show_warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message.yellow());
}

pub fn show_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}
