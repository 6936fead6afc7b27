//! sonarchat - Main CLI Entry Point

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::{pin_mut, StreamExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sonarchat::{
    cli::{Args, Commands, ConfigCommand, Verbosity},
    client::ChatClient,
    config::Settings,
    render::{FragmentSink, ResponseRenderer},
    repl::{display, input::InputHandler, ReplSession},
    types::Attachment,
    ChatSession,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(msg) = args.validate() {
        display::show_error(&msg);
        std::process::exit(2);
    }

    init_tracing(args.verbosity());

    let settings_path = match &args.config {
        Some(path) => path.clone(),
        None => Settings::settings_path()?,
    };
    let settings = Settings::load_from(&settings_path);

    match &args.command {
        Some(Commands::Config { action }) => run_config(action, settings, &settings_path),
        Some(Commands::Models) => {
            display::show_models(settings.model);
            Ok(())
        }
        Some(Commands::Ask { prompt }) => ask(&args, settings, prompt).await,
        Some(Commands::Chat) => chat(&args, settings, settings_path).await,
        None => match &args.prompt {
            Some(prompt) => ask(&args, settings, prompt).await,
            None => chat(&args, settings, settings_path).await,
        },
    }
}

/// Logs go to stderr so they never mix with the streamed reply
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn run_config(action: &ConfigCommand, mut settings: Settings, path: &Path) -> Result<()> {
    match action {
        ConfigCommand::Show => display::show_settings(&settings),
        ConfigCommand::Path => println!("{}", path.display()),
        ConfigCommand::Set { .. } => {
            if !action.apply(&mut settings) {
                display::show_warning("Nothing to change. See `sonarchat config set --help`.");
                return Ok(());
            }
            settings
                .save_to(path)
                .context("Failed to save settings")?;
            display::show_success(&format!("Settings saved to {}", path.display()));
        }
    }
    Ok(())
}

async fn open_session(args: &Args, mut settings: Settings) -> Result<ChatSession> {
    args.apply_overrides(&mut settings);
    settings.validate()?;

    let client = ChatClient::from_settings(&settings)?;
    let mut session = ChatSession::new(settings, Arc::new(client));

    for path in &args.attachments {
        let attachment = Attachment::from_path(path).await?;
        session.attach(attachment);
    }

    Ok(session)
}

/// One question, streamed to stdout
async fn ask(args: &Args, settings: Settings, prompt: &str) -> Result<()> {
    let mut session = open_session(args, settings).await?;

    let mut renderer = if args.verbosity().show_progress() {
        ResponseRenderer::with_spinner(io::stdout(), "Thinking…")
    } else {
        ResponseRenderer::new(io::stdout())
    };

    let stream = match session.ask_stream(prompt).await {
        Ok(stream) => stream,
        Err(e) => {
            renderer.clear_spinner();
            display::show_error(&e.to_string());
            std::process::exit(1);
        }
    };
    pin_mut!(stream);

    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(text) => renderer.on_fragment(&text),
            Err(e) => {
                renderer.on_error(&e);
                std::process::exit(1);
            }
        }
    }
    renderer.on_done();

    Ok(())
}

/// Interactive chat
async fn chat(args: &Args, settings: Settings, settings_path: PathBuf) -> Result<()> {
    let session = open_session(args, settings).await?;

    let history_path = settings_path
        .parent()
        .map(|dir| dir.join("history"))
        .unwrap_or_else(|| PathBuf::from(".sonarchat_history"));
    let input = InputHandler::with_history(history_path)?;

    ReplSession::new(session, input, settings_path, args.verbosity())
        .run()
        .await
}
