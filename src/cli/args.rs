//! Command-line argument parsing for sonarchat
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ModelId, ProjectMode, Settings};

/// sonarchat - Chat with hosted sonar models from the terminal
#[derive(Parser, Debug)]
#[command(name = "sonarchat")]
#[command(version)]
#[command(about = "Chat with hosted sonar models, streamed straight to your terminal", long_about = None)]
pub struct Args {
    /// Ask a single question and exit (same as `sonarchat ask`)
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Model to use for this run
    #[arg(short, long, value_enum)]
    pub model: Option<ModelId>,

    /// Project mode for this run
    #[arg(long, value_enum)]
    pub mode: Option<ProjectMode>,

    /// System prompt for this run
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// API key for this run
    #[arg(long, env = "SONARCHAT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Attach a file to the first message (repeatable)
    #[arg(short, long = "attach", value_name = "FILE")]
    pub attachments: Vec<PathBuf>,

    /// Settings file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only the reply and errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive chat
    Chat,

    /// Ask a single question and exit
    Ask {
        /// The question
        prompt: String,
    },

    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// List supported models
    Models,
}

/// Settings subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the stored settings (API key masked)
    Show,

    /// Print the settings file location
    Path,

    /// Update stored settings and save them
    Set {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(long, value_enum)]
        model: Option<ModelId>,

        #[arg(long)]
        system_prompt: Option<String>,

        #[arg(long, value_enum)]
        mode: Option<ProjectMode>,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Check that a bare prompt is not mixed with a subcommand
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_some() && self.prompt.is_some() {
            return Err("Cannot give a prompt together with a subcommand.".to_string());
        }

        Ok(())
    }

    /// Apply per-run flags on top of stored settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(model) = self.model {
            settings.model = model;
        }
        if let Some(mode) = self.mode {
            settings.project_mode = mode;
        }
        if let Some(prompt) = &self.system_prompt {
            settings.system_prompt = prompt.clone();
        }
        if let Some(key) = &self.api_key {
            if !key.trim().is_empty() {
                settings.api_key = key.trim().to_string();
            }
        }
    }
}

impl ConfigCommand {
    /// Apply a `config set` to settings; false if nothing was given
    pub fn apply(&self, settings: &mut Settings) -> bool {
        let ConfigCommand::Set {
            api_key,
            model,
            system_prompt,
            mode,
            base_url,
            timeout_secs,
        } = self
        else {
            return false;
        };

        let mut changed = false;
        if let Some(key) = api_key {
            settings.api_key = key.clone();
            changed = true;
        }
        if let Some(model) = model {
            settings.model = *model;
            changed = true;
        }
        if let Some(prompt) = system_prompt {
            settings.system_prompt = prompt.clone();
            changed = true;
        }
        if let Some(mode) = mode {
            settings.project_mode = *mode;
            changed = true;
        }
        if let Some(url) = base_url {
            settings.api.base_url = url.clone();
            changed = true;
        }
        if let Some(timeout) = timeout_secs {
            settings.api.timeout_secs = *timeout;
            changed = true;
        }
        changed
    }
}

impl Verbosity {
    /// Default log filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "sonarchat=debug,warn",
            Verbosity::VeryVerbose => "sonarchat=trace,info",
        }
    }

    /// Check if should show the typing spinner
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["sonarchat", "-q"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["sonarchat"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["sonarchat", "-v"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["sonarchat", "-vv"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_bare_prompt() {
        let args = parse(&["sonarchat", "how do I build a portfolio?"]);
        assert_eq!(args.prompt.as_deref(), Some("how do I build a portfolio?"));
        assert!(args.command.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(parse(&["sonarchat", "chat"]).command, Some(Commands::Chat));
        assert_eq!(parse(&["sonarchat", "models"]).command, Some(Commands::Models));
        assert_eq!(
            parse(&["sonarchat", "config", "show"]).command,
            Some(Commands::Config { action: ConfigCommand::Show })
        );
    }

    #[test]
    fn test_model_and_mode_values() {
        let args = parse(&["sonarchat", "--model", "sonar-pro", "--mode", "casting", "hi"]);
        assert_eq!(args.model, Some(ModelId::SonarPro));
        assert_eq!(args.mode, Some(ProjectMode::Casting));

        assert!(Args::try_parse_from(["sonarchat", "--model", "gpt-4"]).is_err());
    }

    #[test]
    fn test_attachments_repeat() {
        let args = parse(&["sonarchat", "-a", "a.png", "--attach", "b.pdf", "look"]);
        assert_eq!(
            args.attachments,
            vec![PathBuf::from("a.png"), PathBuf::from("b.pdf")]
        );
    }

    #[test]
    fn test_apply_overrides() {
        let args = parse(&[
            "sonarchat",
            "--model",
            "sonar-reasoning",
            "--system-prompt",
            "Be brief.",
            "--api-key",
            " k ",
        ]);
        let mut settings = Settings::default();

        args.apply_overrides(&mut settings);

        assert_eq!(settings.model, ModelId::SonarReasoning);
        assert_eq!(settings.system_prompt, "Be brief.");
        assert_eq!(settings.api_key, "k");
        assert_eq!(settings.project_mode, ProjectMode::ModelBrand);
    }

    #[test]
    fn test_config_set() {
        let args = parse(&[
            "sonarchat",
            "config",
            "set",
            "--api-key",
            "pplx-1",
            "--timeout-secs",
            "60",
        ]);
        let mut settings = Settings::default();

        let Some(Commands::Config { action }) = args.command else {
            panic!("expected config subcommand");
        };
        assert!(action.apply(&mut settings));
        assert_eq!(settings.api_key, "pplx-1");
        assert_eq!(settings.api.timeout_secs, 60);

        assert!(!ConfigCommand::Set {
            api_key: None,
            model: None,
            system_prompt: None,
            mode: None,
            base_url: None,
            timeout_secs: None,
        }
        .apply(&mut settings));
        assert!(!ConfigCommand::Show.apply(&mut settings));
    }

    #[test]
    fn test_validate_fail_both_prompt_and_command() {
        let args = Args {
            prompt: Some("hi".to_string()),
            command: Some(Commands::Models),
            ..parse(&["sonarchat"])
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(Verbosity::Normal.log_filter(), "warn");
        assert!(Verbosity::Verbose.log_filter().contains("sonarchat=debug"));
        assert!(!Verbosity::Quiet.show_progress());
    }
}
