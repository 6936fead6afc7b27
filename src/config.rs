//! Settings persistence for sonarchat
//!
//! One TOML record under a fixed name, overwritten wholesale on save.
//! Location: ~/.sonarchat/settings.toml

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ChatError, Result};

/// Directory under the home directory holding the settings record
pub const SETTINGS_DIR: &str = ".sonarchat";

/// Fixed name of the settings record
pub const SETTINGS_FILE: &str = "settings.toml";

/// Default API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

/// Default request timeout (5 minutes, covers the whole streamed body)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert AI assistant for a model agency. \
Respond with clear, actionable advice and use Markdown formatting.";

/// Supported model identifiers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ModelId {
    #[default]
    Sonar,
    SonarPro,
    SonarReasoning,
    SonarReasoningPro,
    SonarDeepResearch,
}

impl ModelId {
    pub const ALL: [ModelId; 5] = [
        ModelId::Sonar,
        ModelId::SonarPro,
        ModelId::SonarReasoning,
        ModelId::SonarReasoningPro,
        ModelId::SonarDeepResearch,
    ];

    /// Identifier sent in the request body
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Sonar => "sonar",
            ModelId::SonarPro => "sonar-pro",
            ModelId::SonarReasoning => "sonar-reasoning",
            ModelId::SonarReasoningPro => "sonar-reasoning-pro",
            ModelId::SonarDeepResearch => "sonar-deep-research",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| ChatError::Config(format!("Unknown model: {}", s)))
    }
}

/// Project focus appended to the system prompt
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectMode {
    General,
    #[default]
    ModelBrand,
    Casting,
    Campaign,
}

impl ProjectMode {
    pub const ALL: [ProjectMode; 4] = [
        ProjectMode::General,
        ProjectMode::ModelBrand,
        ProjectMode::Casting,
        ProjectMode::Campaign,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectMode::General => "general",
            ProjectMode::ModelBrand => "model-brand",
            ProjectMode::Casting => "casting",
            ProjectMode::Campaign => "campaign",
        }
    }

    /// Line added to the system message, if any
    pub fn focus(&self) -> Option<&'static str> {
        match self {
            ProjectMode::General => None,
            ProjectMode::ModelBrand => {
                Some("Project focus: building and positioning a model's personal brand.")
            }
            ProjectMode::Casting => {
                Some("Project focus: casting calls, submissions and booking logistics.")
            }
            ProjectMode::Campaign => {
                Some("Project focus: planning and running client campaigns and shoots.")
            }
        }
    }
}

impl fmt::Display for ProjectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectMode {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        ProjectMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| ChatError::Config(format!("Unknown project mode: {}", s)))
    }
}

/// Endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// The persisted settings record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: String,
    pub model: ModelId,
    pub system_prompt: String,
    pub project_mode: ProjectMode,
    pub api: ApiConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: ModelId::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            project_mode: ProjectMode::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults
    ///
    /// A missing, unreadable or unparseable record yields the defaults.
    /// An empty system prompt is replaced by the default one.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|contents| toml::from_str::<Settings>(&contents).map_err(|e| e.to_string()));

        let mut settings = match parsed {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
                return Self::default();
            }
        };

        if settings.system_prompt.trim().is_empty() {
            settings.system_prompt = DEFAULT_SYSTEM_PROMPT.to_string();
        }
        settings
    }

    /// Trim and validate, then overwrite the record at `path`
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        self.api_key = self.api_key.trim().to_string();
        self.system_prompt = self.system_prompt.trim().to_string();
        self.validate()?;

        let contents = toml::to_string_pretty(self)
            .map_err(|e| ChatError::Config(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ChatError::Config(format!("Failed to create settings dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ChatError::Config(format!("Failed to write settings: {}", e)))?;

        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Standard settings location
    pub fn settings_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ChatError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ChatError::Config("base_url must not be empty".to_string()));
        }

        if self.api.timeout_secs == 0 {
            return Err(ChatError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// API key safe for display
    pub fn masked_api_key(&self) -> String {
        let key = self.api_key.trim();
        let chars: Vec<char> = key.chars().collect();
        match chars.len() {
            0 => "(not set)".to_string(),
            1..=8 => "*".repeat(chars.len()),
            n => format!("{}…{}", chars[..4].iter().collect::<String>(), chars[n - 4..].iter().collect::<String>()),
        }
    }

    /// System message content: prompt plus project focus
    pub fn system_message(&self) -> String {
        let prompt = self.system_prompt.trim();
        match self.project_mode.focus() {
            Some(focus) if prompt.is_empty() => focus.to_string(),
            Some(focus) => format!("{}\n\n{}", prompt, focus),
            None => prompt.to_string(),
        }
    }

    /// Full URL of the completions endpoint
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api.base_url.trim().trim_end_matches('/'))
    }
}
