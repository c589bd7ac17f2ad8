//! Configuration for chatlet.
//!
//! Two layers: `WidgetConfig`, resolved once from embedding attributes
//! (fails fast if the agent id is missing), and the CLI-side `Config`
//! loaded from `${CHATLET_HOME}/config.toml` with sensible defaults.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::embed::{self, EmbedAttrs};

/// Default bubble/accent color when `data-color` is absent.
pub const DEFAULT_BRAND_COLOR: &str = "#4f46e5";

/// Corner the widget is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    BottomLeft,
    #[default]
    BottomRight,
}

impl FromStr for Position {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bottom-left" => Ok(Position::BottomLeft),
            "bottom-right" => Ok(Position::BottomRight),
            other => Err(format!("Unknown position: {other}")),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::BottomLeft => write!(f, "bottom-left"),
            Position::BottomRight => write!(f, "bottom-right"),
        }
    }
}

/// Immutable widget configuration, resolved once at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub agent_id: String,
    pub brand_color: String,
    pub position: Position,
    pub api_base: String,
}

impl WidgetConfig {
    /// Resolves the configuration from embedding attributes and the
    /// script's resolved URL.
    ///
    /// # Errors
    /// Returns an error if `data-agent-id` is absent/blank or the script
    /// URL is unusable. Callers abort initialization (log, render nothing).
    pub fn resolve(attrs: &EmbedAttrs, script_src: &str) -> Result<Self> {
        let agent_id = attrs
            .agent_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .context("Missing data-agent-id attribute")?
            .to_string();

        let api_base = embed::derive_api_base(script_src)?;

        let brand_color = attrs
            .color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_BRAND_COLOR)
            .to_string();

        // An unknown position value is tolerated, not fatal.
        let position = match attrs.position.as_deref() {
            Some(value) => value.parse().unwrap_or_else(|err| {
                tracing::warn!("{err}; defaulting to {}", Position::default());
                Position::default()
            }),
            None => Position::default(),
        };

        Ok(Self {
            agent_id,
            brand_color,
            position,
            api_base,
        })
    }
}

/// Returns the chatlet home directory.
///
/// `$CHATLET_HOME` if set, otherwise `~/.chatlet`.
pub fn chatlet_home() -> PathBuf {
    if let Some(home) = std::env::var_os("CHATLET_HOME") {
        return PathBuf::from(home);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".chatlet")
}

/// Path to the CLI config file.
pub fn config_path() -> PathBuf {
    chatlet_home().join("config.toml")
}

/// CLI-side configuration with defaults for every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default API base URL (flag and `CHATLET_API_BASE` take precedence).
    pub api_base: Option<String>,
    /// Default agent id (flag takes precedence).
    pub agent_id: Option<String>,
    /// Accent color handed to widget embeds.
    pub brand_color: Option<String>,
    /// Widget anchor corner.
    pub position: Position,
}

impl Config {
    /// Loads configuration from the default path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Loads configuration from a specific path; a missing file yields
    /// defaults.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Resolves the API base with precedence: flag > env > config.
    ///
    /// # Errors
    /// Returns an error if no source provides a value.
    pub fn resolve_api_base(&self, flag: Option<&str>) -> Result<String> {
        if let Some(value) = non_empty(flag) {
            return Ok(value);
        }
        if let Ok(env_value) = std::env::var("CHATLET_API_BASE")
            && let Some(value) = non_empty(Some(env_value.as_str()))
        {
            return Ok(value);
        }
        non_empty(self.api_base.as_deref()).context(
            "No API base configured. Pass --api-base, set CHATLET_API_BASE, \
             or set api_base in config.toml.",
        )
    }

    /// Resolves the agent id with precedence: flag > config.
    ///
    /// # Errors
    /// Returns an error if no source provides a value.
    pub fn resolve_agent_id(&self, flag: Option<&str>) -> Result<String> {
        non_empty(flag)
            .or_else(|| non_empty(self.agent_id.as_deref()))
            .context("No agent id configured. Pass --agent-id or set agent_id in config.toml.")
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
