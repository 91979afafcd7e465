use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fetch::DEFAULT_USER_AGENT;
use crate::models::DEFAULT_STATUS;

/// Settings from `config.json` in the user config dir. Every field is
/// optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sheet database; `None` uses the data dir.
    pub database_path: Option<PathBuf>,
    /// Per-platform parsers. Off means everything goes through the generic heuristics.
    pub platform_parsers: bool,
    pub default_status: String,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            platform_parsers: true,
            default_status: DEFAULT_STATUS.to_string(),
            fetch_timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "jobclip").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load from the default location, falling back to defaults when there is no file.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
