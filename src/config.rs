//! Project configuration for profilekit
//!
//! Configuration is stored in `<project dir>/config.toml` and controls the
//! analyzer command and the evidence selection policy.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::evidence::EvidencePolicy;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Project metadata
    #[serde(default)]
    pub project: ProjectConfig,

    /// External analyzer configuration
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Evidence selection configuration
    #[serde(default)]
    pub evidence: EvidenceConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project identifier stamped onto versions, sets, and recommendations
    #[serde(default = "default_project_id")]
    pub id: String,
}

fn default_project_id() -> String {
    "default".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            id: default_project_id(),
        }
    }
}

/// External analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// CLI to invoke for analysis (must support non-interactive --print)
    #[serde(default = "default_analyzer_command")]
    pub command: String,

    /// Model override passed as --model (None = CLI default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Wall-clock budget for one analyzer call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_analyzer_command() -> String {
    "claude".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: default_analyzer_command(),
            model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Evidence selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvidenceConfig {
    /// Which comments feed a generation run: "all" or "since-last-set"
    #[serde(default)]
    pub policy: EvidencePolicy,
}

impl Config {
    /// Load configuration from `<dir>/config.toml`.
    /// Returns default config if file doesn't exist
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let config_path = dir.join("config.toml");

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config: {}", e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Save configuration to `<dir>/config.toml`.
    pub fn save(&self, dir: &Path) -> anyhow::Result<()> {
        let config_path = dir.join("config.toml");

        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

        fs::write(&config_path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write config: {}", e))?;

        Ok(())
    }

    /// Initialize default config file if it doesn't exist
    pub fn init(dir: &Path) -> anyhow::Result<bool> {
        let config_path = dir.join("config.toml");

        if config_path.exists() {
            return Ok(false); // Already exists
        }

        let config = Self::default();
        config.save(dir)?;
        Ok(true) // Created new
    }
}
