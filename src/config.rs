//! Configuration Module
//!
//! Handles the optional `stagefix.toml` next to the application.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stagefix.toml";

/// Environment variable overriding the config file path.
pub const CONFIG_ENV_VAR: &str = "STAGEFIX_CONFIG";

/// Shim configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log file, truncated at startup. `None` or an empty path logs to stderr.
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,

    /// Default log filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Perform eligible copies on the CPU
    #[serde(default = "default_true")]
    pub fast_path: bool,

    /// Create staging shadows for sources the CPU cannot read
    #[serde(default = "default_true")]
    pub shadow_resources: bool,

    /// Force CPU read+write access on staging resources at creation
    #[serde(default = "default_true")]
    pub promote_staging_access: bool,
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("stagefix.log"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            log_level: default_log_level(),
            fast_path: true,
            shadow_resources: true,
            promote_staging_access: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration, using defaults if the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Config file path from `STAGEFIX_CONFIG`, else the default file name.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Save configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
