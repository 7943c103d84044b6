//! Configuration loading and config file discovery
//!
//! The TOML file is optional. Resolution order for the file itself:
//! 1. Explicit path (command-line `--config`)
//! 2. `~/.config/vin-enrich/config.toml`
//! 3. `/etc/vin-enrich/config.toml` (Linux only)
//!
//! A missing file is not an error: callers get `TomlConfig::default()` and
//! [`LoadedConfig::log_source`] warns about it. A file that exists but cannot
//! be parsed is an error.
//!
//! Loading does not log by itself, so binaries can read the file before the
//! tracing subscriber exists and report where it came from afterwards.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name under the platform config dir
pub const APP_DIR_NAME: &str = "vin-enrich";

/// Config file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; the enrichment crate layers environment and
/// command-line overrides on top and fills remaining gaps with built-in
/// defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Registry API base URL
    #[serde(default)]
    pub api_base: Option<String>,

    /// Maximum attempts per registry call (including the first)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// First retry backoff in milliseconds (doubles on each retry)
    #[serde(default)]
    pub base_backoff_ms: Option<u64>,

    /// Upper bound for a single retry backoff in milliseconds
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,

    /// Minimum spacing between request starts in milliseconds
    #[serde(default)]
    pub call_spacing_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Wall-clock budget for one stage in seconds
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,

    /// Directory receiving the final report
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Vehicle age (years) at which the parts-availability insight fires
    #[serde(default)]
    pub vintage_age_threshold: Option<i32>,

    /// Registry field names counted for basic completeness
    #[serde(default)]
    pub essential_fields: Option<Vec<String>>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Candidate config file locations in priority order
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    }

    candidates
}

/// Find the first existing config file, honoring an explicit path first
///
/// An explicit path that does not exist is reported as `NotFound` since the
/// user asked for that file by name.
pub fn locate_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(Error::NotFound(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    Ok(config_file_candidates().into_iter().find(|p| p.exists()))
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// TOML configuration together with the file it was read from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    /// `None` when no file was found and defaults are in use
    pub source: Option<PathBuf>,
}

impl LoadedConfig {
    /// Log which file the configuration came from
    pub fn log_source(&self) {
        match &self.source {
            Some(path) => info!("Loaded configuration from {}", path.display()),
            None => warn!("No config file found, using built-in defaults"),
        }
    }
}

/// Load configuration, falling back to defaults when no file is present
pub fn load_toml_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let Some(path) = locate_config_file(explicit)? else {
        return Ok(LoadedConfig::default());
    };

    Ok(LoadedConfig {
        config: read_toml_config(&path)?,
        source: Some(path),
    })
}

fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    parse_toml_config(&content)
}
