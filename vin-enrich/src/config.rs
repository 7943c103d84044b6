//! Configuration resolution for vin-enrich
//!
//! Provides multi-tier configuration resolution with CLI → ENV → TOML →
//! built-in default priority. Only the registry base URL and the output
//! directory have environment variables; every other key is TOML or CLI.

use crate::services::{RetryPolicy, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT};
use crate::validators::default_essential_fields;
use crate::workflow::{PipelineConfig, DEFAULT_VINTAGE_AGE_THRESHOLD};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use vin_common::config::TomlConfig;
use vin_common::time::millis_to_duration;
use vin_common::{Error, Result};

/// Environment variable overriding the registry base URL
pub const ENV_API_BASE: &str = "NHTSA_API_BASE";

/// Environment variable overriding the report output directory
pub const ENV_OUTPUT_DIR: &str = "VIN_ENRICH_OUTPUT_DIR";

/// Default minimum spacing between request starts
pub const DEFAULT_CALL_SPACING: Duration = Duration::from_secs(3);

/// Default wall-clock budget for one stage
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Values supplied on the command line (highest priority)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub stage_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichConfig {
    pub api_base: String,
    pub retry: RetryPolicy,
    pub call_spacing: Duration,
    pub request_timeout: Duration,
    /// `None` disables the stage budget (configured as 0)
    pub stage_timeout: Option<Duration>,
    pub output_dir: PathBuf,
    pub vintage_age_threshold: i32,
    pub essential_fields: Vec<String>,
    pub log_level: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            retry: RetryPolicy::default(),
            call_spacing: DEFAULT_CALL_SPACING,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stage_timeout: Some(DEFAULT_STAGE_TIMEOUT),
            output_dir: PathBuf::from("."),
            vintage_age_threshold: DEFAULT_VINTAGE_AGE_THRESHOLD,
            essential_fields: default_essential_fields(),
            log_level: "info".to_string(),
        }
    }
}

impl EnrichConfig {
    /// Resolve from TOML, the process environment and CLI overrides
    pub fn resolve(toml: &TomlConfig, overrides: &ConfigOverrides) -> Result<Self> {
        Self::resolve_with_env(toml, overrides, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup
    ///
    /// # Errors
    /// `Config` when `max_attempts` is 0
    pub fn resolve_with_env<F>(
        toml: &TomlConfig,
        overrides: &ConfigOverrides,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let env_api_base = env(ENV_API_BASE).filter(|v| is_set(v));
        let api_base = resolve_tier(
            "API base URL",
            overrides.api_base.clone().filter(|v| is_set(v)),
            env_api_base,
            toml.api_base.clone().filter(|v| is_set(v)),
        )
        .unwrap_or(defaults.api_base);

        let env_output_dir = env(ENV_OUTPUT_DIR).filter(|v| is_set(v)).map(PathBuf::from);
        let output_dir = resolve_tier(
            "output directory",
            overrides.output_dir.clone(),
            env_output_dir,
            toml.output_dir.clone(),
        )
        .unwrap_or(defaults.output_dir);

        let stage_timeout = match overrides.stage_timeout_secs.or(toml.stage_timeout_secs) {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.stage_timeout,
        };

        let max_attempts = toml.max_attempts.unwrap_or(defaults.retry.max_attempts);
        if max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }

        let retry = RetryPolicy {
            max_attempts,
            base_backoff: toml
                .base_backoff_ms
                .map(millis_to_duration)
                .unwrap_or(defaults.retry.base_backoff),
            max_backoff: toml
                .max_backoff_ms
                .map(millis_to_duration)
                .unwrap_or(defaults.retry.max_backoff),
        };
        if retry.base_backoff > retry.max_backoff {
            warn!(
                base_backoff_ms = retry.base_backoff.as_millis() as u64,
                max_backoff_ms = retry.max_backoff.as_millis() as u64,
                "Base backoff exceeds max backoff; every retry will wait the maximum"
            );
        }

        let essential_fields = toml
            .essential_fields
            .clone()
            .unwrap_or(defaults.essential_fields);
        if essential_fields.is_empty() {
            warn!("Essential field checklist is empty; basic completeness will always be 100");
        }

        let log_level = overrides
            .log_level
            .clone()
            .unwrap_or_else(|| toml.logging.level.clone());

        Ok(Self {
            api_base,
            retry,
            call_spacing: toml
                .call_spacing_ms
                .map(millis_to_duration)
                .unwrap_or(defaults.call_spacing),
            request_timeout: toml
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            stage_timeout,
            output_dir,
            vintage_age_threshold: toml
                .vintage_age_threshold
                .unwrap_or(defaults.vintage_age_threshold),
            essential_fields,
            log_level,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            essential_fields: self.essential_fields.clone(),
            vintage_age_threshold: self.vintage_age_threshold,
        }
    }
}

/// Pick the highest-priority value, logging where it came from
fn resolve_tier<T>(name: &str, cli: Option<T>, env: Option<T>, toml: Option<T>) -> Option<T> {
    let sources: Vec<&str> = [
        cli.as_ref().map(|_| "command line"),
        env.as_ref().map(|_| "environment"),
        toml.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(source) = sources.first() {
        info!("{} loaded from {}", name, source);
    }

    cli.or(env).or(toml)
}

fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}
