//! Configuration loading and resolution
//!
//! Each configurable value resolves with CLI → ENV → TOML priority. The TOML
//! file lives at `<config-dir>/nirqa/config.toml`; every key is optional.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::{Error, Result};

fn default_recheck() -> bool {
    true
}

/// Optional settings from the TOML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Chat-completions endpoint of the reviewing service
    pub llm_endpoint: Option<String>,
    /// Bearer key for the reviewing service
    pub llm_api_key: Option<String>,
    /// Model name sent with each review request
    pub llm_model: Option<String>,
    /// Base URL of the remote records API
    pub records_api_base: Option<String>,
    /// Bearer token for remote record updates
    pub records_api_token: Option<String>,
    /// Whether records already carrying the QA-checked marker are re-reviewed
    #[serde(default = "default_recheck")]
    pub recheck_checked: bool,
}

/// Default configuration file path for the platform
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nirqa").join("config.toml"))
}

/// Load the TOML config, or defaults when the file does not exist
pub fn load_toml_config() -> Result<TomlConfig> {
    load_toml_config_from(config_file_path())
}

fn load_toml_config_from(path: Option<PathBuf>) -> Result<TomlConfig> {
    let Some(path) = path else {
        return Ok(TomlConfig::default());
    };
    if !path.exists() {
        return Ok(TomlConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {e}")))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {e}")))?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Resolve one value from CLI → ENV → TOML
///
/// Warns when the value is present in more than one source.
pub fn resolve_value(
    name: &str,
    cli: Option<&str>,
    env_var: &str,
    toml_value: Option<&str>,
) -> Option<String> {
    let env_value = std::env::var(env_var).ok();

    let mut sources = Vec::new();
    if cli.map(is_valid_value).unwrap_or(false) {
        sources.push("command line");
    }
    if env_value.as_deref().map(is_valid_value).unwrap_or(false) {
        sources.push("environment");
    }
    if toml_value.map(is_valid_value).unwrap_or(false) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(value) = cli {
        if is_valid_value(value) {
            return Some(value.to_string());
        }
    }
    if let Some(value) = env_value {
        if is_valid_value(&value) {
            return Some(value);
        }
    }
    if let Some(value) = toml_value {
        if is_valid_value(value) {
            return Some(value.to_string());
        }
    }
    None
}

/// Resolve a value that must be configured; a miss is fatal to the run
pub fn resolve_required(
    name: &str,
    cli: Option<&str>,
    env_var: &str,
    toml_value: Option<&str>,
) -> Result<String> {
    resolve_value(name, cli, env_var, toml_value).ok_or_else(|| {
        Error::Config(format!(
            "{name} not configured. Provide it via:\n\
             1. Command-line flag\n\
             2. Environment: {env_var}=...\n\
             3. TOML config: {}",
            config_file_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<config-dir>/nirqa/config.toml".to_string())
        ))
    })
}

/// Resolve a boolean setting from CLI → ENV → TOML, falling back to the
/// TOML value (or its default) when no source sets it.
pub fn resolve_bool(name: &str, cli: Option<bool>, env_var: &str, toml_value: bool) -> bool {
    let cli_str = cli.map(|b| if b { "true" } else { "false" });
    let toml_str = if toml_value { "true" } else { "false" };
    resolve_value(name, cli_str, env_var, Some(toml_str))
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(toml_value)
}

/// Validate a configured value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}
