//! Bootstrap configuration loading
//!
//! Configuration file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config directory (`~/.config/fda/<module>.toml`)
//! 4. System config (`/etc/fda/<module>.toml`, Linux only)
//! 5. Built-in defaults (no file)
//!
//! Individual settings that may come from several places (credentials in
//! particular) are resolved with [`resolve_tiered`].

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate the TOML config file for a module
///
/// Returns `None` when no candidate exists, in which case built-in defaults apply.
/// An explicitly requested path (CLI or environment) is returned even if missing so
/// that the subsequent load reports the error instead of silently using defaults.
pub fn locate_config_file(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    module_name: &str,
) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_value(env_var_name) {
        return Some(PathBuf::from(path));
    }

    let file_name = format!("{}.toml", module_name);

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("fda").join(&file_name)) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/fda").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    debug!("No config file found for {}, using built-in defaults", module_name);
    None
}

/// Load and parse a TOML config file, or return defaults when `path` is `None`
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Read config file {} failed: {}", path.display(), e))
    })?;

    let config = toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Parse config file {} failed: {}", path.display(), e))
    })?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// A setting value together with the tier it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSetting {
    pub value: String,
    pub source: &'static str,
}

/// Resolve a setting from ordered candidate sources
///
/// Candidates are `(source_name, value)` pairs in priority order. Blank values
/// are treated as absent. Warns when more than one source carries a value.
pub fn resolve_tiered(
    setting: &str,
    candidates: Vec<(&'static str, Option<String>)>,
) -> Option<ResolvedSetting> {
    let valid: Vec<(&'static str, String)> = candidates
        .into_iter()
        .filter_map(|(source, value)| value.filter(|v| is_valid_value(v)).map(|v| (source, v)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<&str> = valid.iter().map(|(source, _)| *source).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            setting,
            sources.join(", "),
            sources[0]
        );
    }

    valid.into_iter().next().map(|(source, value)| ResolvedSetting {
        value: value.trim().to_string(),
        source,
    })
}

/// Validate a setting value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Read an environment variable, treating unset and non-unicode values as absent
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
