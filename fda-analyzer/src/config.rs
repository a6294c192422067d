//! Configuration resolution for fda-analyzer
//!
//! Bootstrap settings come from a TOML file (see `fda_common::config`) with CLI
//! overrides for the listener. The provider credential is resolved once at
//! startup with ENV → TOML priority:
//!
//! 1. `FDA_MODEL_API_KEY`
//! 2. `HF_TOKEN`
//! 3. TOML `[model] api_key`
//!
//! A missing credential is a startup failure. The resolved [`AnalyzerConfig`] is
//! immutable and handed explicitly to the components that need it.

use crate::intake::{IntakeLimits, DEFAULT_CHUNK_BYTES, DEFAULT_MAX_UPLOAD_BYTES};
use crate::models::analysis::DEFAULT_QUERY;
use fda_common::config::{env_value, resolve_tiered, LoggingConfig};
use fda_common::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Primary credential environment variable
pub const API_KEY_ENV: &str = "FDA_MODEL_API_KEY";

/// Fallback credential environment variable (Hugging Face convention)
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";

/// Config file location override
pub const CONFIG_PATH_ENV: &str = "FDA_CONFIG";

pub const MODULE_NAME: &str = "fda-analyzer";

const DEFAULT_MODEL_ID: &str = "Qwen/Qwen2.5-72B-Instruct";
const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerToml {
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port (default 8000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory for temporary upload artifacts
    ///
    /// Default: `<system temp>/fda-uploads`. Relative paths are resolved
    /// against the working directory at startup.
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,

    #[serde(default)]
    pub default_query: Option<String>,

    #[serde(default)]
    pub limits: LimitsToml,

    #[serde(default)]
    pub model: ModelToml,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AnalyzerToml {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_dir: None,
            default_query: None,
            limits: LimitsToml::default(),
            model: ModelToml::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[limits]` table
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsToml {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,

    /// Bound on each stage's deferred result
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,

    /// Document characters included in each prompt
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for LimitsToml {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            chunk_bytes: default_chunk_bytes(),
            stage_timeout_secs: default_stage_timeout_secs(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

/// `[model]` table
#[derive(Debug, Clone, Deserialize)]
pub struct ModelToml {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ModelToml {
    fn default() -> Self {
        Self {
            api_key: None,
            model_id: default_model_id(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_chunk_bytes() -> usize {
    DEFAULT_CHUNK_BYTES
}

fn default_stage_timeout_secs() -> u64 {
    180
}

fn default_max_prompt_chars() -> usize {
    24_000
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

/// Provider credential; `Debug` never reveals the value
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential(String);

impl ProviderCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderCredential(<redacted>)")
    }
}

/// Resolved provider settings
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub credential: ProviderCredential,
    pub model_id: String,
    pub endpoint: String,
    pub request_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Command-line overrides
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved, immutable service configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub bind_addr: SocketAddr,
    /// Absolute artifact directory
    pub upload_dir: PathBuf,
    pub intake: IntakeLimits,
    pub stage_timeout: Duration,
    pub max_prompt_chars: usize,
    pub default_query: String,
    pub provider: ProviderSettings,
    pub logging: LoggingConfig,
}

impl AnalyzerConfig {
    /// Resolve the final configuration
    ///
    /// Fails with `Error::Config` on invalid values or a missing credential.
    pub fn resolve(toml: AnalyzerToml, overrides: CliOverrides) -> Result<Self> {
        let host = overrides.host.unwrap_or(toml.host);
        let port = overrides.port.unwrap_or(toml.port);
        let bind_addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address {}:{}: {}", host, port, e)))?;

        if toml.limits.max_upload_bytes == 0 {
            return Err(Error::Config("limits.max_upload_bytes must be > 0".to_string()));
        }
        if toml.limits.chunk_bytes == 0 {
            return Err(Error::Config("limits.chunk_bytes must be > 0".to_string()));
        }
        if toml.limits.stage_timeout_secs == 0 {
            return Err(Error::Config("limits.stage_timeout_secs must be > 0".to_string()));
        }

        let upload_dir = absolutize(
            &toml
                .upload_dir
                .unwrap_or_else(|| std::env::temp_dir().join("fda-uploads")),
        )?;

        let default_query = toml
            .default_query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string());

        let credential = resolve_provider_credential(toml.model.api_key.clone())?;

        Ok(Self {
            bind_addr,
            upload_dir,
            intake: IntakeLimits::new(toml.limits.max_upload_bytes, toml.limits.chunk_bytes),
            stage_timeout: Duration::from_secs(toml.limits.stage_timeout_secs),
            max_prompt_chars: toml.limits.max_prompt_chars,
            default_query,
            provider: ProviderSettings {
                credential,
                model_id: toml.model.model_id,
                endpoint: toml.model.endpoint,
                request_timeout: Duration::from_secs(toml.model.request_timeout_secs),
                max_tokens: toml.model.max_tokens,
                temperature: toml.model.temperature,
            },
            logging: toml.logging,
        })
    }

    /// Create the artifact directory if missing
    pub fn prepare_upload_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.upload_dir).map_err(|e| {
            Error::Config(format!(
                "Failed to create upload directory {}: {}",
                self.upload_dir.display(),
                e
            ))
        })
    }
}

/// Resolve the provider credential: `FDA_MODEL_API_KEY` → `HF_TOKEN` → TOML
pub fn resolve_provider_credential(toml_key: Option<String>) -> Result<ProviderCredential> {
    let resolved = resolve_tiered(
        "Model provider API key",
        vec![
            ("environment", env_value(API_KEY_ENV)),
            ("HF_TOKEN environment", env_value(HF_TOKEN_ENV)),
            ("TOML", toml_key),
        ],
    );

    match resolved {
        Some(setting) => {
            info!("Model provider API key loaded from {}", setting.source);
            Ok(ProviderCredential::new(setting.value))
        }
        None => Err(Error::Config(format!(
            "Model provider API key not configured. Please configure using one of:\n\
             1. Environment: {}=your-key-here\n\
             2. Environment: {}=your-key-here\n\
             3. TOML config: ~/.config/fda/{}.toml ([model] api_key = \"your-key\")",
            API_KEY_ENV, HF_TOKEN_ENV, MODULE_NAME
        ))),
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = ProviderCredential::new("hf_secret");
        assert!(!format!("{:?}", credential).contains("hf_secret"));
        assert_eq!(credential.expose(), "hf_secret");
    }

    #[test]
    fn test_toml_defaults() {
        let toml: AnalyzerToml = toml::from_str("").unwrap();
        assert_eq!(toml.port, 8000);
        assert_eq!(toml.limits.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(toml.limits.chunk_bytes, 1024 * 1024);
        assert_eq!(toml.model.model_id, "Qwen/Qwen2.5-72B-Instruct");
    }
}
