//! Configuration resolution tests
//!
//! Tests that touch process environment variables are serialized.

use fda_analyzer::config::{
    resolve_provider_credential, AnalyzerConfig, AnalyzerToml, CliOverrides, API_KEY_ENV,
    HF_TOKEN_ENV,
};
use fda_analyzer::models::analysis::DEFAULT_QUERY;
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;

/// Clears both credential variables for the duration of a test
struct EnvGuard;

impl EnvGuard {
    fn new() -> Self {
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(HF_TOKEN_ENV);
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(HF_TOKEN_ENV);
    }
}

fn toml_with_key(key: Option<&str>) -> AnalyzerToml {
    let mut toml = AnalyzerToml::default();
    toml.model.api_key = key.map(str::to_string);
    toml
}

#[test]
#[serial]
fn test_primary_env_takes_priority() {
    let _guard = EnvGuard::new();
    std::env::set_var(API_KEY_ENV, "primary-key");
    std::env::set_var(HF_TOKEN_ENV, "hf-key");

    let credential = resolve_provider_credential(Some("toml-key".to_string())).unwrap();
    assert_eq!(credential.expose(), "primary-key");
}

#[test]
#[serial]
fn test_hf_token_fallback() {
    let _guard = EnvGuard::new();
    std::env::set_var(HF_TOKEN_ENV, "hf-key");

    let credential = resolve_provider_credential(Some("toml-key".to_string())).unwrap();
    assert_eq!(credential.expose(), "hf-key");
}

#[test]
#[serial]
fn test_toml_key_used_when_env_blank() {
    let _guard = EnvGuard::new();
    std::env::set_var(API_KEY_ENV, "   ");

    let credential = resolve_provider_credential(Some(" toml-key ".to_string())).unwrap();
    assert_eq!(credential.expose(), "toml-key");
}

#[test]
#[serial]
fn test_missing_credential_is_config_error() {
    let _guard = EnvGuard::new();

    let err = AnalyzerConfig::resolve(toml_with_key(None), CliOverrides::default()).unwrap_err();
    assert!(matches!(err, fda_common::Error::Config(_)));
    assert!(err.to_string().contains(API_KEY_ENV));
}

#[test]
#[serial]
fn test_resolved_defaults() {
    let _guard = EnvGuard::new();

    let config = AnalyzerConfig::resolve(toml_with_key(Some("k")), CliOverrides::default()).unwrap();
    assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8000");
    assert_eq!(config.intake.max_bytes, 10 * 1024 * 1024);
    assert_eq!(config.intake.chunk_bytes, 1024 * 1024);
    assert_eq!(config.stage_timeout, Duration::from_secs(180));
    assert_eq!(config.default_query, DEFAULT_QUERY);
    assert!(config.upload_dir.is_absolute());
    assert!(!format!("{:?}", config).contains("\"k\""));
}

#[test]
#[serial]
fn test_cli_overrides_and_relative_upload_dir() {
    let _guard = EnvGuard::new();

    let mut toml = toml_with_key(Some("k"));
    toml.upload_dir = Some(PathBuf::from("uploads"));
    toml.default_query = Some("   ".to_string());

    let config = AnalyzerConfig::resolve(
        toml,
        CliOverrides {
            host: Some("127.0.0.1".to_string()),
            port: Some(9123),
        },
    )
    .unwrap();

    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9123");
    assert!(config.upload_dir.is_absolute());
    assert!(config.upload_dir.ends_with("uploads"));
    assert_eq!(config.default_query, DEFAULT_QUERY);
}

#[test]
#[serial]
fn test_zero_limits_rejected() {
    let _guard = EnvGuard::new();

    let mut toml = toml_with_key(Some("k"));
    toml.limits.max_upload_bytes = 0;
    assert!(AnalyzerConfig::resolve(toml, CliOverrides::default()).is_err());

    let mut toml = toml_with_key(Some("k"));
    toml.limits.stage_timeout_secs = 0;
    assert!(AnalyzerConfig::resolve(toml, CliOverrides::default()).is_err());
}

#[test]
fn test_toml_sections_parse() {
    let toml: AnalyzerToml = toml::from_str(
        r#"
        port = 9000
        upload_dir = "/var/tmp/fda"

        [limits]
        max_upload_bytes = 2048
        stage_timeout_secs = 30

        [model]
        model_id = "meta-llama/Llama-3.1-8B-Instruct"
        "#,
    )
    .unwrap();

    assert_eq!(toml.port, 9000);
    assert_eq!(toml.upload_dir, Some(PathBuf::from("/var/tmp/fda")));
    assert_eq!(toml.limits.max_upload_bytes, 2048);
    assert_eq!(toml.limits.chunk_bytes, 1024 * 1024);
    assert_eq!(toml.model.model_id, "meta-llama/Llama-3.1-8B-Instruct");
    assert_eq!(toml.host, "0.0.0.0");
}
