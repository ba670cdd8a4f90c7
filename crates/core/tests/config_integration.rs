//! Integration tests for quaywatch.toml loading.
//!
//! - quaywatch.toml.example parsing
//! - partial configs (single sections)
//! - env var precedence
//! - file loading errors

use std::io::Write;
use std::time::Duration;

use serial_test::serial;

use quaywatch_core::config::QuaywatchConfig;
use quaywatch_core::error::{ConfigError, QuaywatchError};

// =============================================================================
// quaywatch.toml.example
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../quaywatch.toml.example");
    let config = QuaywatchConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.server.port, 4444);
    assert_eq!(config.watch.docker_socket, "/var/run/docker.sock");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../quaywatch.toml.example");
    let config = QuaywatchConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_declares_both_targets() {
    let content = include_str!("../../../quaywatch.toml.example");
    let config = QuaywatchConfig::parse(content).expect("should parse");

    assert_eq!(config.targets.len(), 2);

    let web = &config.targets["web"];
    assert!(web.pattern.is_some());
    assert_eq!(web.max_wait(), Some(Duration::from_secs(120)));
    assert_eq!(
        web.since_duration("web").expect("since should parse"),
        Some(Duration::from_secs(300))
    );

    let db = &config.targets["db"];
    assert!(db.pattern.is_none());
    assert_eq!(db.patterns.len(), 2);
    assert_eq!(db.max_wait(), None);
}

// =============================================================================
// File loading
// =============================================================================

#[tokio::test]
async fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
[general]
log_level = "debug"

[targets.cache]
pattern = "Ready to accept commands"
"#
    )
    .expect("write config");

    let config = QuaywatchConfig::from_file(file.path())
        .await
        .expect("should load");
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.targets.len(), 1);
}

#[tokio::test]
async fn load_missing_file_is_not_found() {
    let result = QuaywatchConfig::from_file("/nonexistent/quaywatch.toml").await;
    assert!(matches!(
        result.unwrap_err(),
        QuaywatchError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn load_rejects_invalid_target_in_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
[targets.broken]
since = "whenever"
pattern = "ready"
"#
    )
    .expect("write config");

    let result = QuaywatchConfig::from_file(file.path()).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("targets.broken.since"));
}

// =============================================================================
// Env var precedence
// =============================================================================

#[test]
#[serial]
fn env_overrides_file_values() {
    let toml = r#"
[watch]
docker_socket = "/var/run/docker.sock"
startup_wait_ms = 60000
"#;
    let mut config = QuaywatchConfig::parse(toml).expect("should parse");

    // SAFETY: serialized test, no concurrent env access.
    unsafe {
        std::env::set_var("QUAYWATCH_WATCH_DOCKER_SOCKET", "/run/user/docker.sock");
        std::env::set_var("QUAYWATCH_WATCH_STARTUP_WAIT_MS", "15000");
    }
    config.apply_env_overrides();
    unsafe {
        std::env::remove_var("QUAYWATCH_WATCH_DOCKER_SOCKET");
        std::env::remove_var("QUAYWATCH_WATCH_STARTUP_WAIT_MS");
    }

    assert_eq!(config.watch.docker_socket, "/run/user/docker.sock");
    assert_eq!(config.watch.startup_wait_ms, 15_000);
}

#[test]
#[serial]
fn env_override_invalid_number_keeps_file_value() {
    let mut config = QuaywatchConfig::default();

    // SAFETY: serialized test, no concurrent env access.
    unsafe { std::env::set_var("QUAYWATCH_SERVER_PORT", "not-a-port") };
    config.apply_env_overrides();
    unsafe { std::env::remove_var("QUAYWATCH_SERVER_PORT") };

    assert_eq!(config.server.port, 4444);
}

#[test]
#[serial]
fn env_override_metrics_enabled() {
    let mut config = QuaywatchConfig::default();
    assert!(!config.metrics.enabled);

    // SAFETY: serialized test, no concurrent env access.
    unsafe { std::env::set_var("QUAYWATCH_METRICS_ENABLED", "true") };
    config.apply_env_overrides();
    unsafe { std::env::remove_var("QUAYWATCH_METRICS_ENABLED") };

    assert!(config.metrics.enabled);
}
