//! Configuration — `quaywatch.toml` parsing and runtime settings.
//!
//! [`QuaywatchConfig`] is the top-level structure for all sections.
//!
//! # Loading precedence
//! 1. CLI arguments (highest)
//! 2. Environment variables (`QUAYWATCH_WATCH_DOCKER_SOCKET=...` form)
//! 3. Config file (`quaywatch.toml`)
//! 4. Defaults (`Default` impls)
//!
//! The target table is read once at startup, before any monitor is
//! constructed, and never mutated afterwards.
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), quaywatch_core::error::QuaywatchError> {
//! use quaywatch_core::config::QuaywatchConfig;
//!
//! // Load from file + apply env overrides
//! let config = QuaywatchConfig::load("quaywatch.toml").await?;
//!
//! // Parse a TOML string directly
//! let config = QuaywatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, QuaywatchError};

/// Unified quaywatch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuaywatchConfig {
    /// General settings (logging).
    #[serde(default)]
    pub general: GeneralConfig,
    /// Status HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Container watching settings.
    #[serde(default)]
    pub watch: WatchConfig,
    /// Prometheus metrics exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Monitored targets, keyed by exact container name.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

impl QuaywatchConfig {
    /// Loads configuration from a TOML file and applies env overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, QuaywatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file (no env overrides).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, QuaywatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QuaywatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                QuaywatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, QuaywatchError> {
        toml::from_str(toml_str).map_err(|e| {
            QuaywatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies environment variable overrides.
    ///
    /// Naming scheme: `QUAYWATCH_{SECTION}_{FIELD}`, e.g.
    /// `QUAYWATCH_WATCH_DOCKER_SOCKET=/run/docker.sock`.
    /// Target definitions come from the config file only.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "QUAYWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "QUAYWATCH_GENERAL_LOG_FORMAT");

        override_string(&mut self.server.bind_addr, "QUAYWATCH_SERVER_BIND_ADDR");
        override_u16(&mut self.server.port, "QUAYWATCH_SERVER_PORT");

        override_string(&mut self.watch.docker_socket, "QUAYWATCH_WATCH_DOCKER_SOCKET");
        override_u64(
            &mut self.watch.startup_wait_ms,
            "QUAYWATCH_WATCH_STARTUP_WAIT_MS",
        );
        override_u64(
            &mut self.watch.poll_interval_ms,
            "QUAYWATCH_WATCH_POLL_INTERVAL_MS",
        );

        override_bool(&mut self.metrics.enabled, "QUAYWATCH_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "QUAYWATCH_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "QUAYWATCH_METRICS_PORT");
    }

    /// Validates configuration values.
    ///
    /// Target pattern *presence* is validated here; the expressions
    /// themselves are compiled (and rejected) when each monitor is built.
    pub fn validate(&self) -> Result<(), QuaywatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.watch.startup_wait_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watch.startup_wait_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watch.poll_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        for (name, target) in &self.targets {
            if target.pattern.is_none() && target.patterns.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("targets.{name}"),
                    reason: "at least one readiness pattern is required".to_owned(),
                }
                .into());
            }
            if let Some(max_wait) = target.max_wait_ms
                && max_wait == 0
            {
                return Err(ConfigError::InvalidValue {
                    field: format!("targets.{name}.max_wait_ms"),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
            // Rejects unparsable `since` filters up front.
            target.since_duration(name)?;
        }

        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Status HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the status endpoint.
    pub bind_addr: String,
    /// Port for the status endpoint.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_owned(),
            port: 4444,
        }
    }
}

/// Container watching settings, shared by all targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Docker socket path.
    pub docker_socket: String,
    /// Startup window per target: how long to wait for the container to be
    /// observed running. Also the default readiness window when a target
    /// declares no `max_wait_ms`.
    pub startup_wait_ms: u64,
    /// Interval between container-list polls during the startup window.
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            docker_socket: "/var/run/docker.sock".to_owned(),
            startup_wait_ms: 60_000,
            poll_interval_ms: 3_000,
        }
    }
}

impl WatchConfig {
    /// Startup window as a [`Duration`].
    pub fn startup_wait(&self) -> Duration {
        Duration::from_millis(self.startup_wait_ms)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Prometheus metrics exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to expose the Prometheus scrape endpoint.
    pub enabled: bool,
    /// Listen address for the scrape endpoint.
    pub listen_addr: String,
    /// Port for the scrape endpoint.
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
        }
    }
}

/// Per-target monitoring settings.
///
/// The key of the `[targets.<name>]` table is the exact container name the
/// monitor looks for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Primary readiness pattern. Appended after `patterns` to form the
    /// ordered set.
    pub pattern: Option<String>,
    /// Auxiliary readiness patterns, evaluated in order.
    pub patterns: Vec<String>,
    /// Per-target readiness window override. Only affects the readiness
    /// deadline; the startup window always uses the global default.
    pub max_wait_ms: Option<u64>,
    /// Only consider log output newer than now minus this duration
    /// (e.g. "30s", "5m"). Absent means the full available history.
    pub since: Option<String>,
}

impl TargetConfig {
    /// Parses the `since` filter into a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming `targets.<name>.since`
    /// when the filter is present but unparsable.
    pub fn since_duration(&self, name: &str) -> Result<Option<Duration>, ConfigError> {
        match &self.since {
            None => Ok(None),
            Some(raw) => parse_duration(raw)
                .map(Some)
                .map_err(|reason| ConfigError::InvalidValue {
                    field: format!("targets.{name}.since"),
                    reason,
                }),
        }
    }

    /// Readiness window override as a [`Duration`], if declared.
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

/// Parses a duration string with an `ms`/`s`/`m`/`h` suffix.
///
/// A bare number is read as seconds.
fn parse_duration(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty duration".to_owned());
    }

    let (digits, multiplier_ms) = if let Some(rest) = trimmed.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = trimmed.strip_suffix('s') {
        (rest, 1_000)
    } else if let Some(rest) = trimmed.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = trimmed.strip_suffix('h') {
        (rest, 3_600_000)
    } else {
        (trimmed, 1_000)
    };

    let value: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("unparsable duration '{input}' (expected e.g. \"30s\", \"5m\")"))?;

    value
        .checked_mul(multiplier_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{input}' overflows"))
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}
