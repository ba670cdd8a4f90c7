//! Watcher error types.
//!
//! [`WatchError`] covers everything that can go wrong inside the watcher
//! crate. `From<WatchError> for QuaywatchError` is implemented so upper
//! layers can propagate with `?`.

use quaywatch_core::error::{ConfigError, MonitorError, QuaywatchError};

/// Watcher domain error.
///
/// Construction-time errors (`PatternInvalid`, `NoPatterns`, `Config`) are
/// fatal before any task starts; runtime errors are converted by the tailer
/// into a terminal errored status and never unwind past its task.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Docker API call failed.
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker socket connection failed.
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// A readiness pattern failed to compile.
    #[error("invalid readiness pattern /{pattern}/ for target '{target}': {reason}")]
    PatternInvalid {
        /// Target the pattern belongs to.
        target: String,
        /// The offending expression.
        pattern: String,
        /// Compile failure reason.
        reason: String,
    },

    /// A target declares no readiness patterns at all.
    #[error("target '{target}' declares no readiness patterns")]
    NoPatterns {
        /// Target name.
        target: String,
    },

    /// The target container was never observed running within the startup
    /// window.
    #[error("target '{target}' not observed running within {waited_ms}ms")]
    LocateTimeout {
        /// Target name.
        target: String,
        /// Startup window length.
        waited_ms: u64,
    },

    /// The log stream could not be acquired or wired up.
    #[error("failed to open log stream for target '{target}': {reason}")]
    StreamAcquisition {
        /// Target name.
        target: String,
        /// Acquisition failure reason.
        reason: String,
    },

    /// The line scanner reported a read failure on the underlying stream.
    #[error("log line read failed for target '{target}': {reason}")]
    LineRead {
        /// Target name.
        target: String,
        /// Read failure reason.
        reason: String,
    },

    /// A queried target name has no registered status entry.
    #[error("requested target is not registered: {0}")]
    UnknownTarget(String),

    /// Watcher construction error.
    #[error("config error: {field}: {reason}")]
    Config {
        /// Config field name.
        field: String,
        /// Error reason.
        reason: String,
    },
}

impl From<WatchError> for QuaywatchError {
    fn from(err: WatchError) -> Self {
        match &err {
            WatchError::DockerApi(msg) | WatchError::DockerConnection(msg) => {
                QuaywatchError::Monitor(MonitorError::DockerApi(msg.clone()))
            }
            WatchError::PatternInvalid { target, .. } => {
                QuaywatchError::Config(ConfigError::InvalidValue {
                    field: format!("targets.{target}"),
                    reason: err.to_string(),
                })
            }
            WatchError::NoPatterns { target } => QuaywatchError::Config(ConfigError::InvalidValue {
                field: format!("targets.{target}"),
                reason: "at least one readiness pattern is required".to_owned(),
            }),
            WatchError::LocateTimeout { target, waited_ms } => {
                QuaywatchError::Monitor(MonitorError::LocateTimeout {
                    target: target.clone(),
                    waited_ms: *waited_ms,
                })
            }
            WatchError::StreamAcquisition { target, reason } => {
                QuaywatchError::Monitor(MonitorError::StreamAcquisition {
                    target: target.clone(),
                    reason: reason.clone(),
                })
            }
            WatchError::LineRead { target, reason } => {
                QuaywatchError::Monitor(MonitorError::LineRead {
                    target: target.clone(),
                    reason: reason.clone(),
                })
            }
            WatchError::UnknownTarget(name) => {
                QuaywatchError::Monitor(MonitorError::UnknownTarget(name.clone()))
            }
            WatchError::Config { field, reason } => {
                QuaywatchError::Config(ConfigError::InvalidValue {
                    field: field.clone(),
                    reason: reason.clone(),
                })
            }
        }
    }
}
