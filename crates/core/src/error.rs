//! Error types shared across quaywatch crates.
//!
//! [`QuaywatchError`] is the top-level error. Domain crates define their own
//! richer error enums and convert into it, so upper layers can propagate
//! everything with `?`.

/// Top-level quaywatch error.
#[derive(Debug, thiserror::Error)]
pub enum QuaywatchError {
    /// Configuration loading or validation failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A target monitor failed.
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// A module was driven through an invalid lifecycle transition.
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Module lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// `start` was called on a module that is already running.
    #[error("module already running")]
    AlreadyRunning,

    /// `stop` was called on a module that is not running.
    #[error("module not running")]
    NotRunning,
}

/// Configuration errors.
///
/// All of these indicate a bad configuration and are raised synchronously,
/// before any monitor task starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found at the expected path.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was probed.
        path: String,
    },

    /// Config file could not be parsed.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A config value is present but invalid (bad pattern, missing required
    /// pattern, unparsable duration filter, ...).
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Target monitoring errors.
///
/// Monitors convert these into a terminal errored status instead of
/// unwinding; they surface here only when reported synchronously (store
/// queries, watcher startup).
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Docker API call failed.
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// The target container was never observed running within the startup
    /// window. Terminal for the target, never retried.
    #[error("target '{target}' not observed running within {waited_ms}ms")]
    LocateTimeout {
        /// Target name.
        target: String,
        /// Length of the startup window that elapsed.
        waited_ms: u64,
    },

    /// The log stream could not be acquired or wired up.
    #[error("failed to acquire log stream for target '{target}': {reason}")]
    StreamAcquisition { target: String, reason: String },

    /// The line scanner reported a read failure on the underlying stream.
    #[error("log read failed for target '{target}': {reason}")]
    LineRead { target: String, reason: String },

    /// A queried target name has no registered status entry.
    #[error("target not registered: {0}")]
    UnknownTarget(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "targets.web.patterns".to_owned(),
            reason: "at least one pattern is required".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("targets.web.patterns"));
        assert!(msg.contains("at least one pattern"));
    }

    #[test]
    fn locate_timeout_display() {
        let err = MonitorError::LocateTimeout {
            target: "web".to_owned(),
            waited_ms: 60_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("web"));
        assert!(msg.contains("60000ms"));
    }

    #[test]
    fn config_error_converts_to_top_level() {
        let err: QuaywatchError = ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }
        .into();
        assert!(matches!(err, QuaywatchError::Config(_)));
    }

    #[test]
    fn monitor_error_converts_to_top_level() {
        let err: QuaywatchError = MonitorError::UnknownTarget("ghost".to_owned()).into();
        assert!(matches!(
            err,
            QuaywatchError::Monitor(MonitorError::UnknownTarget(_))
        ));
    }

    #[test]
    fn io_error_converts_to_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: QuaywatchError = io.into();
        assert!(err.to_string().contains("pipe closed"));
    }
}
