//! Module lifecycle trait.
//!
//! Long-running modules implement [`Lifecycle`] so the daemon can manage
//! them uniformly: start after construction, stop on shutdown, and report
//! health on demand.

use std::future::Future;

use serde::Serialize;

use crate::error::QuaywatchError;

/// Health of a running module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    /// Operating normally.
    Healthy,
    /// Operating with reduced capability.
    Degraded(String),
    /// Not operating.
    Unhealthy(String),
}

impl HealthStatus {
    /// Returns true for [`HealthStatus::Healthy`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Returns true for [`HealthStatus::Unhealthy`].
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

/// Lifecycle contract implemented by daemon-managed modules.
///
/// `start` spawns the module's background tasks, `stop` performs a graceful
/// shutdown and waits for those tasks to finish, `health_check` reports
/// current health without side effects.
pub trait Lifecycle {
    /// Starts the module.
    ///
    /// # Errors
    ///
    /// Returns an error if the module is already running or failed to spawn
    /// its tasks.
    fn start(&mut self) -> impl Future<Output = Result<(), QuaywatchError>> + Send;

    /// Stops the module and waits for its tasks to acknowledge shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the module is not running.
    fn stop(&mut self) -> impl Future<Output = Result<(), QuaywatchError>> + Send;

    /// Reports the module's current health.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Healthy.is_unhealthy());
    }

    #[test]
    fn degraded_is_neither_healthy_nor_unhealthy() {
        let status = HealthStatus::Degraded("docker daemon not reachable".to_owned());
        assert!(!status.is_healthy());
        assert!(!status.is_unhealthy());
    }

    #[test]
    fn unhealthy_predicates() {
        let status = HealthStatus::Unhealthy("stopped".to_owned());
        assert!(status.is_unhealthy());
    }

    #[test]
    fn health_status_serializes_with_reason() {
        let json = serde_json::to_string(&HealthStatus::Degraded("no docker".to_owned())).unwrap();
        assert!(json.contains("degraded"));
        assert!(json.contains("no docker"));
    }
}
