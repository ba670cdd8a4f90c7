//! Watcher orchestration — builds and runs one tailer per target.
//!
//! [`Watcher`] implements the core [`Lifecycle`] trait so the daemon can
//! manage it like any other module. The builder constructs every tailer
//! (compiling patterns and registering pending status entries) before
//! `start()` spawns a single task per target, so the status store is fully
//! populated before any reader or monitor task can race it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use quaywatch_core::config::{TargetConfig, WatchConfig};
use quaywatch_core::error::{LifecycleError, QuaywatchError};
use quaywatch_core::lifecycle::{HealthStatus, Lifecycle};

use crate::docker::DockerClient;
use crate::error::WatchError;
use crate::publisher::Publisher;
use crate::tailer::Tailer;

/// Watcher execution state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WatcherState {
    /// Built, not yet started.
    Initialized,
    /// Monitor tasks running.
    Running,
    /// Stopped after a graceful shutdown.
    Stopped,
}

/// Runs the readiness monitors for all configured targets.
///
/// # Usage
/// ```ignore
/// use quaywatch_watcher::{BollardDockerClient, WatcherBuilder};
///
/// let mut watcher = WatcherBuilder::new()
///     .docker_client(docker)
///     .watch_config(config.watch.clone())
///     .targets(config.targets.clone())
///     .build()
///     .await?;
///
/// watcher.start().await?;
/// // ... serve status queries from watcher.publisher() ...
/// watcher.stop().await?;
/// ```
#[derive(Debug)]
pub struct Watcher<D: DockerClient> {
    state: WatcherState,
    docker: Arc<D>,
    publisher: Arc<Publisher>,
    cancel: CancellationToken,
    tailers: Vec<Tailer<D>>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    target_count: usize,
}

impl<D: DockerClient> Watcher<D> {
    /// Current state name, for logs and tests.
    pub fn state_name(&self) -> &str {
        match self.state {
            WatcherState::Initialized => "initialized",
            WatcherState::Running => "running",
            WatcherState::Stopped => "stopped",
        }
    }

    /// Number of configured targets.
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Shared handle to the status store.
    pub fn publisher(&self) -> Arc<Publisher> {
        Arc::clone(&self.publisher)
    }

    /// The process-wide cancellation token observed by every monitor.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<D: DockerClient> Lifecycle for Watcher<D> {
    async fn start(&mut self) -> Result<(), QuaywatchError> {
        if self.state == WatcherState::Running {
            return Err(LifecycleError::AlreadyRunning.into());
        }

        info!(targets = self.target_count, "starting watcher");

        if self.docker.ping().await.is_err() {
            warn!("docker daemon not reachable, monitors will keep polling within their startup windows");
        }

        // Every tailer was built (and its entry registered) before this
        // point; spawning is the only thing left.
        for tailer in self.tailers.drain(..) {
            let name = tailer.name().to_owned();
            self.tasks.push(tokio::spawn(async move {
                tailer.run().await;
                debug!(target = name.as_str(), "tailer task finished");
            }));
        }

        self.state = WatcherState::Running;
        info!("watcher started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), QuaywatchError> {
        if self.state != WatcherState::Running {
            return Err(LifecycleError::NotRunning.into());
        }

        info!("stopping watcher");
        self.cancel.cancel();

        // Every monitor observes the token at its suspension points; wait
        // for each to acknowledge before reporting the stop complete.
        for task in self.tasks.drain(..) {
            if task.await.is_err() {
                warn!("tailer task panicked during shutdown");
            }
        }

        self.state = WatcherState::Stopped;
        info!("watcher stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            WatcherState::Running => {
                if self.docker.ping().await.is_ok() {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded("docker daemon not reachable".to_owned())
                }
            }
            WatcherState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            WatcherState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// Builds a [`Watcher`] and its tailers.
pub struct WatcherBuilder<D: DockerClient> {
    watch: WatchConfig,
    targets: BTreeMap<String, TargetConfig>,
    docker: Option<Arc<D>>,
    publisher: Option<Arc<Publisher>>,
    cancel: Option<CancellationToken>,
}

impl<D: DockerClient> WatcherBuilder<D> {
    /// Creates a builder with default watch settings and no targets.
    pub fn new() -> Self {
        Self {
            watch: WatchConfig::default(),
            targets: BTreeMap::new(),
            docker: None,
            publisher: None,
            cancel: None,
        }
    }

    /// Sets the shared watch settings.
    pub fn watch_config(mut self, watch: WatchConfig) -> Self {
        self.watch = watch;
        self
    }

    /// Sets the target table.
    pub fn targets(mut self, targets: BTreeMap<String, TargetConfig>) -> Self {
        self.targets = targets;
        self
    }

    /// Sets the docker client (required).
    pub fn docker_client(mut self, docker: Arc<D>) -> Self {
        self.docker = Some(docker);
        self
    }

    /// Sets an external status store. A fresh one is created otherwise.
    pub fn publisher(mut self, publisher: Arc<Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Sets an external cancellation token, typically wired to the
    /// process shutdown signal. A fresh one is created otherwise.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Builds the watcher, constructing every tailer up front.
    ///
    /// Any invalid target (bad pattern, no patterns, unparsable `since`)
    /// fails the whole build: a misconfigured process must not start.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Config`] when no docker client was provided,
    /// or the first tailer construction error.
    pub async fn build(self) -> Result<Watcher<D>, WatchError> {
        let docker = self.docker.ok_or_else(|| WatchError::Config {
            field: "docker_client".to_owned(),
            reason: "docker client must be provided".to_owned(),
        })?;
        let publisher = self.publisher.unwrap_or_else(|| Arc::new(Publisher::new()));
        let cancel = self.cancel.unwrap_or_default();

        if self.targets.is_empty() {
            warn!("no targets configured, status endpoint will report an empty set");
        }

        let mut tailers = Vec::with_capacity(self.targets.len());
        for (name, target) in &self.targets {
            let tailer = Tailer::new(
                Arc::clone(&docker),
                Arc::clone(&publisher),
                name,
                target,
                &self.watch,
                cancel.clone(),
            )
            .await?;
            tailers.push(tailer);
        }

        let target_count = tailers.len();
        Ok(Watcher {
            state: WatcherState::Initialized,
            docker,
            publisher,
            cancel,
            tailers,
            tasks: Vec::new(),
            target_count,
        })
    }
}

impl<D: DockerClient> Default for WatcherBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}
