//! Target monitor — the per-target readiness state machine.
//!
//! One [`Tailer`] owns the full lifecycle for a single target: locate the
//! running container within the startup window, bridge its log stream into
//! a line scanner, evaluate each line against the target's pattern set,
//! publish exactly one terminal status, and release the bridge on every
//! exit path.
//!
//! # Deadlines
//!
//! Two independent windows apply in sequence. The *startup* window bounds
//! how long the container may take to appear in the runtime's running list;
//! expiry is a hard failure. The *readiness* window starts once the
//! container is located and bounds how long the log may take to show a
//! readiness marker; expiry publishes ready anyway (fail-open), because a
//! target that is slow to log its marker should not hold dependent
//! orchestration not-ready forever. Cancellation aborts either phase
//! without publishing.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use quaywatch_core::config::{TargetConfig, WatchConfig};
use quaywatch_core::error::ConfigError;
use quaywatch_core::metrics::{
    LABEL_TARGET, LINES_SCANNED_TOTAL, READY_TIMEOUTS_TOTAL, TARGETS_ERRORED_TOTAL,
    TARGETS_READY_TOTAL,
};

use crate::docker::DockerClient;
use crate::error::WatchError;
use crate::pattern::PatternSet;
use crate::publisher::{Publisher, Status};
use crate::scan::LineScanner;

/// Outcome of the line evaluation loop.
enum Verdict {
    /// A pattern matched; index identifies the credited pattern.
    Matched(usize),
    /// A carried or read error ended the scan.
    Failed(WatchError),
    /// The readiness window elapsed without a match.
    DeadlineReady,
    /// The stream ended while the target was still undecided.
    StreamEnded,
    /// Process-wide shutdown.
    Cancelled,
}

/// Monitors one target container for its readiness marker.
#[derive(Debug)]
pub struct Tailer<D: DockerClient> {
    name: String,
    docker: Arc<D>,
    publisher: Arc<Publisher>,
    patterns: PatternSet,
    startup_wait: Duration,
    ready_wait: Duration,
    poll_interval: Duration,
    since: Option<Duration>,
    cancel: CancellationToken,
}

impl<D: DockerClient> Tailer<D> {
    /// Builds a tailer for `name` and registers its pending status entry.
    ///
    /// Patterns are compiled here, and the entry is registered before this
    /// function returns, so a reader can never observe the target as
    /// unknown once construction succeeded. Fails fast on an empty or
    /// invalid pattern set and on an unparsable `since` filter.
    pub async fn new(
        docker: Arc<D>,
        publisher: Arc<Publisher>,
        name: &str,
        target: &TargetConfig,
        watch: &WatchConfig,
        cancel: CancellationToken,
    ) -> Result<Self, WatchError> {
        let patterns = PatternSet::compile(name, target.pattern.as_deref(), &target.patterns)?;

        let since = match target.since_duration(name) {
            Ok(parsed) => parsed,
            Err(ConfigError::InvalidValue { field, reason }) => {
                return Err(WatchError::Config { field, reason });
            }
            Err(other) => {
                return Err(WatchError::Config {
                    field: format!("targets.{name}.since"),
                    reason: other.to_string(),
                });
            }
        };

        let startup_wait = watch.startup_wait();
        let ready_wait = target.max_wait().unwrap_or(startup_wait);

        publisher.register(name).await;

        Ok(Self {
            name: name.to_owned(),
            docker,
            publisher,
            patterns,
            startup_wait,
            ready_wait,
            poll_interval: watch.poll_interval(),
            since,
            cancel,
        })
    }

    /// Target name this tailer monitors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The startup window.
    pub fn startup_wait(&self) -> Duration {
        self.startup_wait
    }

    /// The readiness window (per-target override, else the startup window).
    pub fn ready_wait(&self) -> Duration {
        self.ready_wait
    }

    /// Number of compiled readiness patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Runs the tailer to completion. Spawn one task per target.
    ///
    /// Publishes at most one terminal status; cancellation publishes
    /// nothing and leaves the registered entry as-is.
    pub async fn run(self) {
        debug!(target = self.name.as_str(), "tailer starting");

        let container_id = match self.locate().await {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!(
                    target = self.name.as_str(),
                    "tailer cancelled while locating container"
                );
                return;
            }
            Err(err) => {
                self.fail(err).await;
                return;
            }
        };

        info!(
            target = self.name.as_str(),
            container_id = container_id.as_str(),
            "container located, following logs"
        );

        let stream = match self.docker.open_log_stream(&container_id, self.since).await {
            Ok(stream) => stream,
            Err(err) => {
                self.fail(WatchError::StreamAcquisition {
                    target: self.name.clone(),
                    reason: err.to_string(),
                })
                .await;
                return;
            }
        };

        let mut scanner = LineScanner::spawn(&self.name, stream);
        let verdict = self.scan(&mut scanner).await;

        // Bridge teardown happens on every exit path, before the terminal
        // status is published.
        scanner.stop().await;

        match verdict {
            Verdict::Matched(idx) => {
                info!(
                    target = self.name.as_str(),
                    pattern = self.patterns.source(idx).unwrap_or_default(),
                    "readiness pattern matched"
                );
                counter!(TARGETS_READY_TOTAL, LABEL_TARGET => self.name.clone()).increment(1);
                self.publisher.publish(&self.name, Status::ready_now()).await;
            }
            Verdict::DeadlineReady => {
                // Fail-open policy: an absent container is an unambiguous
                // failure, but a missing log marker after a bounded wait is
                // ambiguous and resolved optimistically.
                warn!(
                    target = self.name.as_str(),
                    waited_ms = u64::try_from(self.ready_wait.as_millis()).unwrap_or(u64::MAX),
                    "readiness window elapsed without a match, presuming ready"
                );
                counter!(READY_TIMEOUTS_TOTAL, LABEL_TARGET => self.name.clone()).increment(1);
                counter!(TARGETS_READY_TOTAL, LABEL_TARGET => self.name.clone()).increment(1);
                self.publisher.publish(&self.name, Status::ready_now()).await;
            }
            Verdict::Failed(err) => self.fail(err).await,
            Verdict::StreamEnded => {
                warn!(
                    target = self.name.as_str(),
                    "log stream ended before readiness was decided"
                );
            }
            Verdict::Cancelled => {
                info!(target = self.name.as_str(), "tailer cancelled");
            }
        }
    }

    /// Polls the running-container list until the target appears, the
    /// startup window expires, or shutdown is requested.
    ///
    /// Returns `Ok(None)` on cancellation.
    async fn locate(&self) -> Result<Option<String>, WatchError> {
        let deadline = Instant::now() + self.startup_wait;
        let mut poll = time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    match self.docker.list_running().await {
                        Ok(running) => {
                            if let Some(container) =
                                running.into_iter().find(|c| c.name == self.name)
                            {
                                return Ok(Some(container.id));
                            }
                            debug!(target = self.name.as_str(), "container not running yet");
                        }
                        Err(err) => {
                            // Transient daemon hiccups retry on the next
                            // tick; the startup deadline still bounds the
                            // total wait.
                            warn!(
                                target = self.name.as_str(),
                                error = %err,
                                "container list poll failed"
                            );
                        }
                    }
                }
                _ = time::sleep_until(deadline) => {
                    return Err(WatchError::LocateTimeout {
                        target: self.name.clone(),
                        waited_ms: u64::try_from(self.startup_wait.as_millis())
                            .unwrap_or(u64::MAX),
                    });
                }
                _ = self.cancel.cancelled() => return Ok(None),
            }
        }
    }

    /// Evaluates lines until a pattern matches, an error is carried, the
    /// readiness window expires, the stream ends, or shutdown is requested.
    async fn scan(&self, scanner: &mut LineScanner) -> Verdict {
        // The readiness window starts only after the container was located.
        let deadline = Instant::now() + self.ready_wait;

        loop {
            tokio::select! {
                item = scanner.next_line() => match item {
                    Some(Ok(line)) => {
                        counter!(LINES_SCANNED_TOTAL).increment(1);
                        if let Some(idx) = self.patterns.first_match(&line) {
                            return Verdict::Matched(idx);
                        }
                    }
                    Some(Err(err)) => return Verdict::Failed(err),
                    None => return Verdict::StreamEnded,
                },
                _ = time::sleep_until(deadline) => return Verdict::DeadlineReady,
                _ = self.cancel.cancelled() => return Verdict::Cancelled,
            }
        }
    }

    /// Publishes a terminal errored status.
    async fn fail(&self, err: WatchError) {
        error!(
            target = self.name.as_str(),
            error = %err,
            "target monitoring failed"
        );
        counter!(TARGETS_ERRORED_TOTAL, LABEL_TARGET => self.name.clone()).increment(1);
        self.publisher
            .publish(&self.name, Status::errored(err.to_string()))
            .await;
    }
}
