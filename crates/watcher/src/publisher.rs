//! Status store — publishes per-target readiness for concurrent readers.
//!
//! The [`Publisher`] owns the only state shared across monitors: a map from
//! target name to its latest [`Status`]. Monitors submit values and never
//! read them back; the HTTP endpoint takes snapshots on demand.
//!
//! # Aggregation rule
//!
//! - any entry errored -> [`Aggregate::Unavailable`]
//! - else any entry not ready -> [`Aggregate::Pending`]
//! - else -> [`Aggregate::Ok`]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use metrics::gauge;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use quaywatch_core::metrics::TARGETS_PENDING;

use crate::error::WatchError;

/// Readiness status of one target.
///
/// Exactly one of pending / ready / errored holds at any time:
/// pending = all fields empty, ready = `ready` with `at` set, errored =
/// `error` set (`ready` forced false). Ready and errored are terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Whether the target is considered ready.
    pub ready: bool,
    /// When the terminal state was reached (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
    /// Failure description for an errored target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Status {
    /// The initial registered-but-undecided state.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Ready at the given instant.
    pub fn ready_at(at: DateTime<Utc>) -> Self {
        Self {
            ready: true,
            at: Some(at),
            error: None,
        }
    }

    /// Ready as of now.
    pub fn ready_now() -> Self {
        Self::ready_at(Utc::now())
    }

    /// Errored with the given description. Forces `ready` to false.
    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            ready: false,
            at: Some(Utc::now()),
            error: Some(message.into()),
        }
    }

    /// True while neither ready nor errored.
    pub fn is_pending(&self) -> bool {
        !self.ready && self.error.is_none()
    }

    /// True when a failure was published.
    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }
}

/// Composite readiness over a set of targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    /// All targets ready, none errored.
    Ok,
    /// No errors, but at least one target still pending.
    Pending,
    /// At least one target errored.
    Unavailable,
}

impl Aggregate {
    /// Pure reduction over a set of statuses: error presence dominates,
    /// then readiness. Order-independent; an empty set is `Ok`.
    pub fn over<'a>(statuses: impl IntoIterator<Item = &'a Status>) -> Self {
        let mut all_ready = true;
        for status in statuses {
            if status.is_errored() {
                return Aggregate::Unavailable;
            }
            if !status.ready {
                all_ready = false;
            }
        }
        if all_ready {
            Aggregate::Ok
        } else {
            Aggregate::Pending
        }
    }
}

/// Snapshot of the store: the selected targets plus their composite status.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Composite status over `targets`.
    pub aggregate: Aggregate,
    /// Per-target statuses.
    pub targets: BTreeMap<String, Status>,
}

/// Concurrent status store.
///
/// Reads take a shared lock, writes an exclusive lock. No I/O happens while
/// a lock is held, and snapshots copy out so readers never hold references
/// into the map.
#[derive(Debug, Default)]
pub struct Publisher {
    state: RwLock<BTreeMap<String, Status>>,
}

impl Publisher {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pending entry for `name` if absent.
    ///
    /// Idempotent: an entry that already exists is left untouched, so a
    /// repeated registration never overwrites a published terminal status.
    /// Called once per target before its monitor task starts.
    pub async fn register(&self, name: &str) {
        let mut state = self.state.write().await;
        if !state.contains_key(name) {
            state.insert(name.to_owned(), Status::pending());
            gauge!(TARGETS_PENDING).increment(1.0);
            debug!(target = name, "registered pending status entry");
        }
    }

    /// Replaces the entry for `name` unconditionally (last write wins).
    ///
    /// The store enforces no ordering discipline; monitors are expected to
    /// publish at most one terminal status after registration.
    pub async fn publish(&self, name: &str, status: Status) {
        let mut state = self.state.write().await;
        let previous = state.insert(name.to_owned(), status);
        if previous.is_some_and(|p| p.is_pending()) {
            gauge!(TARGETS_PENDING).decrement(1.0);
        }
    }

    /// Snapshot of every registered target plus its aggregate status.
    pub async fn snapshot_all(&self) -> StatusReport {
        let state = self.state.read().await;
        let targets: BTreeMap<String, Status> =
            state.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        StatusReport {
            aggregate: Aggregate::over(targets.values()),
            targets,
        }
    }

    /// Snapshot restricted to `names`.
    ///
    /// All-or-nothing: if any requested name has no entry the whole query
    /// fails with [`WatchError::UnknownTarget`] and nothing is returned.
    pub async fn snapshot_subset(&self, names: &[String]) -> Result<StatusReport, WatchError> {
        let state = self.state.read().await;
        let mut targets = BTreeMap::new();
        for name in names {
            let status = state
                .get(name)
                .ok_or_else(|| WatchError::UnknownTarget(name.clone()))?;
            targets.insert(name.clone(), status.clone());
        }
        Ok(StatusReport {
            aggregate: Aggregate::over(targets.values()),
            targets,
        })
    }

    /// Number of registered targets.
    pub async fn registered_count(&self) -> usize {
        self.state.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_states_are_mutually_exclusive() {
        let pending = Status::pending();
        assert!(pending.is_pending());
        assert!(!pending.is_errored());
        assert!(pending.at.is_none());

        let ready = Status::ready_now();
        assert!(!ready.is_pending());
        assert!(!ready.is_errored());
        assert!(ready.at.is_some());

        let errored = Status::errored("boom");
        assert!(!errored.is_pending());
        assert!(errored.is_errored());
        assert!(!errored.ready);
    }

    #[test]
    fn pending_serializes_without_optional_fields() {
        let json = serde_json::to_string(&Status::pending()).unwrap();
        assert_eq!(json, r#"{"ready":false}"#);
    }

    #[test]
    fn ready_serializes_with_timestamp() {
        let json = serde_json::to_string(&Status::ready_now()).unwrap();
        assert!(json.contains(r#""ready":true"#));
        assert!(json.contains(r#""at":"#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn aggregate_all_ready_is_ok() {
        let statuses = [Status::ready_now()];
        assert_eq!(Aggregate::over(statuses.iter()), Aggregate::Ok);
    }

    #[test]
    fn aggregate_with_pending_is_pending() {
        let statuses = [Status::ready_now(), Status::pending()];
        assert_eq!(Aggregate::over(statuses.iter()), Aggregate::Pending);
    }

    #[test]
    fn aggregate_with_error_is_unavailable() {
        // Error dominates even when every other target is ready.
        let statuses = [Status::ready_now(), Status::errored("ouch")];
        assert_eq!(Aggregate::over(statuses.iter()), Aggregate::Unavailable);
    }

    #[test]
    fn aggregate_over_empty_set_is_ok() {
        let empty: Vec<Status> = Vec::new();
        assert_eq!(Aggregate::over(empty.iter()), Aggregate::Ok);
    }

    #[tokio::test]
    async fn register_then_snapshot_all_is_pending() {
        let publisher = Publisher::new();
        publisher.register("foo").await;

        let report = publisher.snapshot_all().await;
        assert_eq!(report.aggregate, Aggregate::Pending);
        assert!(report.targets["foo"].is_pending());
    }

    #[tokio::test]
    async fn publish_replaces_entry() {
        let publisher = Publisher::new();
        publisher.register("foo").await;
        publisher.publish("foo", Status::ready_now()).await;

        let report = publisher.snapshot_all().await;
        assert_eq!(report.aggregate, Aggregate::Ok);
        assert!(report.targets["foo"].ready);
    }

    #[tokio::test]
    async fn register_is_idempotent_and_preserves_terminal_status() {
        let publisher = Publisher::new();
        publisher.register("foo").await;
        publisher.publish("foo", Status::ready_now()).await;

        // A second registration must not reset the published status.
        publisher.register("foo").await;

        let report = publisher.snapshot_all().await;
        assert!(report.targets["foo"].ready);
    }

    #[tokio::test]
    async fn snapshot_subset_is_all_or_nothing() {
        let publisher = Publisher::new();
        publisher.register("foo").await;
        publisher.publish("foo", Status::ready_now()).await;

        let names = vec!["foo".to_owned(), "missing".to_owned()];
        let err = publisher.snapshot_subset(&names).await.unwrap_err();
        assert!(matches!(err, WatchError::UnknownTarget(name) if name == "missing"));
    }

    #[tokio::test]
    async fn snapshot_subset_on_empty_store_is_not_found() {
        let publisher = Publisher::new();
        let names = vec!["missing".to_owned()];
        assert!(publisher.snapshot_subset(&names).await.is_err());
    }

    #[tokio::test]
    async fn snapshot_subset_aggregates_only_selected_targets() {
        let publisher = Publisher::new();
        publisher.publish("foo", Status::ready_now()).await;
        publisher.publish("bar", Status::pending()).await;
        publisher.publish("baz", Status::errored("ouch")).await;

        // All three: the errored target dominates.
        let all = publisher.snapshot_all().await;
        assert_eq!(all.aggregate, Aggregate::Unavailable);

        // foo + bar: one ready, one pending.
        let names = vec!["foo".to_owned(), "bar".to_owned()];
        let report = publisher.snapshot_subset(&names).await.unwrap();
        assert_eq!(report.aggregate, Aggregate::Pending);
        assert_eq!(report.targets.len(), 2);

        // foo alone: ready.
        let names = vec!["foo".to_owned()];
        let report = publisher.snapshot_subset(&names).await.unwrap();
        assert_eq!(report.aggregate, Aggregate::Ok);
    }

    #[tokio::test]
    async fn registered_count_tracks_entries() {
        let publisher = Publisher::new();
        assert_eq!(publisher.registered_count().await, 0);
        publisher.register("foo").await;
        publisher.register("bar").await;
        publisher.register("foo").await;
        assert_eq!(publisher.registered_count().await, 2);
    }

    #[tokio::test]
    async fn concurrent_publishers_and_readers() {
        use std::sync::Arc;

        let publisher = Arc::new(Publisher::new());
        for i in 0..8 {
            publisher.register(&format!("svc-{i}")).await;
        }

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let p = Arc::clone(&publisher);
                tokio::spawn(async move {
                    p.publish(&format!("svc-{i}"), Status::ready_now()).await;
                })
            })
            .collect();
        let readers: Vec<_> = (0..8)
            .map(|_| {
                let p = Arc::clone(&publisher);
                tokio::spawn(async move { p.snapshot_all().await })
            })
            .collect();

        for handle in writers {
            handle.await.unwrap();
        }
        for handle in readers {
            let report = handle.await.unwrap();
            assert_eq!(report.targets.len(), 8);
        }

        let report = publisher.snapshot_all().await;
        assert_eq!(report.aggregate, Aggregate::Ok);
    }

    #[test]
    fn report_serializes_targets_and_aggregate() {
        let report = StatusReport {
            aggregate: Aggregate::Pending,
            targets: BTreeMap::from([("foo".to_owned(), Status::pending())]),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""aggregate":"pending""#));
        assert!(json.contains(r#""foo""#));
    }
}
