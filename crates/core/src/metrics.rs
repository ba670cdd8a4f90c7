//! Metric name constants and description registration.
//!
//! All Prometheus metric names are defined centrally here. Modules call
//! `metrics::counter!()` / `metrics::gauge!()` with these constants.
//!
//! Naming convention: `quaywatch_` prefix, `_total` suffix for counters,
//! no suffix for gauges.

/// Label key carrying the target name.
pub const LABEL_TARGET: &str = "target";

/// Counter: log lines scanned across all targets.
pub const LINES_SCANNED_TOTAL: &str = "quaywatch_lines_scanned_total";

/// Counter: targets that reached ready state (pattern match or fail-open).
pub const TARGETS_READY_TOTAL: &str = "quaywatch_targets_ready_total";

/// Counter: targets that ended in an errored state.
pub const TARGETS_ERRORED_TOTAL: &str = "quaywatch_targets_errored_total";

/// Counter: readiness deadlines that elapsed and were published fail-open.
pub const READY_TIMEOUTS_TOTAL: &str = "quaywatch_ready_timeouts_total";

/// Gauge: targets currently registered and still pending.
pub const TARGETS_PENDING: &str = "quaywatch_targets_pending";

/// Counter: status queries served by the HTTP endpoint.
pub const STATUS_QUERIES_TOTAL: &str = "quaywatch_status_queries_total";

/// Register descriptions for all metrics with the installed recorder.
///
/// Call once after the recorder is installed; calls are no-ops when no
/// recorder is present.
pub fn describe_all() {
    metrics::describe_counter!(
        LINES_SCANNED_TOTAL,
        "Log lines scanned across all monitored targets"
    );
    metrics::describe_counter!(
        TARGETS_READY_TOTAL,
        "Targets that reached ready state (match or fail-open timeout)"
    );
    metrics::describe_counter!(
        TARGETS_ERRORED_TOTAL,
        "Targets that ended in an errored state"
    );
    metrics::describe_counter!(
        READY_TIMEOUTS_TOTAL,
        "Readiness deadlines that elapsed and were published fail-open"
    );
    metrics::describe_gauge!(TARGETS_PENDING, "Targets registered and still pending");
    metrics::describe_counter!(
        STATUS_QUERIES_TOTAL,
        "Status queries served by the HTTP endpoint"
    );
}
