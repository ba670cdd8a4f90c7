//! HTTP status endpoint.
//!
//! Thin façade over the status store: query parameters select targets, the
//! response body is the serialized per-target map, and the HTTP status code
//! carries the aggregate readiness:
//!
//! - 200 OK — all selected targets ready
//! - 202 Accepted — no errors, at least one target still pending
//! - 503 Service Unavailable — at least one target errored
//! - 404 Not Found — a requested target is not registered (all-or-nothing)
//! - 500 Internal Server Error — response serialization failed
//!
//! Only `GET` is routed; axum answers other methods with 405 and an
//! `Allow: GET` header.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use metrics::counter;
use tracing::error;

use quaywatch_core::lifecycle::HealthStatus;
use quaywatch_core::metrics::STATUS_QUERIES_TOTAL;
use quaywatch_watcher::docker::DockerClient;
use quaywatch_watcher::publisher::{Aggregate, Publisher, StatusReport};

/// Shared handler state.
pub struct AppState<D: DockerClient> {
    /// The status store written by the monitors.
    pub publisher: Arc<Publisher>,
    /// Docker client, used by the health endpoint only.
    pub docker: Arc<D>,
}

impl<D: DockerClient> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            docker: Arc::clone(&self.docker),
        }
    }
}

/// Builds the status endpoint router.
pub fn router<D: DockerClient>(state: AppState<D>) -> Router {
    Router::new()
        .route("/", get(status_root::<D>))
        .route("/api/:name", get(status_single::<D>))
        .route("/healthz", get(healthz::<D>))
        .with_state(state)
}

/// GET / — query parameter `status=name1,name2,...`; `*` or absent means
/// every registered target.
async fn status_root<D: DockerClient>(
    State(state): State<AppState<D>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    counter!(STATUS_QUERIES_TOTAL).increment(1);

    let raw = params.get("status").map(String::as_str).unwrap_or_default();
    if raw.is_empty() || raw == "*" {
        return render_report(state.publisher.snapshot_all().await);
    }

    let names: Vec<String> = raw.split(',').map(str::to_owned).collect();
    match state.publisher.snapshot_subset(&names).await {
        Ok(report) => render_report(report),
        Err(err) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
    }
}

/// GET /api/{name} — single-target query with the same code mapping.
async fn status_single<D: DockerClient>(
    State(state): State<AppState<D>>,
    Path(name): Path<String>,
) -> Response {
    counter!(STATUS_QUERIES_TOTAL).increment(1);

    let names = vec![name];
    match state.publisher.snapshot_subset(&names).await {
        Ok(report) => render_report(report),
        Err(err) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
    }
}

/// GET /healthz — sidecar health, independent of target readiness.
async fn healthz<D: DockerClient>(State(state): State<AppState<D>>) -> Response {
    let health = if state.docker.ping().await.is_ok() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded("docker daemon not reachable".to_owned())
    };

    let code = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    match serde_json::to_string(&health) {
        Ok(body) => json_response(code, body),
        Err(err) => {
            error!(error = %err, "failed to serialize health status");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to serialize health status",
            )
                .into_response()
        }
    }
}

fn aggregate_code(aggregate: Aggregate) -> StatusCode {
    match aggregate {
        Aggregate::Ok => StatusCode::OK,
        Aggregate::Pending => StatusCode::ACCEPTED,
        Aggregate::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Serializes the per-target map; the aggregate rides on the status code.
fn render_report(report: StatusReport) -> Response {
    match serde_json::to_string(&report.targets) {
        Ok(body) => json_response(aggregate_code(report.aggregate), body),
        Err(err) => {
            error!(error = %err, "failed to serialize status report");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to serialize status report",
            )
                .into_response()
        }
    }
}

fn json_response(code: StatusCode, body: String) -> Response {
    (
        code,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
