//! Prometheus metrics
//!
//! The recorder is installed once per process; handlers and middleware use
//! the `metrics` macros and `/metrics` renders the exposition text.

use axum::{
    extract::{MatchedPath, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::{Duration, Instant};

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

/// Install the Prometheus recorder. Later calls return the same handle.
pub fn init_metrics() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_try_init(|| {
            PrometheusBuilder::new()
                .set_buckets_for_metric(
                    Matcher::Full("growth_http_request_duration_seconds".to_string()),
                    LATENCY_BUCKETS,
                )?
                .install_recorder()
        })
        .map(Clone::clone)
        .map_err(|e| tracing::error!(error = %e, "Failed to install Prometheus recorder"))
        .ok()
}

/// `GET /metrics`
pub async fn metrics_handler() -> Response {
    match PROMETHEUS.get() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics are disabled").into_response(),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "growth_http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "growth_http_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_error(kind: &'static str) {
    metrics::counter!("growth_http_errors_total", "kind" => kind).increment(1);
}

/// Route-level middleware; the matched path keeps label cardinality bounded
pub async fn track_requests(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(req).await;
    record_request(
        method.as_str(),
        &route,
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}
