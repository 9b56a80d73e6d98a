//! Prometheus metrics for request and store monitoring.

use std::sync::LazyLock;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use regex::{Captures, Regex};
use sb_db::StoreError;

use crate::error::ApiError;

/// Student id segment of a path.
static STUDENT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/students/[^/]+").expect("valid student segment pattern"));

/// Trailing topic segment, optionally followed by `/retention`.
static TOPIC_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(progress|reviews)/([^/]+)(/retention)?$").expect("valid topic segment pattern")
});

/// Initialize Prometheus metrics exporter
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    // Request duration buckets, in seconds
    let builder = builder.set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        &[
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ],
    )?;

    let handle = builder.install_recorder()?;

    Ok(handle)
}

/// Middleware to record HTTP request metrics
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let in_flight = gauge!(
        "http_requests_in_flight",
        "method" => method.clone(),
        "path" => path.clone()
    );
    in_flight.increment(1.0);

    let response = next.run(req).await;

    in_flight.decrement(1.0);

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(duration);

    response
}

/// Normalize URL paths to keep label cardinality bounded
///
/// Student ids and topic names become placeholders; the fixed `due` listing keeps
/// its name.
pub fn normalize_path(path: &str) -> String {
    let normalized = STUDENT_SEGMENT.replace(path, "/students/:student");

    TOPIC_SEGMENT
        .replace(&normalized, |caps: &Captures<'_>| {
            let collection = &caps[1];
            let retention = caps.get(3).map_or("", |m| m.as_str());
            if collection == "reviews" && &caps[2] == "due" && retention.is_empty() {
                caps[0].to_string()
            } else {
                format!("/{collection}/:topic{retention}")
            }
        })
        .into_owned()
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}

/// Record the outcome of a store operation
pub fn record_store_operation(operation: &'static str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        "store_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

/// Record a document that could not be loaded or saved
pub fn record_persistence_failure(operation: &'static str) {
    counter!("store_persistence_failures_total", "operation" => operation).increment(1);
}

/// Record a store call and convert its error for the handler.
pub fn observe<T>(operation: &'static str, result: Result<T, StoreError>) -> Result<T, ApiError> {
    record_store_operation(operation, result.is_ok());
    if let Err(StoreError::Persistence(_)) = &result {
        record_persistence_failure(operation);
    }
    result.map_err(ApiError::from)
}
