use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

use crate::observability::Metrics;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus text exposition of the service registry
#[instrument(name = "metrics_handler", skip(metrics))]
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    metrics
        .encode()
        .map(|text| {
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
                text,
            )
                .into_response()
        })
        .unwrap_or_else(|e| {
            crate::error_with_trace!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        })
}
