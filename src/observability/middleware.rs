use axum::{
    extract::{MatchedPath, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::{future::Future, sync::Arc, time::Instant};
use tracing::{error, info, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Metrics;
use crate::models::{ServiceError, ServiceResult};

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// First X-Forwarded-For hop, else X-Real-IP
fn client_ip(headers: &HeaderMap) -> String {
    header_value(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

/// Middleware for automatic request tracing and metrics collection
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let user_agent = header_value(request.headers(), "user-agent")
        .unwrap_or("unknown")
        .to_string();
    let client_ip = client_ip(request.headers());

    // Route template keeps label cardinality bounded; unmatched paths share one label
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let span_name = format!("{} {}", method, endpoint);
    let span = tracing::info_span!(
        target: "littlelemon_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.target = %path,
        http.user_agent = %user_agent,
        client.address = %client_ip,
        http.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        metrics.increment_in_flight(&method, &endpoint);

        let trace_id = tracing::Span::current()
            .context()
            .span()
            .span_context()
            .trace_id()
            .to_string();

        info!(trace_id = %trace_id, method = %method, path = %path, client_ip = %client_ip, "Processing request");

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let status_code = response.status().as_u16();

        let current_span = tracing::Span::current();
        current_span.record("http.status_code", status_code);
        current_span.record("http.response_time_ms", duration.as_millis() as u64);
        if status_code >= 500 {
            current_span
                .context()
                .span()
                .set_status(opentelemetry::trace::Status::error("HTTP error"));
        } else {
            current_span
                .context()
                .span()
                .set_status(opentelemetry::trace::Status::Ok);
        }

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());
        metrics.decrement_in_flight(&method, &endpoint);

        if status_code >= 500 {
            error!(
                trace_id = %trace_id,
                method = %method,
                path = %path,
                status_code = status_code,
                duration_ms = duration.as_millis() as u64,
                "Request completed with error"
            );
        } else {
            info!(
                trace_id = %trace_id,
                method = %method,
                path = %path,
                status_code = status_code,
                duration_ms = duration.as_millis() as u64,
                "Request completed"
            );
        }

        response
    }
    .instrument(span)
    .await
}

/// Wraps service calls with a span, an outcome log line and a business counter
pub struct BusinessTracingMiddleware {
    metrics: Arc<Metrics>,
}

/// Which business counter an operation feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BusinessArea {
    Booking,
    Auth,
    ReservationQuery,
}

impl BusinessTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    /// Trace a booking operation
    pub async fn trace_booking_operation<F, T>(&self, operation: &str, future: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        self.trace(BusinessArea::Booking, operation, future).await
    }

    /// Trace a registration, login or logout
    pub async fn trace_auth_operation<F, T>(&self, operation: &str, future: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        self.trace(BusinessArea::Auth, operation, future).await
    }

    /// Trace a reservations-by-date lookup
    pub async fn trace_reservation_query<F, T>(&self, future: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        self.trace(BusinessArea::ReservationQuery, "list_by_date", future)
            .await
    }

    /// Count a reservation query refused before it reached the service
    pub fn reject_reservation_query(&self, error: &ServiceError) {
        self.metrics.record_reservation_query(error.kind());
        warn!(error = %error, "Reservation query rejected");
    }

    async fn trace<F, T>(&self, area: BusinessArea, operation: &str, future: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        let span = tracing::info_span!(
            "business_operation",
            area = ?area,
            operation = %operation,
            outcome = tracing::field::Empty,
        );

        async {
            let start_time = Instant::now();
            let result = future.await;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            let status = match &result {
                Ok(_) => "success",
                Err(error) => error.kind(),
            };
            tracing::Span::current().record("outcome", status);

            match area {
                BusinessArea::Booking => self.metrics.record_booking_operation(operation, status),
                BusinessArea::Auth => self.metrics.record_auth_operation(operation, status),
                BusinessArea::ReservationQuery => self.metrics.record_reservation_query(status),
            }

            match &result {
                Ok(_) => info!(duration_ms, "Operation completed successfully"),
                Err(error) if error.is_internal() => {
                    error!(error = %error, duration_ms, "Operation failed")
                }
                Err(error) => warn!(error = %error, duration_ms, "Operation rejected"),
            }

            result
        }
        .instrument(span)
        .await
    }
}
