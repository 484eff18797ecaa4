use axum::{
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::models::{BookingSummary, ServiceError};
use crate::observability::BusinessTracingMiddleware;
use crate::services::ReservationService;

pub const NO_BOOKING: &str = "No Booking";

#[derive(Clone)]
pub struct ReservationState {
    pub reservation_service: Arc<ReservationService>,
    pub business: Arc<BusinessTracingMiddleware>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReservationsQuery {
    pub date: Option<String>,
}

/// JSON body of `/reservations_api`; logical failures are still HTTP 200
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ReservationsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookings: Option<Vec<BookingSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReservationsResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            date: None,
            bookings: None,
            message: Some(message.into()),
        }
    }
}

/// Bookings for `?date=YYYY-MM-DD`.
///
/// Mounted for every method: anything but GET is answered before the query
/// string is parsed or storage is touched.
#[instrument(name = "reservations_api", skip(state, uri))]
pub async fn reservations_api(
    State(state): State<ReservationState>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET {
        let error = ServiceError::MethodNotSupported;
        state.business.reject_reservation_query(&error);
        return Json(ReservationsResponse::failure(error.to_string())).into_response();
    }

    let query = Query::<ReservationsQuery>::try_from_uri(&uri)
        .map(|Query(query)| query)
        .unwrap_or_default();

    let result = state
        .business
        .trace_reservation_query(
            state
                .reservation_service
                .list_bookings_by_date(query.date.as_deref()),
        )
        .await;

    match result {
        Ok(day) => {
            let message = day.bookings.is_empty().then(|| NO_BOOKING.to_string());
            Json(ReservationsResponse {
                success: true,
                date: Some(day.date),
                bookings: Some(day.bookings),
                message,
            })
            .into_response()
        }
        Err(e) if e.is_internal() => {
            crate::error_with_trace!(error = %e, "Reservation lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReservationsResponse::failure("Internal server error")),
            )
                .into_response()
        }
        Err(e) => Json(ReservationsResponse::failure(e.to_string())).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Booking, NewBooking, RepositoryError};
    use crate::observability::Metrics;
    use crate::repositories::BookingRepository;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, routing::any, Router};
    use chrono::NaiveDate;
    use mockall::mock;
    use tower::ServiceExt;

    mock! {
        TestBookingRepository {}

        #[async_trait]
        impl BookingRepository for TestBookingRepository {
            async fn create(&self, booking: NewBooking) -> Result<Booking, RepositoryError>;
            async fn find_by_slot(&self, date: NaiveDate, slot: &str) -> Result<Option<Booking>, RepositoryError>;
            async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Booking>, RepositoryError>;
            async fn find_by_guest_name(&self, first_name: &str, last_name: &str) -> Result<Vec<Booking>, RepositoryError>;
        }
    }

    fn app(repository: MockTestBookingRepository) -> (Router, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        let state = ReservationState {
            reservation_service: Arc::new(ReservationService::new(Arc::new(repository))),
            business: Arc::new(BusinessTracingMiddleware::new(metrics.clone())),
        };
        let router = Router::new()
            .route("/reservations_api", any(reservations_api))
            .with_state(state);
        (router, metrics)
    }

    async fn call(router: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_non_get_never_reaches_storage() {
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let mut repository = MockTestBookingRepository::new();
            repository.expect_find_by_date().times(0);
            let (router, metrics) = app(repository);

            let (status, json) = call(router, method, "/reservations_api?date=2024-12-25").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                json,
                serde_json::json!({
                    "success": false,
                    "message": "Only GET requests are supported"
                })
            );
            let text = metrics.encode().unwrap();
            assert!(text.contains("method_not_supported"));
        }
    }

    #[tokio::test]
    async fn test_bookings_for_date() {
        let mut repository = MockTestBookingRepository::new();
        repository.expect_find_by_date().times(1).returning(|date| {
            Ok(vec![Booking::from_new(
                5,
                NewBooking {
                    first_name: "John".to_string(),
                    last_name: "Doe".to_string(),
                    guest_number: 4,
                    comment: String::new(),
                    reservation_date: date,
                    reservation_slot: "19:00".to_string(),
                },
            )])
        });
        let (router, _) = app(repository);

        let (status, json) = call(router, Method::GET, "/reservations_api?date=2024-12-25").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "date": "2024-12-25",
                "bookings": [
                    {"id": 5, "first_name": "John", "reservation_slot": "19:00", "created_at": 5}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_empty_day_says_no_booking() {
        let mut repository = MockTestBookingRepository::new();
        repository
            .expect_find_by_date()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let (router, _) = app(repository);

        let (_, json) = call(router, Method::GET, "/reservations_api?date=2030-01-01").await;

        assert_eq!(json["success"], true);
        assert_eq!(json["bookings"], serde_json::json!([]));
        assert_eq!(json["message"], NO_BOOKING);
    }

    #[tokio::test]
    async fn test_query_errors() {
        for (uri, message) in [
            ("/reservations_api", "Please provide a date parameter"),
            ("/reservations_api?date=", "Please provide a date parameter"),
            ("/reservations_api?date=invalid-date", "Invalid date format"),
        ] {
            let mut repository = MockTestBookingRepository::new();
            repository.expect_find_by_date().times(0);
            let (router, _) = app(repository);

            let (status, json) = call(router, Method::GET, uri).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["success"], false, "{}", uri);
            assert_eq!(json["message"], message, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let mut repository = MockTestBookingRepository::new();
        repository.expect_find_by_date().times(1).returning(|_| {
            Err(RepositoryError::AwsSdk {
                message: "throttled".to_string(),
            })
        });
        let (router, _) = app(repository);

        let (status, json) = call(router, Method::GET, "/reservations_api?date=2024-12-25").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
    }
}
