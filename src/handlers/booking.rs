use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::pages::SiteState;
use super::render::Page;
use crate::models::BookingForm;

pub const BOOKING_SUCCESSFUL: &str = "Booking successful!";

/// Outcome of a booking submission; logical failures are still HTTP 200
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub success: bool,
    pub message: String,
}

impl BookingResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// The empty booking form
#[instrument(name = "booking_page", skip_all)]
pub async fn booking_page(State(state): State<SiteState>, jar: CookieJar) -> Response {
    let context = state.context(&jar).await;
    state.ok(&Page::Book, &context)
}

/// Submit a booking.
///
/// A body that is not a form counts as an empty submission, so the caller
/// gets field errors rather than a rejection.
#[instrument(name = "submit_booking", skip_all)]
pub async fn submit_booking(
    State(state): State<SiteState>,
    form: Result<Form<BookingForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_default();

    let result = state
        .business
        .trace_booking_operation("submit", state.booking_service.submit_booking(&form))
        .await;

    match result {
        Ok(_) => Json(BookingResponse {
            success: true,
            message: BOOKING_SUCCESSFUL.to_string(),
        })
        .into_response(),
        Err(e) if e.is_internal() => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(BookingResponse::failure("Internal server error")),
        )
            .into_response(),
        Err(e) => Json(BookingResponse::failure(e.to_string())).into_response(),
    }
}
