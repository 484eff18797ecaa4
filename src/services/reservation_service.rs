use std::sync::Arc;
use tracing::instrument;

use crate::models::{parse_reservation_date, DateBookings, ServiceError, ServiceResult};
use crate::repositories::BookingRepository;

/// Read-only lookups of bookings by date
pub struct ReservationService {
    repository: Arc<dyn BookingRepository>,
}

impl ReservationService {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self { repository }
    }

    /// Bookings on `date` (`YYYY-MM-DD`), projected for the reservations API.
    ///
    /// An absent or empty parameter is `MissingParameter`; an unparsable one is
    /// `InvalidDate`. The requested string is echoed back unchanged.
    #[instrument(skip(self))]
    pub async fn list_bookings_by_date(&self, date: Option<&str>) -> ServiceResult<DateBookings> {
        let raw = date
            .filter(|raw| !raw.is_empty())
            .ok_or(ServiceError::MissingParameter)?;
        let parsed = parse_reservation_date(raw).map_err(|_| ServiceError::InvalidDate)?;

        let bookings = self.repository.find_by_date(parsed).await?;

        crate::info_with_trace!(count = bookings.len(), "Listed bookings for date");
        Ok(DateBookings {
            date: raw.to_string(),
            bookings: bookings.iter().map(|booking| booking.summary()).collect(),
        })
    }
}
