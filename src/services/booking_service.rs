use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    Booking, BookingForm, RepositoryError, ServiceError, ServiceResult, Validate,
};
use crate::repositories::BookingRepository;

/// Accepts booking submissions and enforces one booking per (date, slot)
pub struct BookingService {
    repository: Arc<dyn BookingRepository>,
}

impl BookingService {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self { repository }
    }

    /// Validate and persist a booking.
    ///
    /// Fails with `ValidationFailed` or `SlotAlreadyBooked` without writing
    /// anything. The early slot lookup gives the common case a clean answer;
    /// the repository's atomic create still settles races between submissions.
    #[instrument(skip(self, form))]
    pub async fn submit_booking(&self, form: &BookingForm) -> ServiceResult<Booking> {
        let booking = form.validate()?;

        if self
            .repository
            .find_by_slot(booking.reservation_date, &booking.reservation_slot)
            .await?
            .is_some()
        {
            crate::warn_with_trace!(
                date = %booking.reservation_date,
                slot = %booking.reservation_slot,
                "Slot already booked"
            );
            return Err(ServiceError::SlotAlreadyBooked {
                date: booking.reservation_date,
                slot: booking.reservation_slot,
            });
        }

        let date = booking.reservation_date;
        let slot = booking.reservation_slot.clone();
        match self.repository.create(booking).await {
            Ok(stored) => {
                crate::info_with_trace!(booking_id = stored.id, "Booking created");
                Ok(stored)
            }
            Err(RepositoryError::Conflict { .. }) => {
                crate::warn_with_trace!(date = %date, slot = %slot, "Lost race for slot");
                Err(ServiceError::SlotAlreadyBooked { date, slot })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewBooking, RepositoryError};
    use crate::repositories::InMemoryStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use mockall::mock;

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

    fn booking_form(first_name: &str) -> BookingForm {
        BookingForm {
            first_name: Some(first_name.to_string()),
            last_name: Some("Doe".to_string()),
            guest_number: Some("4".to_string()),
            comment: None,
            reservation_date: Some("2024-12-25".to_string()),
            reservation_slot: Some("19:00".to_string()),
        }
    }

    #[tokio::test]
    async fn test_submit_booking_success() {
        let mut mock_repo = MockTestBookingRepository::new();
        mock_repo
            .expect_find_by_slot()
            .times(1)
            .returning(|_, _| Ok(None));
        mock_repo
            .expect_create()
            .times(1)
            .returning(|booking| Ok(Booking::from_new(1, booking)));

        let service = BookingService::new(Arc::new(mock_repo));
        let booking = service.submit_booking(&booking_form("John")).await.unwrap();

        assert_eq!(booking.id, 1);
        assert_eq!(booking.first_name, "John");
        assert_eq!(booking.guest_number, 4);
    }

    #[tokio::test]
    async fn test_validation_failure_touches_nothing() {
        let mut mock_repo = MockTestBookingRepository::new();
        mock_repo.expect_find_by_slot().times(0);
        mock_repo.expect_create().times(0);

        let service = BookingService::new(Arc::new(mock_repo));
        let form = BookingForm {
            reservation_date: Some("not-a-date".to_string()),
            ..booking_form("")
        };

        let error = service.submit_booking(&form).await.unwrap_err();
        let errors = error.field_errors().unwrap();
        assert!(errors.contains("first_name"));
        assert!(errors.contains("reservation_date"));
    }

    #[tokio::test]
    async fn test_taken_slot_is_rejected_before_write() {
        let mut mock_repo = MockTestBookingRepository::new();
        mock_repo.expect_find_by_slot().times(1).returning(|date, slot| {
            Ok(Some(Booking::from_new(
                1,
                NewBooking {
                    first_name: "John".to_string(),
                    last_name: "Doe".to_string(),
                    guest_number: 4,
                    comment: String::new(),
                    reservation_date: date,
                    reservation_slot: slot.to_string(),
                },
            )))
        });
        mock_repo.expect_create().times(0);

        let service = BookingService::new(Arc::new(mock_repo));
        let error = service.submit_booking(&booking_form("Jane")).await.unwrap_err();

        assert_eq!(
            error.to_string(),
            "The date 2024-12-25 and time slot 19:00 is already booked"
        );
    }

    #[tokio::test]
    async fn test_storage_conflict_maps_to_slot_already_booked() {
        let mut mock_repo = MockTestBookingRepository::new();
        mock_repo
            .expect_find_by_slot()
            .times(1)
            .returning(|_, _| Ok(None));
        mock_repo.expect_create().times(1).returning(|_| {
            Err(RepositoryError::Conflict {
                message: "slot taken".to_string(),
            })
        });

        let service = BookingService::new(Arc::new(mock_repo));
        let error = service.submit_booking(&booking_form("Jane")).await.unwrap_err();

        assert!(matches!(error, ServiceError::SlotAlreadyBooked { .. }));
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_a_business_error() {
        let mut mock_repo = MockTestBookingRepository::new();
        mock_repo.expect_find_by_slot().times(1).returning(|_, _| {
            Err(RepositoryError::AwsSdk {
                message: "service unavailable".to_string(),
            })
        });

        let service = BookingService::new(Arc::new(mock_repo));
        let error = service.submit_booking(&booking_form("Jane")).await.unwrap_err();

        assert!(error.is_internal());
    }

    #[tokio::test]
    async fn test_concurrent_submissions_for_one_slot() {
        let service = Arc::new(BookingService::new(Arc::new(InMemoryStore::new())));

        let first_form = booking_form("John");
        let second_form = booking_form("Jane");
        let (first, second) = tokio::join!(
            service.submit_booking(&first_form),
            service.submit_booking(&second_form)
        );

        let outcomes = [first.is_ok(), second.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let failure = if first.is_err() { first } else { second };
        assert!(matches!(
            failure,
            Err(ServiceError::SlotAlreadyBooked { .. })
        ));
    }
}
