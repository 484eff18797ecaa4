use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Last name stored when the guest leaves it out
pub const DEFAULT_LAST_NAME: &str = "Guest";

/// Party size stored when the guest leaves it out
pub const DEFAULT_GUEST_NUMBER: i64 = 1;

/// Comment stored when the guest leaves it out
pub const DEFAULT_COMMENT: &str = "No special requests";

/// Wire format of reservation dates (form fields, query parameters, storage)
pub const RESERVATION_DATE_FORMAT: &str = "%Y-%m-%d";

/// A table reservation as persisted by the data store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub guest_number: i64,
    pub comment: String,
    pub reservation_date: NaiveDate,
    pub reservation_slot: String,
}

/// Raw booking submission, exactly as it arrives from the booking form.
///
/// Every field is optional here; [`crate::models::Validate`] turns it into a
/// [`NewBooking`] or a field → messages mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub guest_number: Option<String>,
    pub comment: Option<String>,
    pub reservation_date: Option<String>,
    pub reservation_slot: Option<String>,
}

/// A validated booking that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub first_name: String,
    pub last_name: String,
    pub guest_number: i64,
    pub comment: String,
    pub reservation_date: NaiveDate,
    pub reservation_slot: String,
}

/// Projection of a booking returned by the reservations API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub id: u64,
    pub first_name: String,
    pub reservation_slot: String,
    /// Creation-order proxy derived from the id, not a timestamp
    pub created_at: u64,
}

/// All bookings on one date, with the date echoed back as requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateBookings {
    pub date: String,
    pub bookings: Vec<BookingSummary>,
}

/// Key identifying a (date, slot) pair; at most one booking may hold it.
pub fn slot_key(date: NaiveDate, slot: &str) -> String {
    format!("{}#{}", date.format(RESERVATION_DATE_FORMAT), slot)
}

impl Booking {
    /// Attach a server-assigned id to a validated booking
    pub fn from_new(id: u64, booking: NewBooking) -> Self {
        Self {
            id,
            first_name: booking.first_name,
            last_name: booking.last_name,
            guest_number: booking.guest_number,
            comment: booking.comment,
            reservation_date: booking.reservation_date,
            reservation_slot: booking.reservation_slot,
        }
    }

    pub fn slot_key(&self) -> String {
        slot_key(self.reservation_date, &self.reservation_slot)
    }

    pub fn summary(&self) -> BookingSummary {
        BookingSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            reservation_slot: self.reservation_slot.clone(),
            created_at: self.id,
        }
    }

    pub fn matches_guest(&self, first_name: &str, last_name: &str) -> bool {
        self.first_name == first_name && self.last_name == last_name
    }
}

impl NewBooking {
    pub fn slot_key(&self) -> String {
        slot_key(self.reservation_date, &self.reservation_slot)
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}
