use async_trait::async_trait;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument};

use super::dynamodb::{dynamodb_span, get_number, get_string, map_dynamodb_error, Item};
use super::id_sequence::{IdSequence, BOOKING_SEQUENCE};
use crate::models::{
    slot_key, Booking, NewBooking, RepositoryError, RepositoryResult, RESERVATION_DATE_FORMAT,
};

/// Trait defining the interface for booking data access operations
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist a booking under a fresh id.
    ///
    /// Fails with `RepositoryError::Conflict` when the (date, slot) pair is
    /// already held; the check and the write are atomic.
    async fn create(&self, booking: NewBooking) -> RepositoryResult<Booking>;

    /// The booking holding a (date, slot) pair, if any
    async fn find_by_slot(&self, date: NaiveDate, slot: &str) -> RepositoryResult<Option<Booking>>;

    /// All bookings on a date, ordered by id
    async fn find_by_date(&self, date: NaiveDate) -> RepositoryResult<Vec<Booking>>;

    /// Bookings made under a guest name, ordered by (date, slot, id)
    async fn find_by_guest_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> RepositoryResult<Vec<Booking>>;
}

/// DynamoDB implementation of the BookingRepository trait.
///
/// Items are keyed by `slot_key`, so DynamoDB itself rejects a second booking
/// for the same (date, slot).
pub struct DynamoDbBookingRepository {
    client: Arc<DynamoDbClient>,
    ids: Arc<dyn IdSequence>,
    table_name: String,
    date_index: String,
    region: String,
}

impl DynamoDbBookingRepository {
    pub fn new(
        client: Arc<DynamoDbClient>,
        ids: Arc<dyn IdSequence>,
        table_name: String,
        region: String,
    ) -> Self {
        Self {
            client,
            ids,
            table_name,
            date_index: "ReservationDateIndex".to_string(),
            region,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn date_index(&self) -> &str {
        &self.date_index
    }

    /// Convert a Booking to DynamoDB attribute values
    pub fn booking_to_item(&self, booking: &Booking) -> Item {
        let mut item = HashMap::new();

        item.insert("slot_key".to_string(), AttributeValue::S(booking.slot_key()));
        item.insert("id".to_string(), AttributeValue::N(booking.id.to_string()));
        item.insert(
            "first_name".to_string(),
            AttributeValue::S(booking.first_name.clone()),
        );
        item.insert(
            "last_name".to_string(),
            AttributeValue::S(booking.last_name.clone()),
        );
        item.insert(
            "guest_number".to_string(),
            AttributeValue::N(booking.guest_number.to_string()),
        );
        item.insert(
            "comment".to_string(),
            AttributeValue::S(booking.comment.clone()),
        );
        item.insert(
            "reservation_date".to_string(),
            AttributeValue::S(
                booking
                    .reservation_date
                    .format(RESERVATION_DATE_FORMAT)
                    .to_string(),
            ),
        );
        item.insert(
            "reservation_slot".to_string(),
            AttributeValue::S(booking.reservation_slot.clone()),
        );

        item
    }

    /// Convert a DynamoDB item to a Booking
    pub fn item_to_booking(&self, item: &Item) -> RepositoryResult<Booking> {
        let raw_date = get_string(item, "reservation_date")?;
        let reservation_date = NaiveDate::parse_from_str(&raw_date, RESERVATION_DATE_FORMAT)
            .map_err(|_| RepositoryError::InvalidData {
                message: format!("Invalid reservation_date: {}", raw_date),
            })?;

        Ok(Booking {
            id: get_number(item, "id")?,
            first_name: get_string(item, "first_name")?,
            last_name: get_string(item, "last_name")?,
            guest_number: get_number(item, "guest_number")?,
            comment: get_string(item, "comment")?,
            reservation_date,
            reservation_slot: get_string(item, "reservation_slot")?,
        })
    }

    fn items_to_bookings(&self, items: Vec<Item>) -> Vec<Booking> {
        items
            .iter()
            .filter_map(|item| match self.item_to_booking(item) {
                Ok(booking) => Some(booking),
                Err(e) => {
                    warn!("Failed to parse booking item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl BookingRepository for DynamoDbBookingRepository {
    #[instrument(skip(self, booking), fields(table = %self.table_name, slot_key = %booking.slot_key()))]
    async fn create(&self, booking: NewBooking) -> RepositoryResult<Booking> {
        info!("Creating new booking");

        let id = self.ids.next_id(BOOKING_SEQUENCE).await?;
        let booking = Booking::from_new(id, booking);
        let item = self.booking_to_item(&booking);

        let put_span = dynamodb_span("PutItem", &self.table_name, &self.region);

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(slot_key)")
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(put_span)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict { .. } => RepositoryError::Conflict {
                message: format!("slot {} is already booked", booking.slot_key()),
            },
            other => other,
        })?;

        info!(booking_id = booking.id, "Booking created successfully");
        Ok(booking)
    }

    #[instrument(skip(self), fields(table = %self.table_name, date = %date, slot = %slot))]
    async fn find_by_slot(&self, date: NaiveDate, slot: &str) -> RepositoryResult<Option<Booking>> {
        let get_span = dynamodb_span("GetItem", &self.table_name, &self.region);

        let response = async {
            let result = self
                .client
                .get_item()
                .table_name(&self.table_name)
                .key("slot_key", AttributeValue::S(slot_key(date, slot)))
                .consistent_read(true)
                .send()
                .await;

            match &result {
                Ok(output) => {
                    if let Some(request_id) = output.request_id() {
                        tracing::Span::current().record("aws.request_id", request_id);
                    }
                }
                Err(e) => error!("DynamoDB GetItem failed: {}", e),
            }

            result.map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(get_span)
        .await?;

        response
            .item
            .map(|item| self.item_to_booking(&item))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.table_name, date = %date))]
    async fn find_by_date(&self, date: NaiveDate) -> RepositoryResult<Vec<Booking>> {
        let mut bookings = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let query_span = dynamodb_span("Query", &self.table_name, &self.region);
            let response = async {
                self.client
                    .query()
                    .table_name(&self.table_name)
                    .index_name(&self.date_index)
                    .key_condition_expression("reservation_date = :date")
                    .expression_attribute_values(
                        ":date",
                        AttributeValue::S(date.format(RESERVATION_DATE_FORMAT).to_string()),
                    )
                    .scan_index_forward(true)
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
            }
            .instrument(query_span)
            .await?;

            bookings.extend(self.items_to_bookings(response.items.unwrap_or_default()));

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        // Pages arrive in index order already; sorting keeps the contract explicit
        bookings.sort_by_key(|booking| booking.id);
        info!("Found {} bookings", bookings.len());
        Ok(bookings)
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_by_guest_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> RepositoryResult<Vec<Booking>> {
        let mut bookings = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let scan_span = dynamodb_span("Scan", &self.table_name, &self.region);
            let response = async {
                self.client
                    .scan()
                    .table_name(&self.table_name)
                    .filter_expression("first_name = :first AND last_name = :last")
                    .expression_attribute_values(":first", AttributeValue::S(first_name.to_string()))
                    .expression_attribute_values(":last", AttributeValue::S(last_name.to_string()))
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
            }
            .instrument(scan_span)
            .await?;

            bookings.extend(self.items_to_bookings(response.items.unwrap_or_default()));

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        bookings.sort_by(|a, b| {
            (a.reservation_date, &a.reservation_slot, a.id).cmp(&(
                b.reservation_date,
                &b.reservation_slot,
                b.id,
            ))
        });
        info!("Found {} bookings for guest", bookings.len());
        Ok(bookings)
    }
}
