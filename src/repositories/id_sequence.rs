use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{instrument, Instrument};

use super::dynamodb::{dynamodb_span, get_number, map_dynamodb_error};
use crate::models::RepositoryResult;

pub const BOOKING_SEQUENCE: &str = "bookings";
pub const MENU_ITEM_SEQUENCE: &str = "menu_items";
pub const USER_SEQUENCE: &str = "users";

/// Source of server-assigned ids, one counter per entity
#[async_trait]
pub trait IdSequence: Send + Sync {
    /// Next id for `sequence`, strictly greater than every id handed out before
    async fn next_id(&self, sequence: &str) -> RepositoryResult<u64>;
}

/// Atomic counters kept in a DynamoDB table keyed by `counter_name`
pub struct DynamoDbIdSequence {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbIdSequence {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl IdSequence for DynamoDbIdSequence {
    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn next_id(&self, sequence: &str) -> RepositoryResult<u64> {
        let update_span = dynamodb_span("UpdateItem", &self.table_name, &self.region);

        let response = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .key("counter_name", AttributeValue::S(sequence.to_string()))
                .update_expression("ADD next_id :one")
                .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
                .return_values(ReturnValue::UpdatedNew)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(update_span)
        .await?;

        let attributes = response.attributes.unwrap_or_default();
        get_number::<u64>(&attributes, "next_id")
    }
}
