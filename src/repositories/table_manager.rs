use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::dynamodb::map_dynamodb_error;
use crate::models::{RepositoryError, RepositoryResult};

/// Names of every table the service uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub bookings: String,
    pub menu: String,
    pub users: String,
    pub counters: String,
}

/// Manages DynamoDB table creation and configuration
pub struct TableManager {
    client: Arc<DynamoDbClient>,
    wait_interval: Duration,
    max_wait_attempts: u32,
}

fn attribute(name: &str, kind: ScalarAttributeType) -> RepositoryResult<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(kind)
        .build()
        .map_err(|e| RepositoryError::AwsSdk {
            message: format!("Failed to build attribute definition: {}", e),
        })
}

fn key(name: &str, key_type: KeyType) -> RepositoryResult<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| RepositoryError::AwsSdk {
            message: format!("Failed to build key schema: {}", e),
        })
}

impl TableManager {
    /// Create a new table manager
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self {
            client,
            wait_interval: Duration::from_secs(5),
            max_wait_attempts: 60,
        }
    }

    /// Create the bookings table with its reservation date index
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_bookings_table(&self, table_name: &str) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(());
        }

        let date_index = GlobalSecondaryIndex::builder()
            .index_name("ReservationDateIndex")
            .key_schema(key("reservation_date", KeyType::Hash)?)
            .key_schema(key("id", KeyType::Range)?)
            .projection(
                Projection::builder()
                    .projection_type(ProjectionType::All)
                    .build(),
            )
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build GSI: {}", e),
            })?;

        self.client
            .create_table()
            .table_name(table_name)
            .attribute_definitions(attribute("slot_key", ScalarAttributeType::S)?)
            .attribute_definitions(attribute("reservation_date", ScalarAttributeType::S)?)
            .attribute_definitions(attribute("id", ScalarAttributeType::N)?)
            .key_schema(key("slot_key", KeyType::Hash)?)
            .global_secondary_indexes(date_index)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_dynamodb_error(e.into(), table_name))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await
    }

    /// Create a table with a single hash key and no indexes
    #[instrument(skip(self), fields(table_name = %table_name, hash_key = %hash_key))]
    pub async fn create_keyed_table(
        &self,
        table_name: &str,
        hash_key: &str,
        key_type: ScalarAttributeType,
    ) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(());
        }

        self.client
            .create_table()
            .table_name(table_name)
            .attribute_definitions(attribute(hash_key, key_type)?)
            .key_schema(key(hash_key, KeyType::Hash)?)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_dynamodb_error(e.into(), table_name))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => match DynamoDbError::from(e) {
                DynamoDbError::ResourceNotFoundException(_) => {
                    info!("Table {} does not exist", table_name);
                    Ok(false)
                }
                other => {
                    error!("Error checking table existence: {}", other);
                    Err(map_dynamodb_error(other, table_name))
                }
            },
        }
    }

    /// Wait for a table to become active
    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        for _ in 0..self.max_wait_attempts {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), table_name))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => info!("Table {} status: {:?}, waiting...", table_name, status),
                None => warn!("Table {} status unknown, waiting...", table_name),
            }

            tokio::time::sleep(self.wait_interval).await;
        }

        error!("Timeout waiting for table {} to become active", table_name);
        Err(RepositoryError::AwsSdk {
            message: format!("Timed out waiting for table {} to become active", table_name),
        })
    }

    /// Create every table the service needs; existing tables are left alone
    #[instrument(skip(self))]
    pub async fn create_all_tables(&self, names: &TableNames) -> RepositoryResult<Vec<String>> {
        info!("Creating all tables");

        let (bookings, menu, users, counters) = tokio::join!(
            self.create_bookings_table(&names.bookings),
            self.create_keyed_table(&names.menu, "id", ScalarAttributeType::N),
            self.create_keyed_table(&names.users, "username", ScalarAttributeType::S),
            self.create_keyed_table(&names.counters, "counter_name", ScalarAttributeType::S),
        );

        bookings?;
        menu?;
        users?;
        counters?;

        info!("All tables ready");
        Ok(vec![
            names.bookings.clone(),
            names.menu.clone(),
            names.users.clone(),
            names.counters.clone(),
        ])
    }
}
