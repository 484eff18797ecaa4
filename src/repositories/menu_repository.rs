use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{dynamodb_span, get_number, get_string, map_dynamodb_error, Item};
use super::id_sequence::{IdSequence, MENU_ITEM_SEQUENCE};
use crate::models::{MenuItem, NewMenuItem, RepositoryError, RepositoryResult};

/// Trait defining the interface for menu data access operations
#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// Every menu item, ordered by id
    async fn find_all(&self) -> RepositoryResult<Vec<MenuItem>>;

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<MenuItem>>;

    async fn create(&self, item: NewMenuItem) -> RepositoryResult<MenuItem>;

    async fn count(&self) -> RepositoryResult<usize>;
}

/// DynamoDB implementation of the MenuRepository trait
pub struct DynamoDbMenuRepository {
    client: Arc<DynamoDbClient>,
    ids: Arc<dyn IdSequence>,
    table_name: String,
    region: String,
}

impl DynamoDbMenuRepository {
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
            region,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Convert a MenuItem to DynamoDB attribute values
    pub fn menu_item_to_item(&self, menu_item: &MenuItem) -> Item {
        let mut item = HashMap::new();

        item.insert("id".to_string(), AttributeValue::N(menu_item.id.to_string()));
        item.insert("name".to_string(), AttributeValue::S(menu_item.name.clone()));
        item.insert(
            "price".to_string(),
            AttributeValue::N(menu_item.price.to_string()),
        );
        item.insert(
            "menu_item_description".to_string(),
            AttributeValue::S(menu_item.menu_item_description.clone()),
        );

        item
    }

    /// Convert a DynamoDB item to a MenuItem
    pub fn item_to_menu_item(&self, item: &Item) -> RepositoryResult<MenuItem> {
        let price = item
            .get("price")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| Decimal::from_str(n).ok())
            .ok_or_else(|| RepositoryError::InvalidData {
                message: "Missing or invalid price".to_string(),
            })?;

        Ok(MenuItem {
            id: get_number(item, "id")?,
            name: get_string(item, "name")?,
            price,
            // Older items may have been written without a description
            menu_item_description: get_string(item, "menu_item_description").unwrap_or_default(),
        })
    }
}

#[async_trait]
impl MenuRepository for DynamoDbMenuRepository {
    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<MenuItem>> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let scan_span = dynamodb_span("Scan", &self.table_name, &self.region);
            let response = async {
                self.client
                    .scan()
                    .table_name(&self.table_name)
                    .select(Select::AllAttributes)
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
            }
            .instrument(scan_span)
            .await?;

            for item in response.items.unwrap_or_default() {
                match self.item_to_menu_item(&item) {
                    Ok(menu_item) => items.push(menu_item),
                    Err(e) => warn!("Failed to parse menu item: {}", e),
                }
            }

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        items.sort_by_key(|item| item.id);
        info!("Found {} menu items", items.len());
        Ok(items)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<MenuItem>> {
        let get_span = dynamodb_span("GetItem", &self.table_name, &self.region);

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::N(id.to_string()))
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(get_span)
        .await?;

        response
            .item
            .map(|item| self.item_to_menu_item(&item))
            .transpose()
    }

    #[instrument(skip(self, item), fields(table = %self.table_name, name = %item.name))]
    async fn create(&self, item: NewMenuItem) -> RepositoryResult<MenuItem> {
        info!("Creating new menu item");

        let id = self.ids.next_id(MENU_ITEM_SEQUENCE).await?;
        let menu_item = MenuItem::from_new(id, item);
        let attributes = self.menu_item_to_item(&menu_item);

        let put_span = dynamodb_span("PutItem", &self.table_name, &self.region);

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(attributes))
                .condition_expression("attribute_not_exists(id)")
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(put_span)
        .await?;

        info!(menu_item_id = menu_item.id, "Menu item created successfully");
        Ok(menu_item)
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn count(&self) -> RepositoryResult<usize> {
        let mut count = 0usize;
        let mut start_key: Option<Item> = None;

        loop {
            let response = self
                .client
                .scan()
                .table_name(&self.table_name)
                .select(Select::Count)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))?;

            count += response.count() as usize;

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        info!("Menu item count: {}", count);
        Ok(count)
    }
}
