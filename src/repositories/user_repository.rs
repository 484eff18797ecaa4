use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, Instrument};

use super::dynamodb::{dynamodb_span, get_number, get_string, map_dynamodb_error, Item};
use super::id_sequence::{IdSequence, USER_SEQUENCE};
use crate::models::{NewUser, RepositoryError, RepositoryResult, User};

/// Trait defining the interface for user account data access operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new account; `RepositoryError::Conflict` when the username is taken
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    async fn exists(&self, username: &str) -> RepositoryResult<bool>;
}

/// DynamoDB implementation of the UserRepository trait, keyed by username
pub struct DynamoDbUserRepository {
    client: Arc<DynamoDbClient>,
    ids: Arc<dyn IdSequence>,
    table_name: String,
    region: String,
}

impl DynamoDbUserRepository {
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

    /// Convert a User to DynamoDB attribute values
    pub fn user_to_item(&self, user: &User) -> Item {
        let mut item = HashMap::new();

        item.insert("username".to_string(), AttributeValue::S(user.username.clone()));
        item.insert("id".to_string(), AttributeValue::N(user.id.to_string()));
        item.insert("email".to_string(), AttributeValue::S(user.email.clone()));
        item.insert(
            "password_hash".to_string(),
            AttributeValue::S(user.password_hash.clone()),
        );
        item.insert(
            "first_name".to_string(),
            AttributeValue::S(user.first_name.clone()),
        );
        item.insert(
            "last_name".to_string(),
            AttributeValue::S(user.last_name.clone()),
        );
        item.insert(
            "date_joined".to_string(),
            AttributeValue::S(user.date_joined.to_rfc3339()),
        );

        item
    }

    /// Convert a DynamoDB item to a User
    pub fn item_to_user(&self, item: &Item) -> RepositoryResult<User> {
        let raw_joined = get_string(item, "date_joined")?;
        let date_joined = DateTime::parse_from_rfc3339(&raw_joined)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| RepositoryError::InvalidData {
                message: format!("Invalid date_joined: {}", raw_joined),
            })?;

        Ok(User {
            id: get_number(item, "id")?,
            username: get_string(item, "username")?,
            email: get_string(item, "email")?,
            password_hash: get_string(item, "password_hash")?,
            first_name: get_string(item, "first_name").unwrap_or_default(),
            last_name: get_string(item, "last_name").unwrap_or_default(),
            date_joined,
        })
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    #[instrument(skip(self, user), fields(table = %self.table_name, username = %user.username))]
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        info!("Creating new user");

        let id = self.ids.next_id(USER_SEQUENCE).await?;
        let user = User::from_new(id, user, Utc::now());
        let item = self.user_to_item(&user);

        let put_span = dynamodb_span("PutItem", &self.table_name, &self.region);

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(username)")
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(put_span)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict { .. } => RepositoryError::Conflict {
                message: format!("username {} is already taken", user.username),
            },
            other => other,
        })?;

        info!(user_id = user.id, "User created successfully");
        Ok(user)
    }

    #[instrument(skip(self), fields(table = %self.table_name, username = %username))]
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let get_span = dynamodb_span("GetItem", &self.table_name, &self.region);

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("username", AttributeValue::S(username.to_string()))
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(get_span)
        .await?;

        response.item.map(|item| self.item_to_user(&item)).transpose()
    }

    #[instrument(skip(self), fields(table = %self.table_name, username = %username))]
    async fn exists(&self, username: &str) -> RepositoryResult<bool> {
        let get_span = dynamodb_span("GetItem", &self.table_name, &self.region);

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("username", AttributeValue::S(username.to_string()))
                .projection_expression("username")
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(get_span)
        .await?;

        Ok(response.item.is_some())
    }
}
