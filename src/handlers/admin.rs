use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::models::{CreateMenuItemRequest, MenuItem, ServiceError};
use crate::repositories::{TableManager, TableNames};
use crate::services::MenuService;

/// Admin state containing services
#[derive(Clone)]
pub struct AdminState {
    pub menu_service: Arc<MenuService>,
    /// Present only when running against DynamoDB
    pub table_manager: Option<Arc<TableManager>>,
    pub table_names: TableNames,
}

/// Response for seeding operations
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub message: String,
    pub menu_items_created: usize,
    pub timestamp: String,
}

/// Response for table setup operations
#[derive(Debug, Serialize)]
pub struct SetupTablesResponse {
    pub message: String,
    pub tables_created: Vec<String>,
    pub timestamp: String,
}

type AdminError = (StatusCode, Json<Value>);

fn admin_error(status: StatusCode, error: &str, message: String, timestamp: String) -> AdminError {
    (
        status,
        Json(json!({
            "error": error,
            "message": message,
            "timestamp": timestamp,
        })),
    )
}

/// Set up the required DynamoDB tables
#[instrument(name = "setup_tables", skip(state), fields(
    bookings_table = %state.table_names.bookings,
    menu_table = %state.table_names.menu,
))]
pub async fn setup_tables(
    State(state): State<AdminState>,
) -> Result<Json<SetupTablesResponse>, AdminError> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    let Some(table_manager) = state.table_manager.as_ref() else {
        info!("In-memory storage in use, no tables to create");
        return Ok(Json(SetupTablesResponse {
            message: "In-memory storage needs no tables".to_string(),
            tables_created: Vec::new(),
            timestamp,
        }));
    };

    info!("Setting up DynamoDB tables");

    match table_manager.create_all_tables(&state.table_names).await {
        Ok(tables_created) => {
            info!("Successfully created tables: {:?}", tables_created);

            Ok(Json(SetupTablesResponse {
                message: format!("Successfully created {} tables", tables_created.len()),
                tables_created,
                timestamp,
            }))
        }
        Err(err) => {
            error!("Failed to create tables: {}", err);
            Err(admin_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create tables",
                err.to_string(),
                timestamp,
            ))
        }
    }
}

/// Seed the sample Little Lemon menu if the menu is empty
#[instrument(name = "seed_database", skip(state), fields(
    menu_table = %state.table_names.menu,
))]
pub async fn seed_database(
    State(state): State<AdminState>,
) -> Result<Json<SeedResponse>, AdminError> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.menu_service.seed_sample_menu().await {
        Ok(0) => Ok(Json(SeedResponse {
            message: "Menu already populated, nothing seeded".to_string(),
            menu_items_created: 0,
            timestamp,
        })),
        Ok(created) => {
            info!("Seeded {} menu items", created);
            Ok(Json(SeedResponse {
                message: format!("Database seeded successfully with {} menu items", created),
                menu_items_created: created,
                timestamp,
            }))
        }
        Err(err) => {
            error!("Failed to seed database: {}", err);
            Err(admin_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to seed database",
                err.to_string(),
                timestamp,
            ))
        }
    }
}

/// Add a dish to the menu
#[instrument(name = "create_menu_item", skip(state, request))]
pub async fn create_menu_item(
    State(state): State<AdminState>,
    request: Result<Json<CreateMenuItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MenuItem>), AdminError> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    let Json(request) = request.map_err(|rejection| {
        warn!("Rejected menu item payload: {}", rejection);
        admin_error(
            StatusCode::BAD_REQUEST,
            "Invalid request body",
            rejection.body_text(),
            timestamp.clone(),
        )
    })?;

    match state.menu_service.create_menu_item(&request).await {
        Ok(item) => Ok((StatusCode::CREATED, Json(item))),
        Err(ServiceError::ValidationFailed { errors }) => {
            warn!("Menu item validation failed: {}", errors);
            Err((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Validation failed",
                    "fields": errors,
                    "timestamp": timestamp,
                })),
            ))
        }
        Err(err) => {
            error!("Failed to create menu item: {}", err);
            Err(admin_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create menu item",
                "Internal server error".to_string(),
                timestamp,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryStore;
    use rust_decimal_macros::dec;

    fn state() -> AdminState {
        AdminState {
            menu_service: Arc::new(MenuService::new(Arc::new(InMemoryStore::new()))),
            table_manager: None,
            table_names: TableNames {
                bookings: "Bookings".to_string(),
                menu: "Menu".to_string(),
                users: "Users".to_string(),
                counters: "Counters".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_setup_tables_is_noop_in_memory() {
        let Json(response) = setup_tables(State(state())).await.unwrap();
        assert!(response.tables_created.is_empty());
    }

    #[tokio::test]
    async fn test_seed_then_reseed() {
        let state = state();

        let Json(first) = seed_database(State(state.clone())).await.unwrap();
        assert_eq!(first.menu_items_created, 5);

        let Json(second) = seed_database(State(state)).await.unwrap();
        assert_eq!(second.menu_items_created, 0);
    }

    #[tokio::test]
    async fn test_create_menu_item() {
        let state = state();

        let (status, Json(item)) = create_menu_item(
            State(state.clone()),
            Ok(Json(CreateMenuItemRequest {
                name: "Lemon Chicken".to_string(),
                price: dec!(15.50),
                menu_item_description: "Roasted with lemon".to_string(),
            })),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item.id, 1);

        let (status, Json(body)) = create_menu_item(
            State(state),
            Ok(Json(CreateMenuItemRequest {
                name: String::new(),
                price: dec!(10.999),
                menu_item_description: String::new(),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["name"].is_array());
        assert!(body["fields"]["price"].is_array());
    }

    #[test]
    fn test_seed_response_serialization() {
        let response = SeedResponse {
            message: "Database seeded successfully".to_string(),
            menu_items_created: 5,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["menu_items_created"], 5);
    }
}
