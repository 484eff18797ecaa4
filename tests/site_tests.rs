use serde_json::json;

mod common;
use common::*;

#[tokio::test]
async fn test_static_pages() {
    let env = TestEnvironment::new().await;

    for (path, marker) in [
        ("/", "Reserve a table"),
        ("/about", "<h1>About</h1>"),
        ("/book", "id=\"booking-form\""),
    ] {
        let response = env.get(path).await;
        assert_eq!(response.status().as_u16(), 200, "{}", path);
        assert_eq!(
            response.headers()["x-content-type-options"], "nosniff",
            "{}",
            path
        );
        let body = response.text().await.unwrap();
        assert!(body.contains(marker), "{} should contain {}", path, marker);
    }
}

#[tokio::test]
async fn test_menu_after_seeding() {
    let env = TestEnvironment::new().await;

    let body = env.get("/menu").await.text().await.unwrap();
    assert!(body.contains("The menu is being prepared."));

    let response = env
        .client
        .post(env.url("/api/admin/seed"))
        .send()
        .await
        .expect("Failed to seed");
    assert_eq!(response.status().as_u16(), 200);
    let seeded: serde_json::Value = response.json().await.unwrap();
    assert_eq!(seeded["menu_items_created"], 5);

    let body = env.get("/menu").await.text().await.unwrap();
    assert!(body.contains("Greek Salad"));
    assert!(body.contains("href=\"/menu/1\""));

    let response = env.get("/menu/1").await;
    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("<h1>Greek Salad</h1>"));
    assert!(body.contains("$12.99"));

    assert_eq!(env.get("/menu/42").await.status().as_u16(), 404);
    assert_eq!(env.get("/menu/salad").await.status().as_u16(), 404);
}

#[tokio::test]
async fn test_admin_menu_item_creation() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .post(env.url("/api/admin/menu"))
        .json(&json!({
            "name": "Lemon Chicken",
            "price": "15.50",
            "menu_item_description": "Roasted with lemon and herbs"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 201);
    let item: serde_json::Value = response.json().await.unwrap();
    assert_eq!(item["name"], "Lemon Chicken");

    let body = env
        .get(&format!("/menu/{}", item["id"]))
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Roasted with lemon and herbs"));

    let response = env
        .client
        .post(env.url("/api/admin/menu"))
        .json(&json!({"name": "", "price": "-1"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["fields"]["name"].is_array());
    assert!(body["fields"]["price"].is_array());
}

#[tokio::test]
async fn test_setup_tables_without_dynamodb() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .post(env.url("/api/admin/setup-tables"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["tables_created"], json!([]));
}

#[tokio::test]
async fn test_health_and_metrics() {
    let env = TestEnvironment::new().await;

    let health: serde_json::Value = env.get("/health/status").await.json().await.unwrap();
    assert_eq!(health["status"], "healthy");

    env.book(&john_doe_booking()).await;
    env.book(&john_doe_booking()).await;
    env.reservations("?date=nope").await;

    let metrics = env.get("/metrics").await.text().await.unwrap();
    assert!(metrics.contains("http_requests_total"));
    assert!(metrics.contains("endpoint=\"/book\""));
    assert!(metrics.contains("booking_operations_total"));
    assert!(metrics.contains("status=\"slot_already_booked\""));
    assert!(metrics.contains("status=\"invalid_date\""));
}

#[tokio::test]
async fn test_unsupported_content_type() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .post(env.url("/book"))
        .header("content-type", "text/xml")
        .body("<booking/>")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 415);
}
