#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use littlelemon_rs::{create_app, Config, Metrics, Services, Storage};
use reqwest::{redirect, Client, Response};
use serde_json::Value;
use tokio::net::TcpListener;

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub services: Arc<Services>,
    pub storage: Storage,
}

/// A client with its own cookie jar that never follows redirects
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to build client")
}

impl TestEnvironment {
    /// Serve the real router over in-memory storage on an ephemeral port
    pub async fn new() -> Self {
        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        config.server.request_timeout_seconds = 10;

        let storage = Storage::in_memory();
        let services = Services::new(&config, &storage).expect("Failed to build services");
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let app = create_app(&config, &storage, &services, metrics);
        let shared_storage = storage.clone();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            client: browser(),
            base_url,
            services: Arc::new(services),
            storage: shared_storage,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn book(&self, form: &[(&str, &str)]) -> Value {
        let response = self.post_form("/book", form).await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Failed to parse response")
    }

    pub async fn reservations(&self, query: &str) -> Value {
        let response = self.get(&format!("/reservations_api{}", query)).await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Failed to parse response")
    }

    pub async fn register(&self, username: &str, password: &str) -> Response {
        self.post_form(
            "/register",
            &[
                ("username", username),
                ("email", "test@example.com"),
                ("password1", password),
                ("password2", password),
            ],
        )
        .await
    }
}

pub fn john_doe_booking() -> Vec<(&'static str, &'static str)> {
    vec![
        ("first_name", "John"),
        ("last_name", "Doe"),
        ("guest_number", "4"),
        ("comment", "Window seat"),
        ("reservation_date", "2024-12-25"),
        ("reservation_slot", "19:00"),
    ]
}
