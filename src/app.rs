use aws_sdk_dynamodb::Client as DynamoDbClient;
use axum::{
    middleware,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::handlers::{
    admin, auth, booking, health_check, metrics_handler, pages, request_validation_middleware,
    reservations, security_headers_middleware, AdminState, HtmlRenderer, PageRenderer,
    RequestLimits, ReservationState, SessionCookie, SiteState,
};
use crate::models::{PasswordPolicy, ServiceResult};
use crate::observability::{observability_middleware, BusinessTracingMiddleware, Metrics};
use crate::repositories::{
    BookingRepository, DynamoDbBookingRepository, DynamoDbIdSequence, DynamoDbMenuRepository,
    DynamoDbUserRepository, InMemoryStore, MenuRepository, TableManager, TableNames,
    UserRepository,
};
use crate::services::{
    AuthService, BcryptPasswordHasher, BookingService, InMemorySessionStore, MenuService,
    ReservationService,
};

/// The repositories one storage backend provides
#[derive(Clone)]
pub struct Storage {
    pub bookings: Arc<dyn BookingRepository>,
    pub menu: Arc<dyn MenuRepository>,
    pub users: Arc<dyn UserRepository>,
    /// Only DynamoDB has tables to manage
    pub table_manager: Option<Arc<TableManager>>,
}

impl Storage {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            bookings: store.clone(),
            menu: store.clone(),
            users: store,
            table_manager: None,
        }
    }

    pub fn dynamodb(client: Arc<DynamoDbClient>, names: &TableNames, region: &str) -> Self {
        let ids = Arc::new(DynamoDbIdSequence::new(
            client.clone(),
            names.counters.clone(),
            region.to_string(),
        ));

        Self {
            bookings: Arc::new(DynamoDbBookingRepository::new(
                client.clone(),
                ids.clone(),
                names.bookings.clone(),
                region.to_string(),
            )),
            menu: Arc::new(DynamoDbMenuRepository::new(
                client.clone(),
                ids.clone(),
                names.menu.clone(),
                region.to_string(),
            )),
            users: Arc::new(DynamoDbUserRepository::new(
                client.clone(),
                ids,
                names.users.clone(),
                region.to_string(),
            )),
            table_manager: Some(Arc::new(TableManager::new(client))),
        }
    }
}

/// Services shared by the router and the startup code
pub struct Services {
    pub booking: Arc<BookingService>,
    pub reservations: Arc<ReservationService>,
    pub menu: Arc<MenuService>,
    pub auth: Arc<AuthService>,
}

impl Services {
    pub fn new(config: &Config, storage: &Storage) -> ServiceResult<Self> {
        let hasher = Arc::new(BcryptPasswordHasher::new(config.auth.bcrypt_cost)?);
        let sessions = Arc::new(InMemorySessionStore::new(config.auth.session_ttl_seconds));

        Ok(Self {
            booking: Arc::new(BookingService::new(storage.bookings.clone())),
            reservations: Arc::new(ReservationService::new(storage.bookings.clone())),
            menu: Arc::new(MenuService::new(storage.menu.clone())),
            auth: Arc::new(AuthService::new(
                storage.users.clone(),
                storage.bookings.clone(),
                hasher,
                sessions,
                PasswordPolicy {
                    min_length: config.auth.min_password_length,
                },
            )),
        })
    }
}

/// Assemble the full router: pages, JSON endpoints, admin, health, metrics
pub fn create_app(
    config: &Config,
    storage: &Storage,
    services: &Services,
    metrics: Arc<Metrics>,
) -> Router {
    let business = Arc::new(BusinessTracingMiddleware::new(metrics.clone()));
    let renderer: Arc<dyn PageRenderer> = Arc::new(HtmlRenderer::new("Little Lemon"));

    let site_state = SiteState {
        booking_service: services.booking.clone(),
        menu_service: services.menu.clone(),
        auth_service: services.auth.clone(),
        renderer,
        business: business.clone(),
        session_cookie: SessionCookie::new(
            config.auth.session_cookie_name.clone(),
            config.auth.secure_cookies,
        ),
    };

    let reservation_state = ReservationState {
        reservation_service: services.reservations.clone(),
        business,
    };

    let admin_state = AdminState {
        menu_service: services.menu.clone(),
        table_manager: storage.table_manager.clone(),
        table_names: config.database.table_names(),
    };

    let limits = RequestLimits {
        max_request_size: config.server.max_request_size as u64,
    };
    let metrics_for_middleware = metrics.clone();

    // Answers every method itself, so it sits outside the content-type gate
    let reservations_router = Router::new()
        .route("/reservations_api", any(reservations::reservations_api))
        .with_state(reservation_state);

    let site = Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .route("/api/admin/setup-tables", post(admin::setup_tables))
        .route("/api/admin/seed", post(admin::seed_database))
        .route("/api/admin/menu", post(admin::create_menu_item))
        .with_state(admin_state)
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route("/menu", get(pages::menu))
        .route("/menu/:id", get(pages::menu_item))
        .route(
            "/book",
            get(booking::booking_page).post(booking::submit_booking),
        )
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/profile", get(auth::profile))
        .fallback(pages::not_found)
        .with_state(site_state)
        .layer(middleware::from_fn_with_state(
            limits,
            request_validation_middleware,
        ));

    reservations_router
        .merge(site)
        // Middleware layers, innermost first
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(RequestBodyLimitLayer::new(config.server.max_request_size))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        let storage = Storage::in_memory();
        let services = Services::new(&config, &storage).unwrap();
        create_app(
            &config,
            &storage,
            &services,
            Arc::new(Metrics::new().unwrap()),
        )
    }

    async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_pages_render() {
        for uri in ["/", "/about", "/menu", "/book", "/register", "/login"] {
            let (status, headers, body) = send(get(uri)).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);
            assert!(headers
                .get(header::CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/html"));
            assert!(body.starts_with("<!DOCTYPE html>"), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_pages_are_404() {
        for uri in ["/nowhere", "/menu/999", "/menu/abc"] {
            let (status, _, body) = send(get(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert!(body.contains("Page Not Found"));
        }
    }

    #[tokio::test]
    async fn test_profile_redirects_anonymous_visitors() {
        let (status, headers, _) = send(get("/profile")).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(
            headers.get(header::LOCATION).unwrap(),
            "/login?next=/profile"
        );
    }

    #[tokio::test]
    async fn test_booking_post() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/book")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "first_name=John&last_name=Doe&guest_number=4&reservation_date=2024-12-25&reservation_slot=19%3A00",
            ))
            .unwrap();

        let (status, _, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "message": "Booking successful!"})
        );
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let (status, _, body) = send(get("/health/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("healthy"));

        let (status, _, body) = send(get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("http_requests_in_flight"));
    }

    #[tokio::test]
    async fn test_reservations_refuse_any_post_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/reservations_api?date=2024-12-25")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("date=2024-12-25"))
            .unwrap();

        let (status, headers, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "message": "Only GET requests are supported"})
        );
    }

    #[tokio::test]
    async fn test_other_routes_keep_content_type_gate() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/book")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("first_name=John"))
            .unwrap();

        let (status, _, _) = send(request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_security_headers_on_every_response() {
        let (_, headers, _) = send(get("/nowhere")).await;
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    }
}
