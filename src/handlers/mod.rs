pub mod admin;
pub mod auth;
pub mod booking;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod pages;
pub mod render;
pub mod reservations;

pub use admin::AdminState;
pub use auth::SessionCookie;
pub use health::health_check;
pub use metrics::metrics_handler;
pub use middleware::{request_validation_middleware, security_headers_middleware, RequestLimits};
pub use pages::SiteState;
pub use render::{HtmlRenderer, Notice, Page, PageContext, PageRenderer};
pub use reservations::ReservationState;
