use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tracing::instrument;

use super::auth::SessionCookie;
use super::render::{Page, PageContext, PageRenderer};
use crate::models::ServiceError;
use crate::observability::BusinessTracingMiddleware;
use crate::services::{AuthService, BookingService, MenuService};

/// State shared by every route that renders HTML
#[derive(Clone)]
pub struct SiteState {
    pub booking_service: Arc<BookingService>,
    pub menu_service: Arc<MenuService>,
    pub auth_service: Arc<AuthService>,
    pub renderer: Arc<dyn PageRenderer>,
    pub business: Arc<BusinessTracingMiddleware>,
    pub session_cookie: SessionCookie,
}

impl SiteState {
    /// Layout context for the current request, resolving the session cookie
    pub async fn context(&self, jar: &CookieJar) -> PageContext {
        let token = self.session_cookie.token(jar);
        PageContext::new(self.auth_service.authenticate(token.as_deref()).await)
    }

    pub fn render(&self, status: StatusCode, page: &Page, context: &PageContext) -> Response {
        (status, Html(self.renderer.render(page, context))).into_response()
    }

    pub fn ok(&self, page: &Page, context: &PageContext) -> Response {
        self.render(StatusCode::OK, page, context)
    }

    /// Generic 500 page; the error itself only goes to the log
    pub fn server_error(&self, error: &ServiceError, context: &PageContext) -> Response {
        crate::error_with_trace!(error = %error, kind = error.kind(), "Request failed");
        self.render(StatusCode::INTERNAL_SERVER_ERROR, &Page::ServerError, context)
    }
}

#[instrument(name = "home", skip_all)]
pub async fn home(State(state): State<SiteState>, jar: CookieJar) -> Response {
    let context = state.context(&jar).await;
    state.ok(&Page::Home, &context)
}

#[instrument(name = "about", skip_all)]
pub async fn about(State(state): State<SiteState>, jar: CookieJar) -> Response {
    let context = state.context(&jar).await;
    state.ok(&Page::About, &context)
}

/// Every menu item, in id order
#[instrument(name = "menu", skip_all)]
pub async fn menu(State(state): State<SiteState>, jar: CookieJar) -> Response {
    let context = state.context(&jar).await;
    match state.menu_service.list_menu().await {
        Ok(items) => state.ok(&Page::Menu { items }, &context),
        Err(e) => state.server_error(&e, &context),
    }
}

/// A single menu item; ids that are unknown or not numeric are a 404
#[instrument(name = "menu_item", skip(state, jar))]
pub async fn menu_item(
    State(state): State<SiteState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let context = state.context(&jar).await;
    let Ok(id) = id.parse::<u64>() else {
        return state.render(StatusCode::NOT_FOUND, &Page::NotFound, &context);
    };

    match state.menu_service.get_menu_item(id).await {
        Ok(item) => state.ok(&Page::MenuItem { item }, &context),
        Err(ServiceError::MenuItemNotFound { .. }) => {
            state.render(StatusCode::NOT_FOUND, &Page::NotFound, &context)
        }
        Err(e) => state.server_error(&e, &context),
    }
}

/// Router fallback
pub async fn not_found(State(state): State<SiteState>, jar: CookieJar) -> Response {
    let context = state.context(&jar).await;
    state.render(StatusCode::NOT_FOUND, &Page::NotFound, &context)
}
