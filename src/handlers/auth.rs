use axum::{
    extract::{rejection::FormRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::instrument;

use super::pages::SiteState;
use super::render::{Notice, Page};
use crate::models::{FieldErrors, LoginForm, RegistrationForm, ServiceError};

pub const REGISTRATION_FAILED: &str = "Registration failed, please check your information.";
pub const LOGIN_REQUIRED: &str = "Please log in to see this page.";

/// Where the session token lives on the client
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    secure: bool,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, secure: bool) -> Self {
        Self {
            name: name.into(),
            secure,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.name)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    }

    fn issue(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    fn clear(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), "")).path("/").build()
    }
}

/// 302 to a local path, carrying any cookie changes
fn found(jar: CookieJar, location: &'static str) -> Response {
    (StatusCode::FOUND, jar, [(header::LOCATION, location)]).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[instrument(name = "register_page", skip_all)]
pub async fn register_page(State(state): State<SiteState>, jar: CookieJar) -> Response {
    let context = state.context(&jar).await;
    let page = Page::Register {
        username: String::new(),
        email: String::new(),
        errors: FieldErrors::new(),
    };
    state.ok(&page, &context)
}

/// Create the account, sign it in and go home; re-render the form on failure
#[instrument(name = "register", skip_all)]
pub async fn register(
    State(state): State<SiteState>,
    jar: CookieJar,
    form: Result<Form<RegistrationForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let previous = state.session_cookie.token(&jar);

    let result = state
        .business
        .trace_auth_operation("register", state.auth_service.register(&form))
        .await;

    match result {
        Ok(session) => {
            if let Some(previous) = previous {
                let _ = state.auth_service.logout(Some(&previous)).await;
            }
            let jar = jar.add(state.session_cookie.issue(session.token));
            found(jar, "/")
        }
        Err(ServiceError::ValidationFailed { errors }) => {
            let context = state
                .context(&jar)
                .await
                .with_notice(Notice::Error(REGISTRATION_FAILED.to_string()));
            let page = Page::Register {
                username: form.username.unwrap_or_default(),
                email: form.email.unwrap_or_default(),
                errors,
            };
            state.ok(&page, &context)
        }
        Err(e) => {
            let context = state.context(&jar).await;
            state.server_error(&e, &context)
        }
    }
}

#[instrument(name = "login_page", skip_all)]
pub async fn login_page(
    State(state): State<SiteState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Response {
    let mut context = state.context(&jar).await;
    if query.next.is_some() {
        context = context.with_notice(Notice::Info(LOGIN_REQUIRED.to_string()));
    }
    state.ok(
        &Page::Login {
            username: String::new(),
        },
        &context,
    )
}

/// Check credentials; success replaces any previous session and goes home
#[instrument(name = "login", skip_all)]
pub async fn login(
    State(state): State<SiteState>,
    jar: CookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let previous = state.session_cookie.token(&jar);

    let result = state
        .business
        .trace_auth_operation("login", state.auth_service.login(&form))
        .await;

    match result {
        Ok(session) => {
            if let Some(previous) = previous {
                let _ = state.auth_service.logout(Some(&previous)).await;
            }
            let jar = jar.add(state.session_cookie.issue(session.token));
            found(jar, "/")
        }
        Err(ServiceError::InvalidCredentials) => {
            let context = state
                .context(&jar)
                .await
                .with_notice(Notice::Error(ServiceError::InvalidCredentials.to_string()));
            let page = Page::Login {
                username: form.username.unwrap_or_default(),
            };
            state.ok(&page, &context)
        }
        Err(e) => {
            let context = state.context(&jar).await;
            state.server_error(&e, &context)
        }
    }
}

#[instrument(name = "logout", skip_all)]
pub async fn logout(State(state): State<SiteState>, jar: CookieJar) -> Response {
    let token = state.session_cookie.token(&jar);
    let _ = state
        .business
        .trace_auth_operation("logout", state.auth_service.logout(token.as_deref()))
        .await;

    let jar = jar.remove(state.session_cookie.clear());
    found(jar, "/")
}

/// The signed-in user's bookings; anonymous visitors are sent to the login page
#[instrument(name = "profile", skip_all)]
pub async fn profile(State(state): State<SiteState>, jar: CookieJar) -> Response {
    let token = state.session_cookie.token(&jar);
    match state.auth_service.current_profile(token.as_deref()).await {
        Ok(profile) => {
            let context = state.context(&jar).await;
            state.ok(&Page::Profile { profile }, &context)
        }
        Err(ServiceError::AuthenticationRequired) => found(jar, "/login?next=/profile"),
        Err(e) => {
            let context = state.context(&jar).await;
            state.server_error(&e, &context)
        }
    }
}
