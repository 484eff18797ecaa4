use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    validate_username, FieldErrors, LoginForm, NewUser, PasswordPolicy, Profile, RegistrationForm,
    RepositoryError, ServiceError, ServiceResult, UserIdentity, ValidationError,
};
use crate::repositories::{BookingRepository, UserRepository};
use crate::services::{PasswordHasher, SessionStore};

/// A freshly established session and who it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub token: String,
    pub identity: UserIdentity,
}

/// Account registration, credential checks and session lifecycle
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    bookings: Arc<dyn BookingRepository>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: Arc<dyn SessionStore>,
    policy: PasswordPolicy,
}

fn duplicate_username() -> ValidationError {
    ValidationError::DuplicateUsername {
        field: "username".to_string(),
    }
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        bookings: Arc<dyn BookingRepository>,
        hasher: Arc<dyn PasswordHasher>,
        sessions: Arc<dyn SessionStore>,
        policy: PasswordPolicy,
    ) -> Self {
        Self {
            users,
            bookings,
            hasher,
            sessions,
            policy,
        }
    }

    /// Create an account and sign it in.
    ///
    /// All field problems are reported together, including a taken username.
    /// Nothing is stored and no session starts on failure.
    #[instrument(skip_all)]
    pub async fn register(&self, form: &RegistrationForm) -> ServiceResult<AuthenticatedSession> {
        let validated = form.validate_with(&self.policy);

        let candidate = form
            .username
            .as_deref()
            .map(str::trim)
            .filter(|username| validate_username(username).is_ok());
        let mut errors = FieldErrors::new();
        if let Some(username) = candidate {
            if self.users.exists(username).await? {
                errors.push(duplicate_username());
            }
        }

        let registration = match validated {
            Ok(registration) if errors.is_empty() => registration,
            Ok(_) => return Err(errors.into()),
            Err(field_errors) => {
                errors.merge(field_errors);
                return Err(errors.into());
            }
        };

        let password_hash = self.hasher.hash(&registration.password).await?;
        let user = self
            .users
            .create(NewUser {
                username: registration.username,
                email: registration.email,
                password_hash,
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict { .. } => ServiceError::from(duplicate_username()),
                other => other.into(),
            })?;

        let identity = user.identity();
        let token = self.sessions.create(identity.clone()).await;

        crate::info_with_trace!(user_id = user.id, "Account registered");
        Ok(AuthenticatedSession { token, identity })
    }

    /// Check credentials and start a session.
    ///
    /// Unknown usernames and wrong passwords fail identically, and both pay
    /// for one hash verification.
    #[instrument(skip_all)]
    pub async fn login(&self, form: &LoginForm) -> ServiceResult<AuthenticatedSession> {
        let username = form.username.as_deref().map(str::trim).unwrap_or("");
        let password = form.password.as_deref().unwrap_or("");
        if username.is_empty() || password.is_empty() {
            return Err(ServiceError::InvalidCredentials);
        }

        let user = match self.users.find_by_username(username).await? {
            Some(user) => user,
            None => {
                self.hasher.verify_dummy(password).await?;
                return Err(ServiceError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            return Err(ServiceError::InvalidCredentials);
        }

        let identity = user.identity();
        let token = self.sessions.create(identity.clone()).await;

        crate::info_with_trace!(user_id = user.id, "User logged in");
        Ok(AuthenticatedSession { token, identity })
    }

    /// End the session; a missing or unknown token is not an error
    #[instrument(skip_all)]
    pub async fn logout(&self, token: Option<&str>) -> ServiceResult<()> {
        if let Some(token) = token {
            self.sessions.destroy(token).await;
        }
        Ok(())
    }

    /// The signed-in principal for a session token, if the session is live
    pub async fn authenticate(&self, token: Option<&str>) -> Option<UserIdentity> {
        let token = token?;
        self.sessions.get(token).await.map(|session| session.identity)
    }

    /// Profile page data for the session's user.
    ///
    /// Bookings are matched by guest name, not by owner, so another guest
    /// with the same name shows up here too.
    #[instrument(skip_all)]
    pub async fn current_profile(&self, token: Option<&str>) -> ServiceResult<Profile> {
        let identity = self
            .authenticate(token)
            .await
            .ok_or(ServiceError::AuthenticationRequired)?;

        let user = self
            .users
            .find_by_username(&identity.username)
            .await?
            .ok_or(ServiceError::AuthenticationRequired)?;

        let (first_name, last_name) = user.booking_name();
        let bookings = self
            .bookings
            .find_by_guest_name(&first_name, &last_name)
            .await?;

        Ok(Profile {
            username: user.username,
            email: user.email,
            bookings,
        })
    }
}
