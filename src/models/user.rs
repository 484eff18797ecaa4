use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Booking;

/// A registered account.
///
/// Only the salted password hash is ever stored.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

/// A validated account that has not been assigned an id yet
#[derive(Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Raw registration submission
#[derive(Clone, Default, Deserialize)]
pub struct RegistrationForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
}

/// Registration input that passed syntactic validation
#[derive(Clone, PartialEq)]
pub struct ValidRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Raw login submission
#[derive(Clone, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// The authenticated principal attached to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: u64,
    pub username: String,
}

/// What the profile page shows for the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub username: String,
    pub email: String,
    pub bookings: Vec<Booking>,
}

impl User {
    pub fn from_new(id: u64, user: NewUser, date_joined: DateTime<Utc>) -> Self {
        Self {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            date_joined,
        }
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            user_id: self.id,
            username: self.username.clone(),
        }
    }

    /// Names used to look up this user's bookings.
    ///
    /// Bookings carry no owner reference, so the profile matches on guest name:
    /// the first name falls back to the username when blank, the last name to "".
    pub fn booking_name(&self) -> (String, String) {
        let first_name = if self.first_name.trim().is_empty() {
            self.username.clone()
        } else {
            self.first_name.clone()
        };
        (first_name, self.last_name.clone())
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("date_joined", &self.date_joined)
            .finish()
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password1", &"<redacted>")
            .field("password2", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for ValidRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidRegistration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user(first_name: &str, last_name: &str) -> User {
        User::from_new(
            3,
            NewUser {
                username: "testuser".to_string(),
                email: "test@example.com".to_string(),
                password_hash: "$2b$04$hash".to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_booking_name_prefers_profile_fields() {
        let user = create_test_user("John", "Doe");
        assert_eq!(
            user.booking_name(),
            ("John".to_string(), "Doe".to_string())
        );
    }

    #[test]
    fn test_booking_name_falls_back_to_username() {
        let user = create_test_user("  ", "");
        assert_eq!(
            user.booking_name(),
            ("testuser".to_string(), "".to_string())
        );
    }

    #[test]
    fn test_identity() {
        let user = create_test_user("", "");
        assert_eq!(
            user.identity(),
            UserIdentity {
                user_id: 3,
                username: "testuser".to_string()
            }
        );
    }

    #[test]
    fn test_secrets_are_not_exposed() {
        let user = create_test_user("", "");

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(!format!("{:?}", user).contains("$2b$"));

        let form = RegistrationForm {
            username: Some("testuser".to_string()),
            email: None,
            password1: Some("testpass123".to_string()),
            password2: Some("testpass123".to_string()),
        };
        assert!(!format!("{:?}", form).contains("testpass123"));
    }
}
