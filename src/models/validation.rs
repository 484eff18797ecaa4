use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

use super::{
    BookingForm, CreateMenuItemRequest, FieldErrors, NewBooking, NewMenuItem, RegistrationForm,
    ValidRegistration, ValidationError, ValidationResult, DEFAULT_COMMENT, DEFAULT_GUEST_NUMBER,
    DEFAULT_LAST_NAME, RESERVATION_DATE_FORMAT,
};

/// Trait for turning raw input into a typed, normalized value.
///
/// Failures are collected per field rather than stopping at the first one.
pub trait Validate {
    type Output;

    fn validate(&self) -> Result<Self::Output, FieldErrors>;
}

/// Validation constants
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_MENU_NAME_LENGTH: usize = 200;
pub const MAX_MENU_DESCRIPTION_LENGTH: usize = 1000;
pub const MIN_MENU_PRICE: Decimal = Decimal::ZERO;
pub const MAX_MENU_PRICE: Decimal = Decimal::from_parts(999999, 0, 0, false, 2); // 9999.99
pub const MAX_PRICE_DECIMAL_PLACES: u32 = 2;

fn username_regex() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("username regex is valid"))
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
            .expect("email regex is valid")
    })
}

/// Trimmed value of an optional field, `None` when absent or blank
fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &str) -> ValidationResult<&'a str> {
    non_blank(value).ok_or_else(|| ValidationError::RequiredField {
        field: field.to_string(),
    })
}

impl Validate for BookingForm {
    type Output = NewBooking;

    fn validate(&self) -> Result<NewBooking, FieldErrors> {
        let mut errors = FieldErrors::new();

        let first_name = required(&self.first_name, "first_name")
            .map_err(|e| errors.push(e))
            .ok();

        let last_name = non_blank(&self.last_name).unwrap_or(DEFAULT_LAST_NAME);

        let guest_number = match non_blank(&self.guest_number) {
            None => Some(DEFAULT_GUEST_NUMBER),
            Some(raw) => parse_guest_number(raw).map_err(|e| errors.push(e)).ok(),
        };

        let comment = non_blank(&self.comment).unwrap_or(DEFAULT_COMMENT);

        let reservation_date = required(&self.reservation_date, "reservation_date")
            .and_then(|raw| {
                parse_reservation_date(raw).map_err(|_| ValidationError::InvalidDate {
                    field: "reservation_date".to_string(),
                })
            })
            .map_err(|e| errors.push(e))
            .ok();

        let reservation_slot = required(&self.reservation_slot, "reservation_slot")
            .map_err(|e| errors.push(e))
            .ok();

        match (first_name, guest_number, reservation_date, reservation_slot) {
            (Some(first_name), Some(guest_number), Some(reservation_date), Some(slot))
                if errors.is_empty() =>
            {
                Ok(NewBooking {
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                    guest_number,
                    comment: comment.to_string(),
                    reservation_date,
                    reservation_slot: slot.to_string(),
                })
            }
            _ => Err(errors),
        }
    }
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_reservation_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), RESERVATION_DATE_FORMAT)
}

/// Parse the party size. Any integer is accepted, there is no minimum.
pub fn parse_guest_number(raw: &str) -> ValidationResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidInteger {
            field: "guest_number".to_string(),
        })
}

/// Password rules applied at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }
}

impl RegistrationForm {
    /// Syntactic registration checks. Username uniqueness needs the data store
    /// and is checked by the auth service.
    pub fn validate_with(&self, policy: &PasswordPolicy) -> Result<ValidRegistration, FieldErrors> {
        let mut errors = FieldErrors::new();

        let username = required(&self.username, "username")
            .and_then(validate_username)
            .map_err(|e| errors.push(e))
            .ok();

        let email = required(&self.email, "email")
            .and_then(validate_email)
            .map_err(|e| errors.push(e))
            .ok();

        // Passwords are compared verbatim, never trimmed
        let password1 = self.password1.as_deref().filter(|p| !p.is_empty());
        let password2 = self.password2.as_deref().filter(|p| !p.is_empty());
        if password1.is_none() {
            errors.push(ValidationError::RequiredField {
                field: "password1".to_string(),
            });
        }
        if password2.is_none() {
            errors.push(ValidationError::RequiredField {
                field: "password2".to_string(),
            });
        }

        let password = match (password1, password2) {
            (Some(p1), Some(p2)) if p1 != p2 => {
                errors.push(ValidationError::PasswordMismatch {
                    field: "password2".to_string(),
                });
                None
            }
            (Some(p1), Some(_)) => {
                let violations = validate_password_strength(p1, policy);
                let ok = violations.is_empty();
                for violation in violations {
                    errors.push(violation);
                }
                ok.then_some(p1)
            }
            _ => None,
        };

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if errors.is_empty() => {
                Ok(ValidRegistration {
                    username: username.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                })
            }
            _ => Err(errors),
        }
    }
}

impl Validate for RegistrationForm {
    type Output = ValidRegistration;

    fn validate(&self) -> Result<ValidRegistration, FieldErrors> {
        self.validate_with(&PasswordPolicy::default())
    }
}

impl Validate for CreateMenuItemRequest {
    type Output = NewMenuItem;

    fn validate(&self) -> Result<NewMenuItem, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim();
        if let Err(e) = validate_menu_name(name) {
            errors.push(e);
        }
        if let Err(e) = validate_menu_price(&self.price) {
            errors.push(e);
        }
        let description = self.menu_item_description.trim();
        if let Err(e) = validate_menu_description(description) {
            errors.push(e);
        }

        errors.into_result(NewMenuItem {
            name: name.to_string(),
            price: self.price,
            menu_item_description: description.to_string(),
        })
    }
}

/// Validate username syntax
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    let length = username.chars().count();
    if length > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max_length: MAX_USERNAME_LENGTH,
            actual_length: length,
        });
    }

    if !username_regex().is_match(username) {
        return Err(ValidationError::InvalidUsername {
            field: "username".to_string(),
        });
    }

    Ok(username)
}

/// Validate email syntax
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.len() > MAX_EMAIL_LENGTH || !email_regex().is_match(email) {
        return Err(ValidationError::InvalidEmail {
            field: "email".to_string(),
        });
    }

    Ok(email)
}

/// Every password rule the candidate breaks, reported against `password2`
pub fn validate_password_strength(password: &str, policy: &PasswordPolicy) -> Vec<ValidationError> {
    let mut violations = Vec::new();

    if password.chars().count() < policy.min_length {
        violations.push(ValidationError::PasswordTooShort {
            field: "password2".to_string(),
            min_length: policy.min_length,
        });
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        violations.push(ValidationError::PasswordEntirelyNumeric {
            field: "password2".to_string(),
        });
    }

    violations
}

/// Validate menu item name
pub fn validate_menu_name(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "name".to_string(),
        });
    }

    let length = name.chars().count();
    if length > MAX_MENU_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max_length: MAX_MENU_NAME_LENGTH,
            actual_length: length,
        });
    }

    Ok(())
}

/// Validate menu item price
pub fn validate_menu_price(price: &Decimal) -> ValidationResult<()> {
    if *price < MIN_MENU_PRICE || *price > MAX_MENU_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: MIN_MENU_PRICE.to_string(),
            max: MAX_MENU_PRICE.to_string(),
        });
    }

    if price.normalize().scale() > MAX_PRICE_DECIMAL_PLACES {
        return Err(ValidationError::TooManyDecimalPlaces {
            field: "price".to_string(),
            max_places: MAX_PRICE_DECIMAL_PLACES,
        });
    }

    Ok(())
}

/// Validate menu item description
pub fn validate_menu_description(description: &str) -> ValidationResult<()> {
    let length = description.chars().count();
    if length > MAX_MENU_DESCRIPTION_LENGTH {
        return Err(ValidationError::TooLong {
            field: "menu_item_description".to_string(),
            max_length: MAX_MENU_DESCRIPTION_LENGTH,
            actual_length: length,
        });
    }

    Ok(())
}
