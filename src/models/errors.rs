use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use thiserror::Error;

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Form validation failed: {errors}")]
    ValidationFailed { errors: FieldErrors },

    #[error("The date {date} and time slot {slot} is already booked")]
    SlotAlreadyBooked { date: NaiveDate, slot: String },

    #[error("Please provide a date parameter")]
    MissingParameter,

    #[error("Invalid date format")]
    InvalidDate,

    #[error("Only GET requests are supported")]
    MethodNotSupported,

    #[error("Incorrect username or password.")]
    InvalidCredentials,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Menu item not found: {id}")]
    MenuItemNotFound { id: u64 },

    #[error("Password hashing error: {message}")]
    PasswordHashing { message: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },
}

impl ServiceError {
    /// Stable kind label, used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::ValidationFailed { .. } => "validation_failed",
            ServiceError::SlotAlreadyBooked { .. } => "slot_already_booked",
            ServiceError::MissingParameter => "missing_parameter",
            ServiceError::InvalidDate => "invalid_date",
            ServiceError::MethodNotSupported => "method_not_supported",
            ServiceError::InvalidCredentials => "invalid_credentials",
            ServiceError::AuthenticationRequired => "authentication_required",
            ServiceError::MenuItemNotFound { .. } => "menu_item_not_found",
            ServiceError::PasswordHashing { .. } => "password_hashing",
            ServiceError::Repository { .. } => "repository",
        }
    }

    /// Storage or hashing failures, as opposed to expected business outcomes
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ServiceError::Repository { .. } | ServiceError::PasswordHashing { .. }
        )
    }

    /// Field errors carried by a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ServiceError::ValidationFailed { errors } => Some(errors),
            _ => None,
        }
    }
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Uniqueness constraint violated: {message}")]
    Conflict { message: String },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Invalid stored data: {message}")]
    InvalidData { message: String },

    #[error("Operation not supported by the {backend} backend: {operation}")]
    Unsupported { backend: String, operation: String },
}

/// A single field-level validation failure.
///
/// The `Display` output is the human-readable message shown next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("This field is required.")]
    RequiredField { field: String },

    #[error("Enter a valid date.")]
    InvalidDate { field: String },

    #[error("Enter a whole number.")]
    InvalidInteger { field: String },

    #[error("Enter a valid email address.")]
    InvalidEmail { field: String },

    #[error("Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.")]
    InvalidUsername { field: String },

    #[error("A user with that username already exists.")]
    DuplicateUsername { field: String },

    #[error("The two password fields didn't match.")]
    PasswordMismatch { field: String },

    #[error("This password is too short. It must contain at least {min_length} characters.")]
    PasswordTooShort { field: String, min_length: usize },

    #[error("This password is entirely numeric.")]
    PasswordEntirelyNumeric { field: String },

    #[error("Ensure this value has at most {max_length} characters (it has {actual_length}).")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("Ensure this value is between {min} and {max}.")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    #[error("Ensure that there are no more than {max_places} decimal places.")]
    TooManyDecimalPlaces { field: String, max_places: u32 },
}

impl ValidationError {
    /// Name of the form field this error belongs to
    pub fn field(&self) -> &str {
        match self {
            ValidationError::RequiredField { field }
            | ValidationError::InvalidDate { field }
            | ValidationError::InvalidInteger { field }
            | ValidationError::InvalidEmail { field }
            | ValidationError::InvalidUsername { field }
            | ValidationError::DuplicateUsername { field }
            | ValidationError::PasswordMismatch { field }
            | ValidationError::PasswordTooShort { field, .. }
            | ValidationError::PasswordEntirelyNumeric { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::TooManyDecimalPlaces { field, .. } => field,
        }
    }
}

/// Mapping from field name to its error messages, in the order fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        let message = error.to_string();
        match self
            .entries
            .iter_mut()
            .find(|(field, _)| field == error.field())
        {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((error.field().to_string(), vec![message])),
        }
    }

    /// Append every message from `other`, keeping field order
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.entries {
            match self.entries.iter_mut().find(|(name, _)| *name == field) {
                Some((_, existing)) => existing.extend(messages),
                None => self.entries.push((field, messages)),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// `Ok(value)` when nothing was recorded, otherwise the collected errors
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for FieldErrors {
    fn from(err: ValidationError) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(err);
        errors
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, messages) in &self.entries {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        ServiceError::ValidationFailed { errors }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationFailed { errors: err.into() }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ServiceError::SlotAlreadyBooked {
            date: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
            slot: "19:00".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "The date 2024-12-25 and time slot 19:00 is already booked"
        );

        let validation_error = ValidationError::RequiredField {
            field: "first_name".to_string(),
        };
        assert_eq!(validation_error.to_string(), "This field is required.");
        assert_eq!(validation_error.field(), "first_name");
    }

    #[test]
    fn test_query_error_messages() {
        assert_eq!(
            ServiceError::MissingParameter.to_string(),
            "Please provide a date parameter"
        );
        assert_eq!(ServiceError::InvalidDate.to_string(), "Invalid date format");
        assert_eq!(
            ServiceError::MethodNotSupported.to_string(),
            "Only GET requests are supported"
        );
    }

    #[test]
    fn test_field_errors_group_by_field_in_order() {
        let mut errors = FieldErrors::new();
        errors.push(ValidationError::RequiredField {
            field: "first_name".to_string(),
        });
        errors.push(ValidationError::InvalidDate {
            field: "reservation_date".to_string(),
        });
        errors.push(ValidationError::TooLong {
            field: "first_name".to_string(),
            max_length: 3,
            actual_length: 5,
        });

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("first_name").unwrap().len(), 2);
        assert!(errors.contains("reservation_date"));
        assert!(!errors.contains("comment"));

        let fields: Vec<&str> = errors.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["first_name", "reservation_date"]);

        assert_eq!(
            errors.to_string(),
            "first_name: This field is required.; \
             first_name: Ensure this value has at most 3 characters (it has 5).; \
             reservation_date: Enter a valid date."
        );
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let errors: FieldErrors = ValidationError::PasswordMismatch {
            field: "password2".to_string(),
        }
        .into();

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"password2": ["The two password fields didn't match."]})
        );
    }

    #[test]
    fn test_error_conversion() {
        let validation_error = ValidationError::InvalidEmail {
            field: "email".to_string(),
        };

        let service_error: ServiceError = validation_error.into();
        match &service_error {
            ServiceError::ValidationFailed { errors } => {
                assert!(errors.contains("email"));
            }
            _ => panic!("Expected ValidationFailed conversion"),
        }
        assert_eq!(service_error.kind(), "validation_failed");
        assert!(service_error.field_errors().is_some());
    }

    #[test]
    fn test_repository_error_conversion() {
        let repo_error = RepositoryError::Conflict {
            message: "slot taken".to_string(),
        };
        let service_error: ServiceError = repo_error.into();
        assert_eq!(service_error.kind(), "repository");
        assert!(service_error.field_errors().is_none());
        assert!(service_error.is_internal());
        assert!(!ServiceError::InvalidCredentials.is_internal());
    }
}
