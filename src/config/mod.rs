use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::StorageBackend;
use crate::repositories::TableNames;
use crate::services::{MAX_BCRYPT_COST, MAX_SESSION_TTL_SECONDS, MIN_BCRYPT_COST};

/// Prefix of every environment variable the service reads
pub const ENV_PREFIX: &str = "LITTLELEMON";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub observability: ObservabilityConfig,
    /// Built only for the DynamoDB backend
    pub aws: Option<AwsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub storage_backend: StorageBackend,
    #[serde(default = "default_bookings_table")]
    pub bookings_table_name: String,
    #[serde(default = "default_menu_table")]
    pub menu_table_name: String,
    #[serde(default = "default_users_table")]
    pub users_table_name: String,
    #[serde(default = "default_counters_table")]
    pub counters_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_true")]
    pub seed_menu_on_start: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub dynamodb_client: DynamoDbClient,
}

/// Deserialize one configuration section from a prefixed environment source
fn load_section<T: DeserializeOwned>(
    source: config::Environment,
    section: &str,
) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(source)
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        message: message.into(),
    }
}

impl Config {
    pub async fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let mut config = Self::from_source(environment)?;

        if config.database.storage_backend == StorageBackend::DynamoDb {
            let aws_config = aws_config::defaults(BehaviorVersion::latest())
                .region(aws_config::Region::new(config.database.region.clone()))
                .load()
                .await;

            config.aws = Some(AwsConfig {
                region: config.database.region.clone(),
                dynamodb_client: DynamoDbClient::new(&aws_config),
            });
        }

        info!(
            storage_backend = %config.database.storage_backend,
            "Configuration loaded successfully"
        );
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    /// Load and validate every section without touching AWS.
    ///
    /// `source` is called once per section so tests can inject a fixed map.
    pub fn from_source<F>(source: F) -> Result<Self, ConfigError>
    where
        F: Fn() -> config::Environment,
    {
        let config = Config {
            server: load_section(source(), "server")?,
            database: load_section(source(), "database")?,
            auth: load_section(source(), "auth")?,
            observability: load_section(source(), "observability")?,
            aws: None,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(invalid("Request timeout cannot be 0"));
        }

        if self.server.max_request_size == 0 {
            return Err(invalid("Maximum request size cannot be 0"));
        }

        for (name, value) in [
            ("Bookings", &self.database.bookings_table_name),
            ("Menu", &self.database.menu_table_name),
            ("Users", &self.database.users_table_name),
            ("Counters", &self.database.counters_table_name),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("{} table name cannot be empty", name)));
            }
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.auth.bcrypt_cost) {
            return Err(invalid(format!(
                "bcrypt cost must be between {} and {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }

        if self.auth.session_ttl_seconds == 0 {
            return Err(invalid("Session TTL cannot be 0"));
        }

        if self.auth.session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(invalid(format!(
                "Session TTL cannot exceed {} seconds",
                MAX_SESSION_TTL_SECONDS
            )));
        }

        if self.auth.session_cookie_name.trim().is_empty() {
            return Err(invalid("Session cookie name cannot be empty"));
        }

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section(environment(), "server")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section(environment(), "database")
    }

    pub fn table_names(&self) -> TableNames {
        TableNames {
            bookings: self.bookings_table_name.clone(),
            menu: self.menu_table_name.clone(),
            users: self.users_table_name.clone(),
            counters: self.counters_table_name.clone(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section(environment(), "auth")
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section(environment(), "observability")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_timeout(),
            max_request_size: default_max_request_size(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::default(),
            bookings_table_name: default_bookings_table(),
            menu_table_name: default_menu_table(),
            users_table_name: default_users_table(),
            counters_table_name: default_counters_table(),
            region: default_region(),
            seed_menu_on_start: default_true(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: default_session_cookie_name(),
            session_ttl_seconds: default_session_ttl(),
            secure_cookies: false,
            bcrypt_cost: default_bcrypt_cost(),
            min_password_length: default_min_password_length(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            service_version: default_service_version(),
            otlp_endpoint: None,
            log_level: default_log_level(),
            enable_json_logging: false,
        }
    }
}

/// Built-in defaults with in-memory storage
impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
            aws: None,
        }
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8000
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_bookings_table() -> String {
    "LittleLemonBookings".to_string()
}

pub(crate) fn default_menu_table() -> String {
    "LittleLemonMenu".to_string()
}

pub(crate) fn default_users_table() -> String {
    "LittleLemonUsers".to_string()
}

pub(crate) fn default_counters_table() -> String {
    "LittleLemonCounters".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_session_cookie_name() -> String {
    "littlelemon_session".to_string()
}

pub(crate) fn default_session_ttl() -> u64 {
    14 * 24 * 60 * 60
}

pub(crate) fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

pub(crate) fn default_min_password_length() -> usize {
    crate::models::DEFAULT_MIN_PASSWORD_LENGTH
}

pub(crate) fn default_service_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
