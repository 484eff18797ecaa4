use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage engines the service can run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    DynamoDb,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::DynamoDb => write!(f, "dynamodb"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "dynamodb" => Ok(StorageBackend::DynamoDb),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}
