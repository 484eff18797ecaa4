use async_trait::async_trait;
use tracing::instrument;

use crate::models::{ServiceError, ServiceResult};

/// Hashes and checks account passwords
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> ServiceResult<String>;

    /// Constant-time comparison of `password` against a stored hash
    async fn verify(&self, password: &str, hash: &str) -> ServiceResult<bool>;

    /// Spend the same work as [`PasswordHasher::verify`] without a stored hash,
    /// so an unknown username costs as much as a wrong password.
    async fn verify_dummy(&self, password: &str) -> ServiceResult<()>;
}

/// Work factors bcrypt accepts
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// bcrypt-backed hasher. Hashing runs on the blocking thread pool.
pub struct BcryptPasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> ServiceResult<Self> {
        let dummy_hash = bcrypt::hash("littlelemon-dummy-password", cost).map_err(|e| {
            ServiceError::PasswordHashing {
                message: e.to_string(),
            }
        })?;

        Ok(Self { cost, dummy_hash })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

fn hashing_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::PasswordHashing {
        message: e.to_string(),
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    #[instrument(skip_all, fields(cost = self.cost))]
    async fn hash(&self, password: &str) -> ServiceResult<String> {
        let password = password.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(hashing_error)?
            .map_err(hashing_error)
    }

    #[instrument(skip_all)]
    async fn verify(&self, password: &str, hash: &str) -> ServiceResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(hashing_error)?
            .map_err(hashing_error)
    }

    #[instrument(skip_all)]
    async fn verify_dummy(&self, password: &str) -> ServiceResult<()> {
        self.verify(password, &self.dummy_hash).await.map(|_| ())
    }
}
