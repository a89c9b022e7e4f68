//! Store service configuration.

use std::env;

use common::{AppError, AppResult};
use domain::CredentialGuard;

/// Default profile when `STORE_PROFILE` is unset
pub const DEFAULT_PROFILE: &str = "mock";

/// Store service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreServiceConfig {
    /// Profile token handed to the resolver
    pub profile: String,
    /// Argon2 memory cost in KiB, `None` for the library default
    pub hash_memory_kib: Option<u32>,
    pub hash_iterations: Option<u32>,
    pub hash_parallelism: Option<u32>,
}

impl StoreServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns `Config` if a hash cost variable is not a number.
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            profile: env::var("STORE_PROFILE").unwrap_or_else(|_| DEFAULT_PROFILE.to_string()),
            hash_memory_kib: parse_var("STORE_HASH_MEMORY_KIB")?,
            hash_iterations: parse_var("STORE_HASH_ITERATIONS")?,
            hash_parallelism: parse_var("STORE_HASH_PARALLELISM")?,
        })
    }

    /// Credential guard with the configured cost.
    ///
    /// Unset parameters fall back to the Argon2 defaults.
    pub fn credential_guard(&self) -> AppResult<CredentialGuard> {
        if self.hash_memory_kib.is_none()
            && self.hash_iterations.is_none()
            && self.hash_parallelism.is_none()
        {
            return Ok(CredentialGuard::new());
        }

        let guard = CredentialGuard::with_cost(
            self.hash_memory_kib
                .unwrap_or(CredentialGuard::DEFAULT_MEMORY_KIB),
            self.hash_iterations
                .unwrap_or(CredentialGuard::DEFAULT_ITERATIONS),
            self.hash_parallelism
                .unwrap_or(CredentialGuard::DEFAULT_PARALLELISM),
        )?;
        Ok(guard)
    }
}

fn parse_var(key: &str) -> AppResult<Option<u32>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::config(format!("{} is not a valid number: {}", key, raw))),
        Err(_) => Ok(None),
    }
}
