//! Store profile resolution.
//!
//! Every deployment environment (profile) owns its own block of connection
//! settings. At startup exactly one profile is resolved into an immutable
//! [`StoreConfig`] which is then handed to everything that needs it.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Default number of connections opened at startup
pub const DEFAULT_POOL_INITIAL_SIZE: u32 = 8;

/// Default lower bound of the pool
pub const DEFAULT_POOL_MIN_SIZE: u32 = 5;

/// Default upper bound of the pool
pub const DEFAULT_POOL_MAX_SIZE: u32 = 20;

/// Default wait for a pooled connection, in milliseconds
pub const DEFAULT_CONN_TIMEOUT_MS: u64 = 2000;

/// Named deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Profile {
    Mock,
    Staging,
    Prod,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Mock, Profile::Staging, Profile::Prod];

    /// Environment variable infix for this profile's block
    pub fn env_key(&self) -> &'static str {
        match self {
            Profile::Mock => "MOCK",
            Profile::Staging => "STAGING",
            Profile::Prod => "PROD",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_key())
    }
}

impl FromStr for Profile {
    type Err = AppError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Profile::Mock),
            "staging" | "pg" => Ok(Profile::Staging),
            "prod" | "production" => Ok(Profile::Prod),
            other => Err(AppError::config(format!("Unknown profile: {}", other))),
        }
    }
}

/// Per-profile connection settings as loaded, before validation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProfileBlock {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub schema_dir: Option<String>,
}

impl fmt::Debug for ProfileBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileBlock")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("schema_dir", &self.schema_dir)
            .finish()
    }
}

/// Pool sizing shared by every profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub initial: u32,
    pub min: u32,
    pub max: u32,
    pub conn_timeout_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            initial: DEFAULT_POOL_INITIAL_SIZE,
            min: DEFAULT_POOL_MIN_SIZE,
            max: DEFAULT_POOL_MAX_SIZE,
            conn_timeout_ms: DEFAULT_CONN_TIMEOUT_MS,
        }
    }
}

impl PoolSettings {
    fn validate(&self) -> AppResult<()> {
        if self.max == 0 {
            return Err(AppError::config("pool max size must be at least 1"));
        }
        if self.min > self.initial || self.initial > self.max {
            return Err(AppError::config(format!(
                "pool sizes must satisfy min <= initial <= max (got {} / {} / {})",
                self.min, self.initial, self.max
            )));
        }
        if self.conn_timeout_ms == 0 {
            return Err(AppError::config("connection timeout must be positive"));
        }
        Ok(())
    }
}

/// Every profile block plus pool sizing, as loaded from the environment.
#[derive(Debug, Clone, Default)]
pub struct ProfileSettings {
    blocks: HashMap<Profile, ProfileBlock>,
    pool: PoolSettings,
}

impl ProfileSettings {
    /// Build settings directly (tests, embedded use).
    pub fn new(pool: PoolSettings) -> Self {
        Self {
            blocks: HashMap::new(),
            pool,
        }
    }

    /// Register the block for one profile.
    pub fn with_block(mut self, profile: Profile, block: ProfileBlock) -> Self {
        self.blocks.insert(profile, block);
        self
    }

    /// Load settings from environment variables (and `.env`).
    ///
    /// # Errors
    /// Returns `Config` if a pool variable is present but not a number.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Keys are `STORE_{PROFILE}_{FIELD}` for profile blocks and
    /// `STORE_POOL_*` / `STORE_CONN_TIMEOUT_MS` for pool sizing.
    ///
    /// # Errors
    /// Returns `Config` if a pool variable is present but not a number.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut blocks = HashMap::new();
        for profile in Profile::ALL {
            let field = |name: &str| {
                lookup(&format!("STORE_{}_{}", profile.env_key(), name))
                    .filter(|v| !v.trim().is_empty())
            };
            let block = ProfileBlock {
                url: field("URL"),
                host: field("HOST"),
                port: field("PORT"),
                username: field("USERNAME"),
                password: field("PASSWORD"),
                database: field("DATABASE"),
                schema_dir: field("SCHEMA_DIR"),
            };
            blocks.insert(profile, block);
        }

        let defaults = PoolSettings::default();
        let pool = PoolSettings {
            initial: parse_or(&lookup, "STORE_POOL_INITIAL_SIZE", defaults.initial)?,
            min: parse_or(&lookup, "STORE_POOL_MIN_SIZE", defaults.min)?,
            max: parse_or(&lookup, "STORE_POOL_MAX_SIZE", defaults.max)?,
            conn_timeout_ms: parse_or(&lookup, "STORE_CONN_TIMEOUT_MS", defaults.conn_timeout_ms)?,
        };

        Ok(Self { blocks, pool })
    }

    /// Materialize one profile's block into a validated store config.
    ///
    /// Pure data selection: nothing is connected or cached here.
    ///
    /// # Errors
    /// Returns `Config` if a required field is missing or malformed.
    pub fn select(&self, profile: Profile) -> AppResult<StoreConfig> {
        self.pool.validate()?;

        let block = self.blocks.get(&profile).cloned().unwrap_or_default();
        let required = |value: Option<String>, name: &str| {
            value.ok_or_else(|| {
                AppError::config(format!(
                    "missing STORE_{}_{} for profile {}",
                    profile.env_key(),
                    name,
                    profile
                ))
            })
        };

        let port_raw = required(block.port, "PORT")?;
        let port = port_raw.trim().parse::<u16>().map_err(|_| {
            AppError::config(format!("invalid port for profile {}: {}", profile, port_raw))
        })?;

        Ok(StoreConfig {
            profile,
            url: required(block.url, "URL")?,
            host: required(block.host, "HOST")?,
            port,
            username: required(block.username, "USERNAME")?,
            password: required(block.password, "PASSWORD")?,
            database: required(block.database, "DATABASE")?,
            schema_dir: block.schema_dir,
            pool_initial: self.pool.initial,
            pool_min: self.pool.min,
            pool_max: self.pool.max,
            conn_timeout_ms: self.pool.conn_timeout_ms,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{} is not a valid number: {}", key, raw))),
        None => Ok(default),
    }
}

/// The single active store configuration.
///
/// Immutable once resolved; share it by reference or clone.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub profile: Profile,
    pub url: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    password: String,
    pub database: String,
    pub schema_dir: Option<String>,
    pub pool_initial: u32,
    pub pool_min: u32,
    pub pool_max: u32,
    pub conn_timeout_ms: u64,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("profile", &self.profile)
            .field("url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("schema_dir", &self.schema_dir)
            .field("pool_initial", &self.pool_initial)
            .field("pool_min", &self.pool_min)
            .field("pool_max", &self.pool_max)
            .field("conn_timeout_ms", &self.conn_timeout_ms)
            .finish()
    }
}

impl StoreConfig {
    /// Store password (never logged)
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Wait bound for acquiring a pooled connection
    pub fn conn_timeout(&self) -> Duration {
        Duration::from_millis(self.conn_timeout_ms)
    }
}

/// Resolves the active profile exactly once.
#[derive(Debug)]
pub struct ProfileResolver {
    settings: ProfileSettings,
    active: OnceLock<StoreConfig>,
}

impl ProfileResolver {
    pub fn new(settings: ProfileSettings) -> Self {
        Self {
            settings,
            active: OnceLock::new(),
        }
    }

    /// Select the profile named by `token` and make it the active config.
    ///
    /// # Errors
    /// Returns `Config` for unknown tokens, incomplete profile blocks, or if a
    /// profile has already been resolved.
    pub fn resolve(&self, token: &str) -> AppResult<&StoreConfig> {
        let profile: Profile = token.parse()?;

        if let Some(existing) = self.active.get() {
            return Err(AppError::config(format!(
                "profile already resolved to {}",
                existing.profile
            )));
        }

        let config = self.settings.select(profile)?;
        self.active
            .set(config)
            .map_err(|_| AppError::config("profile resolved concurrently"))?;

        let active = self.active()?;
        tracing::info!(profile = %active.profile, database = %active.database, "Store profile resolved");
        Ok(active)
    }

    /// The resolved config.
    ///
    /// # Errors
    /// Returns `NotInitialized` before `resolve` has succeeded.
    pub fn active(&self) -> AppResult<&StoreConfig> {
        self.active.get().ok_or(AppError::NotInitialized)
    }
}
