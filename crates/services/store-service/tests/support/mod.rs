//! Shared fixtures: a throwaway SQLite store per test.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use tempfile::TempDir;

use common::{Profile, ProfileSettings, StoreConfig};
use domain::CredentialGuard;
use store_service_lib::Persistence;

/// Opened store plus the directory backing it.
pub struct TestStore {
    pub store: Persistence,
    _dir: TempDir,
}

impl std::ops::Deref for TestStore {
    type Target = Persistence;

    fn deref(&self) -> &Persistence {
        &self.store
    }
}

/// Environment for the MOCK profile pointing at `dir`.
pub fn mock_env(dir: &Path) -> HashMap<String, String> {
    let url = format!("sqlite://{}?mode=rwc", dir.join("mock.db").display());
    [
        ("STORE_MOCK_URL", url.as_str()),
        ("STORE_MOCK_HOST", "localhost"),
        ("STORE_MOCK_PORT", "0"),
        ("STORE_MOCK_USERNAME", "test"),
        ("STORE_MOCK_PASSWORD", "test"),
        ("STORE_MOCK_DATABASE", "mock"),
        ("STORE_POOL_INITIAL_SIZE", "2"),
        ("STORE_POOL_MIN_SIZE", "1"),
        ("STORE_POOL_MAX_SIZE", "4"),
        ("STORE_CONN_TIMEOUT_MS", "2000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn settings(vars: HashMap<String, String>) -> ProfileSettings {
    ProfileSettings::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub fn mock_config(dir: &Path, overrides: &[(&str, &str)]) -> StoreConfig {
    let mut vars = mock_env(dir);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    settings(vars).select(Profile::Mock).unwrap()
}

pub async fn open_store() -> TestStore {
    open_store_with(&[]).await
}

pub async fn open_store_with(overrides: &[(&str, &str)]) -> TestStore {
    let dir = tempfile::tempdir().unwrap();
    let config = mock_config(dir.path(), overrides);
    let store = Persistence::open_with(config).await.unwrap();
    TestStore { store, _dir: dir }
}

/// Cheap hashing for tests
pub fn fast_guard() -> CredentialGuard {
    CredentialGuard::with_cost(1024, 1, 1).unwrap()
}
