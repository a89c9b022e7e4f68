//! Store Service Library
//!
//! Transactional data access for users and prescriptions: profile-selected
//! store configuration, a bounded connection pool, generic repositories,
//! transaction scopes and staged upserts with credential hashing.

pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::infra::{ConnectionPool, StoreSchema, TransactionCoordinator};
use crate::repository::EntityRepository;
use crate::service::{PrescriptionManager, UpsertOrchestrator, UserManager};
use common::{AppResult, ProfileResolver, StoreConfig};
use domain::{CredentialGuard, Prescription, User};

/// Opened store: pool, coordinator and schema.
///
/// Cloning shares the same pool.
#[derive(Clone)]
pub struct Persistence {
    config: StoreConfig,
    pool: ConnectionPool,
    coordinator: TransactionCoordinator,
}

impl Persistence {
    /// Open the store for the resolved profile.
    ///
    /// # Errors
    /// Returns `NotInitialized` when no profile has been resolved yet.
    pub async fn open(resolver: &ProfileResolver) -> AppResult<Self> {
        let config = resolver.active()?.clone();
        Self::open_with(config).await
    }

    /// Connect, migrate and apply the schema directory, if any.
    pub async fn open_with(config: StoreConfig) -> AppResult<Self> {
        let pool = ConnectionPool::connect(&config).await?;

        let schema = StoreSchema::new(pool.connection().clone());
        schema.run_migrations().await?;
        if let Some(dir) = config.schema_dir.as_deref() {
            schema.apply_schema_dir(Path::new(dir)).await?;
        }

        info!(profile = %config.profile, database = %config.database, "Store opened");
        Ok(Self {
            coordinator: TransactionCoordinator::new(pool.clone()),
            config,
            pool,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    pub fn repository<T: crate::repository::Persistable>(&self) -> EntityRepository<T> {
        EntityRepository::new(self.pool.clone())
    }

    /// User service hashing credentials with `guard`.
    pub fn users(&self, guard: CredentialGuard) -> UserManager {
        let repo: EntityRepository<User> = self.repository();
        let writes = UpsertOrchestrator::new(repo.clone(), self.coordinator.clone());
        UserManager::new(Arc::new(repo), writes, guard)
    }

    pub fn prescriptions(&self) -> PrescriptionManager {
        let repo: EntityRepository<Prescription> = self.repository();
        PrescriptionManager::new(UpsertOrchestrator::new(repo, self.coordinator.clone()))
    }

    /// Check store connectivity through the pool.
    pub async fn ping(&self) -> AppResult<()> {
        let handle = self.pool.acquire().await?;
        handle.connection().ping().await?;
        Ok(())
    }
}

/// Migration action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Run migrations (for CLI commands).
///
/// Returns each known migration with its applied flag for `Status`, and an
/// empty list otherwise.
pub async fn run_migrations(
    config: &StoreConfig,
    action: MigrateAction,
) -> AppResult<Vec<(String, bool)>> {
    let pool = ConnectionPool::connect(config).await?;
    let schema = StoreSchema::new(pool.connection().clone());

    match action {
        MigrateAction::Up => {
            schema.run_migrations().await?;
        }
        MigrateAction::Down => {
            schema.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => return Ok(schema.migration_status().await?),
        MigrateAction::Fresh => {
            schema.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(Vec::new())
}
