//! Bounded pool of store connections.
//!
//! Admission is controlled by a fair semaphore with one permit per connection.
//! A [`PoolHandle`] owns its permit, so the lease is returned on every exit
//! path: explicit release, early return, error or a dropped future.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use common::{AppError, AppResult, StoreConfig};

/// Shared connection pool. Cloning shares the same connections and permits.
#[derive(Clone)]
pub struct ConnectionPool {
    db: DatabaseConnection,
    permits: Arc<Semaphore>,
    max_size: u32,
    timeout: Duration,
}

/// Exclusive lease on one pooled connection.
#[derive(Debug)]
pub struct PoolHandle {
    db: DatabaseConnection,
    _permit: OwnedSemaphorePermit,
}

impl PoolHandle {
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Open a transaction on this lease.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        Ok(self.db.begin().await?)
    }
}

impl ConnectionPool {
    /// Open the pool described by `config` and pre-warm it.
    ///
    /// # Errors
    /// Returns `Database` if the store is unreachable.
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.pool_max)
            .min_connections(config.pool_min)
            .connect_timeout(config.conn_timeout())
            .acquire_timeout(config.conn_timeout())
            .sqlx_logging(false);

        let db = Database::connect(options).await?;
        let pool = Self::from_connection(db, config.pool_max, config.conn_timeout());
        pool.prewarm(config.pool_initial).await?;

        info!(
            profile = %config.profile,
            max = config.pool_max,
            initial = config.pool_initial,
            "Connection pool ready"
        );
        Ok(pool)
    }

    /// Wrap an already opened connection.
    pub fn from_connection(db: DatabaseConnection, max_size: u32, timeout: Duration) -> Self {
        Self {
            db,
            permits: Arc::new(Semaphore::new(max_size as usize)),
            max_size,
            timeout,
        }
    }

    /// Lease a connection, waiting at most the configured timeout.
    ///
    /// Waiting suspends the calling task only.
    ///
    /// # Errors
    /// Returns `PoolTimeout` when no lease frees up in time.
    pub async fn acquire(&self) -> AppResult<PoolHandle> {
        let waiting = self.permits.clone().acquire_owned();
        match tokio::time::timeout(self.timeout, waiting).await {
            Ok(Ok(permit)) => Ok(PoolHandle {
                db: self.db.clone(),
                _permit: permit,
            }),
            Ok(Err(_)) => Err(AppError::internal("connection pool closed")),
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(timeout_ms, max = self.max_size, "Connection pool exhausted");
                Err(AppError::PoolTimeout { timeout_ms })
            }
        }
    }

    /// Return a lease. Dropping the handle has the same effect.
    pub fn release(&self, handle: PoolHandle) {
        drop(handle);
    }

    /// Leases currently free
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Underlying connection, for migrations and bootstrap DDL.
    pub(crate) fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // Holds `count` connections open at the same time so the driver pool
    // grows to that size.
    async fn prewarm(&self, count: u32) -> AppResult<()> {
        let opened = try_join_all((0..count).map(|_| self.db.begin())).await?;
        for txn in opened {
            txn.rollback().await?;
        }
        debug!(count, "Pool pre-warmed");
        Ok(())
    }
}
