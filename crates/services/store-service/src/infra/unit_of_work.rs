//! Transaction scopes over pooled connections.
//!
//! A [`TransactionScope`] owns one pool lease and the transaction opened on
//! it. It is handed to the caller's closure by reference, so every step in the
//! scope runs on the same connection, and it is consumed when the coordinator
//! commits or rolls back. No transaction state lives in thread or task locals;
//! the task-local marker below only detects nesting.

use std::sync::OnceLock;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{DatabaseTransaction, DbErr};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::pool::{ConnectionPool, PoolHandle};
use crate::repository::{Persistable, ScopedRepository};
use common::{AppError, AppResult};
use domain::{Prescription, User};

tokio::task_local! {
    static SCOPE_OPEN: ();
}

/// Opens and completes transaction scopes.
#[derive(Clone)]
pub struct TransactionCoordinator {
    pool: ConnectionPool,
}

/// One atomic unit of work.
///
/// Dropping an uncommitted scope rolls the transaction back and returns the
/// lease.
pub struct TransactionScope {
    // Declared before the handle so the transaction is closed first on drop.
    txn: DatabaseTransaction,
    rollback_reason: OnceLock<String>,
    handle: PoolHandle,
}

impl TransactionScope {
    /// Repository for any entity, bound to this transaction
    pub fn repo<T: Persistable>(&self) -> ScopedRepository<'_, T> {
        ScopedRepository::new(&self.txn)
    }

    pub fn users(&self) -> ScopedRepository<'_, User> {
        self.repo()
    }

    pub fn prescriptions(&self) -> ScopedRepository<'_, Prescription> {
        self.repo()
    }

    /// Raw transaction, for statements the repositories do not cover.
    pub fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Force rollback even if every step succeeds.
    ///
    /// Only the first reason is kept; returns `false` if the scope was
    /// already marked.
    pub fn mark_rollback_only(&self, reason: impl Into<String>) -> bool {
        self.rollback_reason.set(reason.into()).is_ok()
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_reason.get().is_some()
    }

    async fn finish<T>(self, outcome: AppResult<T>) -> AppResult<T> {
        let TransactionScope {
            txn,
            rollback_reason,
            handle,
        } = self;

        let result = match (outcome, rollback_reason.into_inner()) {
            (Ok(value), None) => {
                txn.commit().await?;
                debug!("Transaction committed");
                Ok(value)
            }
            (Ok(_), Some(reason)) => rollback(txn, AppError::RolledBack(reason)).await,
            (Err(cause), _) => rollback(txn, cause).await,
        };

        drop(handle);
        result
    }
}

/// The rollback half of a transaction.
#[async_trait]
trait Rollback: Send + Sized {
    async fn rollback(self) -> Result<(), DbErr>;
}

#[async_trait]
impl Rollback for DatabaseTransaction {
    async fn rollback(self) -> Result<(), DbErr> {
        DatabaseTransaction::rollback(self).await
    }
}

// Rolls back and surfaces `cause`, unless the rollback itself fails.
async fn rollback<T, R: Rollback>(txn: R, cause: AppError) -> AppResult<T> {
    match txn.rollback().await {
        Ok(()) => {
            debug!(cause = %cause, "Transaction rolled back");
            Err(cause)
        }
        Err(e) => {
            error!(cause = %cause, rollback = %e, "Rollback failed, store state uncertain");
            Err(AppError::RollbackFailed {
                cause: Box::new(cause),
                rollback: Box::new(AppError::from(e)),
            })
        }
    }
}

impl TransactionCoordinator {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Run `f` atomically.
    ///
    /// Commits when `f` succeeds; rolls back when it fails or marks the scope
    /// rollback-only, surfacing the original error.
    ///
    /// # Errors
    /// `NestedScope` if called from inside another scope on the same task,
    /// `RolledBack` for an explicit rollback, `RollbackFailed` when the
    /// rollback itself fails, or whatever `f` returned.
    pub async fn run_in_transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(&'a TransactionScope) -> BoxFuture<'a, AppResult<T>> + Send,
        T: Send,
    {
        self.run_in_transaction_with(&CancellationToken::new(), f)
            .await
    }

    /// Like [`run_in_transaction`](Self::run_in_transaction), rolling back with
    /// `Cancelled` if `cancel` fires before `f` completes.
    pub async fn run_in_transaction_with<F, T>(
        &self,
        cancel: &CancellationToken,
        f: F,
    ) -> AppResult<T>
    where
        F: for<'a> FnOnce(&'a TransactionScope) -> BoxFuture<'a, AppResult<T>> + Send,
        T: Send,
    {
        if SCOPE_OPEN.try_with(|_| ()).is_ok() {
            error!("Transaction scope opened inside another scope");
            return Err(AppError::NestedScope);
        }
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let scope = self.open().await?;

        let outcome = {
            let work = f(&scope);
            SCOPE_OPEN
                .scope((), async {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!("Transaction scope cancelled");
                            Err(AppError::Cancelled)
                        }
                        result = work => result,
                    }
                })
                .await
        };

        scope.finish(outcome).await
    }

    async fn open(&self) -> AppResult<TransactionScope> {
        let handle = self.pool.acquire().await?;
        let txn = handle.begin().await?;
        Ok(TransactionScope {
            txn,
            rollback_reason: OnceLock::new(),
            handle,
        })
    }
}

/// Shorthand for a transactional block.
///
/// ```ignore
/// let user = with_transaction!(coordinator, |scope| {
///     scope.users().save(user).await
/// })?;
/// ```
#[macro_export]
macro_rules! with_transaction {
    ($coordinator:expr, |$scope:ident| $body:expr) => {
        $coordinator
            .run_in_transaction(move |$scope| Box::pin(async move { $body }))
            .await
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubRollback(Option<&'static str>);

    #[async_trait]
    impl Rollback for StubRollback {
        async fn rollback(self) -> Result<(), DbErr> {
            match self.0 {
                Some(msg) => Err(DbErr::Custom(msg.to_string())),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_rollback_surfaces_cause() {
        let result: AppResult<()> =
            rollback(StubRollback(None), AppError::validation("bad dosage")).await;
        assert!(matches!(result, Err(AppError::Validation(ref m)) if m == "bad dosage"));
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_both_errors() {
        let result: AppResult<()> = rollback(
            StubRollback(Some("connection reset")),
            AppError::validation("bad dosage"),
        )
        .await;

        let Err(err) = result else {
            panic!("rollback failure was swallowed");
        };
        assert!(err.is_fatal());
        match err {
            AppError::RollbackFailed { cause, rollback } => {
                assert!(matches!(*cause, AppError::Validation(ref m) if m == "bad dosage"));
                assert!(matches!(
                    *rollback,
                    AppError::Database(DbErr::Custom(ref m)) if m == "connection reset"
                ));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
