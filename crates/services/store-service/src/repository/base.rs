//! Generic entity persistence.
//!
//! [`Persistable`] binds a domain entity to its SeaORM table. The free
//! functions in this module implement the shared find/save/delete primitives
//! against any [`ConnectionTrait`], so the same code runs on a pooled
//! connection ([`EntityRepository`]) and inside a transaction scope
//! ([`ScopedRepository`]).

use std::marker::PhantomData;

use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DatabaseTransaction, DbErr, DeleteMany,
    EntityTrait, FromQueryResult, IntoActiveModel, QueryOrder, QuerySelect, Select,
};
use tracing::{debug, warn};

use crate::infra::ConnectionPool;
use common::{AppError, AppResult, PageRequest};
use domain::{CredentialGuard, DomainEntity};

/// Which statement an active model is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Insert,
    /// `created_date` is left unset so it is never overwritten
    Update,
}

/// Mapping between a domain entity and its table.
pub trait Persistable: DomainEntity {
    type Table: EntityTrait<Model = Self::Row>;
    type Row: FromQueryResult + IntoActiveModel<Self::Active> + Send + Sync + 'static;
    type Active: ActiveModelTrait<Entity = Self::Table> + ActiveModelBehavior + Send + Sync + 'static;

    fn from_row(row: Self::Row) -> Self;

    /// Build the active model with every column set, keyed by `id`.
    fn to_active(&self, id: String, mode: WriteMode) -> Self::Active;

    fn select_by_id(id: &str) -> Select<Self::Table>;

    fn delete_query(id: &str) -> DeleteMany<Self::Table>;

    /// Primary listing order
    fn order_column() -> <Self::Table as EntityTrait>::Column;

    /// Identity column, breaks ties in `order_column`
    fn id_column() -> <Self::Table as EntityTrait>::Column;

    /// Secret value that must already be in hashed form when written.
    fn stored_secret(&self) -> Option<&str> {
        None
    }
}

// Raw secrets never reach the store, whichever entry point wrote them.
fn reject_raw_secret<T: Persistable>(entity: &T) -> AppResult<()> {
    match entity.stored_secret() {
        Some(secret) if !CredentialGuard::is_hashed(secret) => {
            warn!(entity = T::KIND, id = ?entity.id(), "Refusing to store unhashed credential");
            Err(AppError::validation("credential must be hashed before it is stored"))
        }
        _ => Ok(()),
    }
}

pub(crate) async fn find_by_id<T, C>(db: &C, id: &str) -> AppResult<Option<T>>
where
    T: Persistable,
    C: ConnectionTrait,
{
    let row = T::select_by_id(id).one(db).await?;
    Ok(row.map(T::from_row))
}

pub(crate) async fn find_all<T, C>(db: &C) -> AppResult<Vec<T::Row>>
where
    T: Persistable,
    C: ConnectionTrait,
{
    let rows = <T::Table as EntityTrait>::find()
        .order_by_asc(T::order_column())
        .order_by_asc(T::id_column())
        .all(db)
        .await?;
    Ok(rows)
}

pub(crate) async fn find_page<T, C>(db: &C, page: PageRequest) -> AppResult<Vec<T>>
where
    T: Persistable,
    C: ConnectionTrait,
{
    let rows = <T::Table as EntityTrait>::find()
        .order_by_asc(T::order_column())
        .order_by_asc(T::id_column())
        .offset(page.offset())
        .limit(page.limit())
        .all(db)
        .await?;
    Ok(rows.into_iter().map(T::from_row).collect())
}

/// Upsert by presence of identity.
///
/// Without an id a new one is generated and the row inserted. With an id the
/// row is updated; if no row carries that id it is inserted under the same id.
pub(crate) async fn save<T, C>(db: &C, mut entity: T) -> AppResult<T>
where
    T: Persistable,
    C: ConnectionTrait,
{
    let Some(id) = entity.id().map(str::to_owned) else {
        return insert(db, entity).await;
    };
    reject_raw_secret(&entity)?;

    entity.touch(Utc::now());
    match entity.to_active(id.clone(), WriteMode::Update).update(db).await {
        Ok(row) => Ok(T::from_row(row)),
        Err(DbErr::RecordNotUpdated) => {
            debug!(entity = T::KIND, id = %id, "No row to update, inserting");
            insert(db, entity).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Strict insert. Fails on an identity that is already stored.
///
/// Both write paths reject an entity whose secret is not hashed with
/// `Validation`; hashing is the caller's job.
pub(crate) async fn insert<T, C>(db: &C, mut entity: T) -> AppResult<T>
where
    T: Persistable,
    C: ConnectionTrait,
{
    reject_raw_secret(&entity)?;
    entity.ensure_id();
    entity.stamp_created(Utc::now());

    let id = entity.id().map(str::to_owned).unwrap_or_default();
    let row = entity.to_active(id, WriteMode::Insert).insert(db).await?;
    Ok(T::from_row(row))
}

pub(crate) async fn delete_by_id<T, C>(db: &C, id: &str) -> AppResult<u64>
where
    T: Persistable,
    C: ConnectionTrait,
{
    let result = T::delete_query(id).exec(db).await?;
    debug!(entity = T::KIND, id, rows = result.rows_affected, "Deleted");
    Ok(result.rows_affected)
}

/// Pooled repository: every call leases one handle and returns it before the
/// result is produced.
pub struct EntityRepository<T> {
    pool: ConnectionPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityRepository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Persistable> EntityRepository<T> {
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    pub(crate) fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Zero or one entity.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<T>> {
        let handle = self.pool.acquire().await?;
        let found = find_by_id::<T, _>(handle.connection(), id).await;
        self.pool.release(handle);
        found
    }

    /// Every stored entity, oldest first.
    ///
    /// Rows are read when this is called; the stream does not observe later
    /// writes.
    pub async fn find_all(&self) -> AppResult<BoxStream<'static, T>> {
        let handle = self.pool.acquire().await?;
        let rows = find_all::<T, _>(handle.connection()).await;
        self.pool.release(handle);
        Ok(stream::iter(rows?).map(T::from_row).boxed())
    }

    pub async fn find_page(&self, page: PageRequest) -> AppResult<Vec<T>> {
        let handle = self.pool.acquire().await?;
        let found = find_page::<T, _>(handle.connection(), page).await;
        self.pool.release(handle);
        found
    }

    /// Insert when the entity has no id, update otherwise.
    pub async fn save(&self, entity: T) -> AppResult<T> {
        let handle = self.pool.acquire().await?;
        let saved = save(handle.connection(), entity).await;
        self.pool.release(handle);
        saved
    }

    /// Insert only; an existing id is a store error.
    pub async fn insert(&self, entity: T) -> AppResult<T> {
        let handle = self.pool.acquire().await?;
        let saved = insert(handle.connection(), entity).await;
        self.pool.release(handle);
        saved
    }

    /// Completes whether or not a row existed.
    pub async fn delete_by_id(&self, id: &str) -> AppResult<()> {
        let handle = self.pool.acquire().await?;
        let deleted = delete_by_id::<T, _>(handle.connection(), id).await;
        self.pool.release(handle);
        deleted.map(|_| ())
    }
}

/// Repository bound to an open transaction scope.
pub struct ScopedRepository<'a, T> {
    txn: &'a DatabaseTransaction,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: Persistable> ScopedRepository<'a, T> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self {
            txn,
            _entity: PhantomData,
        }
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<T>> {
        find_by_id::<T, _>(self.txn, id).await
    }

    pub async fn find_all(&self) -> AppResult<Vec<T>> {
        let rows = find_all::<T, _>(self.txn).await?;
        Ok(rows.into_iter().map(T::from_row).collect())
    }

    pub async fn find_page(&self, page: PageRequest) -> AppResult<Vec<T>> {
        find_page::<T, _>(self.txn, page).await
    }

    pub async fn save(&self, entity: T) -> AppResult<T> {
        save(self.txn, entity).await
    }

    pub async fn insert(&self, entity: T) -> AppResult<T> {
        insert(self.txn, entity).await
    }

    /// Returns the number of rows removed.
    pub async fn delete_by_id(&self, id: &str) -> AppResult<u64> {
        delete_by_id::<T, _>(self.txn, id).await
    }
}
