//! User-specific queries.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use super::base::{EntityRepository, Persistable};
use super::entities::user::{self, Entity as UserEntity};
use common::{AppResult, PageRequest};
use domain::User;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User read access for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;

    /// Find user by login name
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// One page of users, oldest first
    async fn list(&self, page: PageRequest) -> AppResult<Vec<User>>;

    /// Every stored user id, oldest first
    async fn list_ids(&self) -> AppResult<Vec<String>>;
}

#[async_trait]
impl UserRepository for EntityRepository<User> {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        EntityRepository::find_by_id(self, id).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let handle = self.pool().acquire().await?;
        let row = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(handle.connection())
            .await;
        self.pool().release(handle);
        Ok(row?.map(User::from_row))
    }

    async fn list(&self, page: PageRequest) -> AppResult<Vec<User>> {
        self.find_page(page).await
    }

    async fn list_ids(&self) -> AppResult<Vec<String>> {
        let handle = self.pool().acquire().await?;
        let ids = UserEntity::find()
            .select_only()
            .column(user::Column::Id)
            .order_by_asc(user::Column::CreatedDate)
            .order_by_asc(user::Column::Id)
            .into_tuple::<String>()
            .all(handle.connection())
            .await;
        self.pool().release(handle);
        Ok(ids?)
    }
}
