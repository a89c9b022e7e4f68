//! User service - Handles user-related business logic.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppError, AppResult, OptionExt, PageRequest};
use domain::{CredentialGuard, UpdateUser, User};

use super::upsert::UpsertOrchestrator;
use crate::repository::UserRepository;

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Get user by ID
    async fn get_user(&self, id: &str) -> AppResult<User>;

    /// One page of users
    async fn list_users(&self, page: PageRequest) -> AppResult<Vec<User>>;

    /// Every user id
    async fn user_ids(&self) -> AppResult<Vec<String>>;

    /// Register a user; the raw credential is hashed before storage
    async fn create_user(&self, user: User) -> AppResult<User>;

    /// Apply a partial update
    async fn update_user(&self, id: &str, patch: UpdateUser) -> AppResult<User>;

    async fn delete_user(&self, id: &str) -> AppResult<()>;

    /// Check a username / credential pair
    async fn login(&self, username: &str, credential: &str) -> AppResult<User>;
}

/// Concrete implementation of UserService.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
    writes: UpsertOrchestrator<User>,
    guard: CredentialGuard,
}

impl UserManager {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        writes: UpsertOrchestrator<User>,
        guard: CredentialGuard,
    ) -> Self {
        let writes = writes.with_guard(guard.clone());
        Self {
            repo,
            writes,
            guard,
        }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn get_user(&self, id: &str) -> AppResult<User> {
        self.repo.find_by_id(id).await?.ok_or_not_found(id)
    }

    async fn list_users(&self, page: PageRequest) -> AppResult<Vec<User>> {
        self.repo.list(page).await
    }

    async fn user_ids(&self) -> AppResult<Vec<String>> {
        self.repo.list_ids().await
    }

    async fn create_user(&self, user: User) -> AppResult<User> {
        if self.repo.find_by_username(&user.username).await?.is_some() {
            return Err(AppError::validation(format!(
                "username already taken: {}",
                user.username
            )));
        }

        let created = self.writes.create(user).await?;
        tracing::info!(id = ?created.id, username = %created.username, "User created");
        Ok(created)
    }

    async fn update_user(&self, id: &str, patch: UpdateUser) -> AppResult<User> {
        self.writes.update(id, patch).await
    }

    async fn delete_user(&self, id: &str) -> AppResult<()> {
        self.writes.delete(id).await?;
        tracing::info!(id, "User deleted");
        Ok(())
    }

    async fn login(&self, username: &str, credential: &str) -> AppResult<User> {
        if credential.is_empty() {
            return Err(AppError::validation("credential required"));
        }

        let Some(user) = self.repo.find_by_username(username).await? else {
            return Err(AppError::InvalidCredentials);
        };

        let guard = self.guard.clone();
        let raw = credential.to_string();
        let stored = user.credential.clone();
        let valid = tokio::task::spawn_blocking(move || guard.verify(&raw, &stored))
            .await
            .map_err(|e| AppError::internal(format!("credential check task failed: {}", e)))??;

        if !valid {
            tracing::debug!(username, "Login rejected");
            return Err(AppError::InvalidCredentials);
        }
        Ok(user)
    }
}
