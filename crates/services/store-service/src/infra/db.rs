//! Schema management: migrations and optional bootstrap DDL.

use std::path::Path;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use super::migrations::Migrator;
use common::{AppError, AppResult};

/// Schema operations on one store connection.
#[derive(Clone)]
pub struct StoreSchema {
    connection: DatabaseConnection,
}

impl StoreSchema {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Run pending migrations.
    pub async fn run_migrations(&self) -> Result<(), DbErr> {
        Migrator::up(&self.connection, None).await?;
        info!("Migrations applied");
        Ok(())
    }

    /// Rollback the last migration.
    pub async fn rollback_migration(&self) -> Result<(), DbErr> {
        Migrator::down(&self.connection, Some(1)).await
    }

    /// Every known migration with its applied flag.
    pub async fn migration_status(&self) -> Result<Vec<(String, bool)>, DbErr> {
        use sea_orm::{EntityTrait, QueryOrder};
        use sea_orm_migration::seaql_migrations;

        let applied: std::collections::HashSet<String> = seaql_migrations::Entity::find()
            .order_by_asc(seaql_migrations::Column::Version)
            .all(&self.connection)
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        Ok(Migrator::migrations()
            .iter()
            .map(|m| {
                let name = m.name().to_string();
                let is_applied = applied.contains(&name);
                (name, is_applied)
            })
            .collect())
    }

    /// Drop everything and migrate from scratch.
    pub async fn fresh_migrations(&self) -> Result<(), DbErr> {
        Migrator::fresh(&self.connection).await
    }

    /// Apply every `*.sql` file in `dir`, in file name order.
    ///
    /// Statements are split on `;`. Files should be idempotent
    /// (`CREATE ... IF NOT EXISTS`) since they run on every start.
    pub async fn apply_schema_dir(&self, dir: &Path) -> AppResult<usize> {
        let unreadable =
            |e: std::io::Error| AppError::config(format!("cannot read schema dir {}: {}", dir.display(), e));

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "sql") {
                files.push(path);
            }
        }
        files.sort();

        let backend = self.connection.get_database_backend();
        let mut applied = 0;
        for file in &files {
            let sql = tokio::fs::read_to_string(file).await.map_err(|e| {
                AppError::config(format!("cannot read {}: {}", file.display(), e))
            })?;
            for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                self.connection
                    .execute(Statement::from_string(backend, statement.to_string()))
                    .await?;
                applied += 1;
            }
            debug!(file = %file.display(), "Schema file applied");
        }

        info!(files = files.len(), statements = applied, "Schema directory applied");
        Ok(applied)
    }
}
