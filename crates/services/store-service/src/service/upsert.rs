//! Entity mutations as a staged pipeline.
//!
//! Every create, update and delete walks `Lookup -> Merge -> Guard ->
//! Persist -> Done`, skipping the stages it does not need. Any stage may end
//! in `Failed`. Update and delete run entirely inside one transaction scope so
//! the lookup and the write see the same connection.

use std::fmt;

use chrono::Utc;
use tracing::{debug, trace};

use crate::infra::TransactionCoordinator;
use crate::repository::{EntityRepository, Persistable};
use common::{AppError, AppResult, OptionExt};
use domain::{CredentialGuard, Mergeable};

/// Pipeline stage of one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStage {
    Lookup,
    Merge,
    Guard,
    Persist,
    Done,
    Failed,
}

impl UpsertStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, UpsertStage::Done | UpsertStage::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_advance_to(self, next: UpsertStage) -> bool {
        use UpsertStage::*;

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Lookup, Merge) | (Lookup, Persist) => true,
            (Merge, Guard) => true,
            (Guard, Persist) => true,
            (Persist, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for UpsertStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpsertStage::Lookup => "lookup",
            UpsertStage::Merge => "merge",
            UpsertStage::Guard => "guard",
            UpsertStage::Persist => "persist",
            UpsertStage::Done => "done",
            UpsertStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the stage of a single mutation.
#[derive(Debug)]
pub struct StageTracker {
    entity: &'static str,
    operation: &'static str,
    id: String,
    stage: UpsertStage,
}

impl StageTracker {
    pub fn new(entity: &'static str, operation: &'static str, id: &str, start: UpsertStage) -> Self {
        trace!(entity, operation, id, stage = %start, "Mutation started");
        Self {
            entity,
            operation,
            id: id.to_string(),
            stage: start,
        }
    }

    pub fn stage(&self) -> UpsertStage {
        self.stage
    }

    /// Move to `next`.
    ///
    /// # Errors
    /// Returns `Internal` for a transition the pipeline does not allow.
    pub fn advance(&mut self, next: UpsertStage) -> AppResult<()> {
        if !self.stage.can_advance_to(next) {
            return Err(AppError::internal(format!(
                "invalid {} stage transition {} -> {}",
                self.operation, self.stage, next
            )));
        }
        trace!(
            entity = self.entity,
            operation = self.operation,
            id = %self.id,
            from = %self.stage,
            stage = %next,
            "Mutation stage"
        );
        self.stage = next;
        Ok(())
    }

    /// Enter `Failed`, passing the error through.
    pub fn fail(&mut self, err: AppError) -> AppError {
        debug!(
            entity = self.entity,
            operation = self.operation,
            id = %self.id,
            stage = %self.stage,
            error = %err,
            "Mutation failed"
        );
        self.stage = UpsertStage::Failed;
        err
    }
}

/// Create / update / delete for one entity kind.
pub struct UpsertOrchestrator<T> {
    repo: EntityRepository<T>,
    coordinator: TransactionCoordinator,
    guard: Option<CredentialGuard>,
}

impl<T> Clone for UpsertOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            coordinator: self.coordinator.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<T: Persistable + Mergeable> UpsertOrchestrator<T> {
    pub fn new(repo: EntityRepository<T>, coordinator: TransactionCoordinator) -> Self {
        Self {
            repo,
            coordinator,
            guard: None,
        }
    }

    /// Hash secret fields with `guard` before they are persisted.
    pub fn with_guard(mut self, guard: CredentialGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn repository(&self) -> &EntityRepository<T> {
        &self.repo
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    /// Validate, guard and persist a new entity.
    ///
    /// An entity arriving with an id is inserted under that id and never
    /// overwrites an existing row.
    pub async fn create(&self, mut entity: T) -> AppResult<T> {
        let label = entity.id().unwrap_or("<new>").to_string();
        let mut stage = StageTracker::new(T::KIND, "create", &label, UpsertStage::Merge);

        let result = async {
            entity.validate()?;
            stage.advance(UpsertStage::Guard)?;
            guard_credential(self.guard.as_ref(), &mut entity).await?;
            stage.advance(UpsertStage::Persist)?;
            let saved = if entity.id().is_some() {
                self.repo.insert(entity).await?
            } else {
                self.repo.save(entity).await?
            };
            stage.advance(UpsertStage::Done)?;
            Ok::<_, AppError>(saved)
        }
        .await;

        result.map_err(|e| stage.fail(e))
    }

    /// Merge `patch` onto the stored entity.
    ///
    /// # Errors
    /// `NotFound(id)` when no entity has `id`; nothing is written then.
    pub async fn update(&self, id: &str, patch: T::Patch) -> AppResult<T> {
        let id = id.to_string();
        let guard = self.guard.clone();

        self.coordinator
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    let mut stage = StageTracker::new(T::KIND, "update", &id, UpsertStage::Lookup);
                    let repo = scope.repo::<T>();

                    let result = async {
                        let mut entity = repo.find_by_id(&id).await?.ok_or_not_found(&id)?;
                        stage.advance(UpsertStage::Merge)?;
                        let merged = entity.merge(patch, Utc::now())?;
                        stage.advance(UpsertStage::Guard)?;
                        if merged.credential_supplied {
                            guard_credential(guard.as_ref(), &mut entity).await?;
                        }
                        stage.advance(UpsertStage::Persist)?;
                        let saved = repo.save(entity).await?;
                        stage.advance(UpsertStage::Done)?;
                        Ok::<_, AppError>(saved)
                    }
                    .await;

                    result.map_err(|e| stage.fail(e))
                })
            })
            .await
    }

    /// Delete the stored entity.
    ///
    /// # Errors
    /// `NotFound(id)` when no entity has `id`.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let id = id.to_string();

        self.coordinator
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    let mut stage = StageTracker::new(T::KIND, "delete", &id, UpsertStage::Lookup);
                    let repo = scope.repo::<T>();

                    let result = async {
                        repo.find_by_id(&id).await?.ok_or_not_found(&id)?;
                        stage.advance(UpsertStage::Persist)?;
                        repo.delete_by_id(&id).await?;
                        stage.advance(UpsertStage::Done)?;
                        Ok::<_, AppError>(())
                    }
                    .await;

                    result.map_err(|e| stage.fail(e))
                })
            })
            .await
    }
}

// Replace the entity's secret with its hashed form. Hashing is CPU bound and
// runs on the blocking pool.
async fn guard_credential<T: Mergeable>(
    guard: Option<&CredentialGuard>,
    entity: &mut T,
) -> AppResult<()> {
    let Some(slot) = entity.credential_mut() else {
        return Ok(());
    };
    let guard = guard
        .cloned()
        .ok_or_else(|| AppError::internal(format!("no credential guard for {}", T::KIND)))?;

    let value = std::mem::take(slot);
    let hashed = tokio::task::spawn_blocking(move || guard.ensure_hashed(&value))
        .await
        .map_err(|e| AppError::internal(format!("credential hashing task failed: {}", e)))??;
    *slot = hashed;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_transitions() {
        use UpsertStage::*;

        assert!(Lookup.can_advance_to(Merge));
        assert!(Lookup.can_advance_to(Persist));
        assert!(Merge.can_advance_to(Guard));
        assert!(Guard.can_advance_to(Persist));
        assert!(Persist.can_advance_to(Done));

        assert!(!Lookup.can_advance_to(Done));
        assert!(!Merge.can_advance_to(Persist));
        assert!(!Persist.can_advance_to(Merge));
    }

    #[test]
    fn test_failed_reachable_until_terminal() {
        use UpsertStage::*;

        for stage in [Lookup, Merge, Guard, Persist] {
            assert!(stage.can_advance_to(Failed));
        }
        assert!(!Done.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Lookup));
    }

    #[test]
    fn test_tracker_rejects_skipped_stage() {
        let mut tracker = StageTracker::new("user", "update", "u-1", UpsertStage::Lookup);
        assert!(tracker.advance(UpsertStage::Guard).is_err());
        assert_eq!(tracker.stage(), UpsertStage::Lookup);

        let err = tracker.fail(AppError::not_found("u-1"));
        assert!(matches!(err, AppError::NotFound(ref id) if id == "u-1"));
        assert_eq!(tracker.stage(), UpsertStage::Failed);
    }
}
