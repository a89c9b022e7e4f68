//! Prescription service.

use async_trait::async_trait;
use futures::stream::BoxStream;

use common::{AppResult, OptionExt, PageRequest};
use domain::{Prescription, UpdatePrescription};

use super::upsert::UpsertOrchestrator;
use crate::repository::EntityRepository;

#[async_trait]
pub trait PrescriptionService: Send + Sync {
    async fn get(&self, id: &str) -> AppResult<Prescription>;

    async fn list(&self, page: PageRequest) -> AppResult<Vec<Prescription>>;

    /// Every prescription, read when called
    async fn all(&self) -> AppResult<BoxStream<'static, Prescription>>;

    async fn create(&self, prescription: Prescription) -> AppResult<Prescription>;

    async fn update(&self, id: &str, patch: UpdatePrescription) -> AppResult<Prescription>;

    /// Move a prescription to another lifecycle status
    async fn update_status(&self, id: &str, status: &str) -> AppResult<Prescription>;

    async fn delete(&self, id: &str) -> AppResult<()>;
}

pub struct PrescriptionManager {
    repo: EntityRepository<Prescription>,
    writes: UpsertOrchestrator<Prescription>,
}

impl PrescriptionManager {
    pub fn new(writes: UpsertOrchestrator<Prescription>) -> Self {
        Self {
            repo: writes.repository().clone(),
            writes,
        }
    }
}

#[async_trait]
impl PrescriptionService for PrescriptionManager {
    async fn get(&self, id: &str) -> AppResult<Prescription> {
        self.repo.find_by_id(id).await?.ok_or_not_found(id)
    }

    async fn list(&self, page: PageRequest) -> AppResult<Vec<Prescription>> {
        self.repo.find_page(page).await
    }

    async fn all(&self) -> AppResult<BoxStream<'static, Prescription>> {
        self.repo.find_all().await
    }

    async fn create(&self, prescription: Prescription) -> AppResult<Prescription> {
        self.writes.create(prescription).await
    }

    async fn update(&self, id: &str, patch: UpdatePrescription) -> AppResult<Prescription> {
        self.writes.update(id, patch).await
    }

    async fn update_status(&self, id: &str, status: &str) -> AppResult<Prescription> {
        let updated = self
            .writes
            .update(id, UpdatePrescription::status(status))
            .await?;
        tracing::info!(id, status, "Prescription status changed");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.writes.delete(id).await
    }
}
