//! Service layer - entity mutations and use cases.

mod prescription_service;
mod upsert;
mod user_service;

pub use prescription_service::{PrescriptionManager, PrescriptionService};
pub use upsert::{StageTracker, UpsertOrchestrator, UpsertStage};
pub use user_service::{UserManager, UserService};
