//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.

pub mod constants;
pub mod credential;
pub mod entity;
pub mod error;
pub mod prescription;
pub mod user;

pub use constants::*;
pub use credential::CredentialGuard;
pub use entity::{DomainEntity, MergeOutcome, Mergeable};
pub use error::{DomainError, DomainResult};
pub use prescription::{Prescription, UpdatePrescription};
pub use user::{UpdateUser, User};
