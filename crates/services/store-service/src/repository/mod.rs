//! Repository layer for data access.

mod base;
pub mod entities;
mod user_repository;

pub use base::{EntityRepository, Persistable, ScopedRepository, WriteMode};
pub use user_repository::UserRepository;

#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
