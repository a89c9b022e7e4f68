//! Common utilities shared by the store core and its collaborators.
//!
//! This crate provides:
//! - Unified error taxonomy and its transport mapping
//! - Profile resolution into the single active store configuration
//! - Pagination parameters

pub mod config;
pub mod error;
pub mod pagination;

pub use config::{Profile, ProfileBlock, ProfileResolver, ProfileSettings, PoolSettings, StoreConfig};
pub use error::{AppError, AppResult, OptionExt, Outcome};
pub use pagination::PageRequest;
