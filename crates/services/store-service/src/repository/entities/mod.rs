//! SeaORM table definitions.

pub mod prescription;
pub mod user;
