//! Infrastructure layer - connection pool, transactions and schema.

mod db;
pub mod migrations;
mod pool;
mod unit_of_work;

pub use db::StoreSchema;
pub use migrations::Migrator;
pub use pool::{ConnectionPool, PoolHandle};
pub use unit_of_work::{TransactionCoordinator, TransactionScope};
