//! Database layer - connection pool, migrations and repositories
//!
//! # Design Principles
//!
//! - Connection pool with a small fixed limit
//! - Rely on DB constraints, handle conflicts - no check-then-insert
//! - Transactions for multi-step operations

pub mod migrations;
pub mod pool;
pub mod repos;
pub mod store;

pub use pool::{connect_with_retry, create_pool, create_pool_with_options};
pub use store::PgStore;
