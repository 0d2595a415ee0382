//! vgenie-server: HTTP API for ValuationGenie
//!
//! Accounts and cookie sessions, valuations with a free monthly allowance,
//! paid HTML/PDF reports, document uploads, payments and the newsletter.
//! Persistence goes through the [`store::Store`] trait, backed by
//! PostgreSQL with an in-memory fallback.

pub mod auth;
pub mod db;
pub mod email;
pub mod http;
pub mod models;
pub mod payments;
pub mod store;

pub use http::{build_router, build_state, open_store, run_server, ApiError, AppState, ServerError};
pub use store::{MemoryStore, Store, StoreError, StoreMode};
