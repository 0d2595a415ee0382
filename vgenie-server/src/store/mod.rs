//! Storage abstraction
//!
//! Handlers talk to a [`Store`] trait object. Three implementations:
//! - `PgStore` (in `crate::db`): PostgreSQL through sqlx
//! - [`MemoryStore`]: maps behind a lock, for tests and database-less runs
//! - [`ResilientStore`]: primary store with a memory fallback while the
//!   primary is unavailable

pub mod memory;
pub mod resilient;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use vgenie_core::{UsageDecision, ValuationInput, ValuationResult};

use crate::models::{
    AdminUser, EmailSubscription, FileUpload, NewUser, NewValuation, Paginated, Pagination,
    Session, Stats, SubscribeOutcome, User, Valuation,
};

pub use memory::MemoryStore;
pub use resilient::ResilientStore;
pub use retry::{retry_with_backoff, Backoff};

/// Store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} '{key}' already exists")]
    Conflict { resource: &'static str, key: String },

    #[error("corrupt {resource} row: {reason}")]
    Corrupt { resource: &'static str, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// The backing database could not be reached or dropped the connection.
    ///
    /// Only these errors trigger the memory fallback; query, constraint and
    /// lookup failures are returned to the caller unchanged.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Sqlx(e) => match e {
                sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Protocol(_)
                | sqlx::Error::WorkerCrashed => true,
                // SQLSTATE class 08 (connection exception), 57P (operator intervention)
                sqlx::Error::Database(db) => db
                    .code()
                    .map(|c| c.starts_with("08") || c.starts_with("57P"))
                    .unwrap_or(false),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Which backend is serving requests, for `/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    Database,
    Memory,
    /// Database configured but currently failing over to memory
    Degraded,
}

/// Persistence operations used by the HTTP layer
#[async_trait]
pub trait Store: Send + Sync {
    fn mode(&self) -> StoreMode;

    /// Cheap connectivity check
    async fn ping(&self) -> StoreResult<()>;

    // Users
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;
    /// Atomically take one valuation from the monthly allowance
    async fn consume_valuation(
        &self,
        id: Uuid,
        limit: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<UsageDecision>;
    /// Returns `false` when the user already had lifetime access
    async fn grant_lifetime_access(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    // Sessions
    async fn create_session(&self, session: Session) -> StoreResult<()>;
    async fn get_session(&self, token_hash: &str) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, token_hash: &str) -> StoreResult<()>;
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    // Valuations
    async fn insert_valuation(&self, new: NewValuation) -> StoreResult<Valuation>;
    async fn get_valuation(&self, id: Uuid) -> StoreResult<Valuation>;
    /// Newest first; `None` lists every user's valuations
    async fn list_valuations(
        &self,
        user_id: Option<Uuid>,
        page: Pagination,
    ) -> StoreResult<Paginated<Valuation>>;
    async fn update_valuation(
        &self,
        id: Uuid,
        input: ValuationInput,
        result: ValuationResult,
    ) -> StoreResult<Valuation>;
    async fn delete_valuation(&self, id: Uuid) -> StoreResult<()>;
    /// Returns `false` when the valuation was already paid
    async fn mark_valuation_paid(&self, id: Uuid, payment_intent_id: &str) -> StoreResult<bool>;

    // Uploads
    async fn insert_upload(&self, upload: FileUpload) -> StoreResult<FileUpload>;
    async fn list_uploads(&self, valuation_id: Uuid) -> StoreResult<Vec<FileUpload>>;

    // Newsletter
    async fn subscribe(
        &self,
        email: &str,
        source: Option<&str>,
    ) -> StoreResult<(EmailSubscription, SubscribeOutcome)>;
    /// Returns `false` when the address was not subscribed
    async fn unsubscribe(&self, email: &str) -> StoreResult<bool>;
    async fn list_subscriptions(&self, page: Pagination)
        -> StoreResult<Paginated<EmailSubscription>>;

    // Admins
    async fn create_admin(&self, email: &str, password_hash: &str) -> StoreResult<AdminUser>;
    async fn get_admin(&self, id: Uuid) -> StoreResult<AdminUser>;
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminUser>>;
    async fn record_admin_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    async fn stats(&self) -> StoreResult<Stats>;
}
