//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Rely on DB constraints and map violations (no check-then-insert)
//! - Uses transactions for multi-step operations
//! - Plain `sqlx::query` + `bind`, rows read with `Row::get` or `FromRow`

pub mod admins;
pub mod sessions;
pub mod subscriptions;
pub mod uploads;
pub mod users;
pub mod valuations;

pub use admins::AdminRepo;
pub use sessions::SessionRepo;
pub use subscriptions::SubscriptionRepo;
pub use uploads::UploadRepo;
pub use users::UserRepo;
pub use valuations::ValuationRepo;

use crate::store::StoreError;

/// Map a unique violation to `Conflict`, anything else to `Sqlx`
pub(crate) fn unique_or(err: sqlx::Error, resource: &'static str, key: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict {
            resource,
            key: key.to_string(),
        },
        _ => StoreError::Sqlx(err),
    }
}

/// Map a foreign key violation to `NotFound` for the referenced row
pub(crate) fn foreign_key_or(err: sqlx::Error, resource: &'static str, id: impl ToString) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::not_found(resource, id)
        }
        _ => StoreError::Sqlx(err),
    }
}
