//! Persisted entities and their API views

pub mod admin;
pub mod pagination;
pub mod session;
pub mod subscription;
pub mod upload;
pub mod user;
pub mod valuation;

pub use admin::AdminUser;
pub use pagination::{Paginated, Pagination, PaginationParams};
pub use session::{Session, SessionKind};
pub use subscription::{EmailSubscription, SubscribeOutcome};
pub use upload::FileUpload;
pub use user::{NewUser, User, UserProfile};
pub use valuation::{NewValuation, Valuation, ValuationResponse};

use serde::Serialize;

/// Aggregate counts for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub users: i64,
    pub lifetime_users: i64,
    pub valuations: i64,
    pub paid_valuations: i64,
    pub active_subscriptions: i64,
    pub uploads: i64,
}
