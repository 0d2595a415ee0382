//! Newsletter subscriptions

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct EmailSubscription {
    pub id: Uuid,
    pub email: String,
    pub source: Option<String>,
    pub subscribed: bool,
    pub created_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

/// What a subscribe call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Created,
    Resubscribed,
    AlreadySubscribed,
}

impl SubscribeOutcome {
    /// Whether a confirmation email is due
    pub fn is_new(self) -> bool {
        !matches!(self, Self::AlreadySubscribed)
    }
}
