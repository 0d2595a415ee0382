//! Customer accounts

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use vgenie_core::UsageState;

/// User row
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub has_lifetime_access: bool,
    pub lifetime_purchased_at: Option<DateTime<Utc>>,
    pub valuations_this_period: i32,
    pub usage_period_start: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn usage(&self) -> UsageState {
        UsageState {
            count: self.valuations_this_period.max(0) as u32,
            period_start: self.usage_period_start,
        }
    }

    /// Public view; `limit` is the free monthly allowance
    pub fn profile(&self, now: DateTime<Utc>, limit: u32) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            has_lifetime_access: self.has_lifetime_access,
            valuations_remaining: self.usage().remaining(now, limit, self.has_lifetime_access),
            created_at: self.created_at,
        }
    }
}

/// Fields needed to create a user; email is already normalized
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// User as returned by the API (never includes the password hash)
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub has_lifetime_access: bool,
    /// `null` when unlimited
    pub valuations_remaining: Option<u32>,
    pub created_at: DateTime<Utc>,
}
