//! Admin user repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::unique_or;
use crate::models::{AdminUser, Stats};
use crate::store::{StoreError, StoreResult};

const COLUMNS: &str = "id, email, password_hash, created_at, last_login_at";

pub struct AdminRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, email: &str, password_hash: &str) -> StoreResult<AdminUser> {
        sqlx::query_as::<_, AdminUser>(&format!(
            "INSERT INTO admin_users (email, password_hash) VALUES ($1, $2) RETURNING {}",
            COLUMNS
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| unique_or(e, "admin", email))
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<AdminUser> {
        sqlx::query_as::<_, AdminUser>(&format!("SELECT {} FROM admin_users WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("admin", id))
    }

    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<AdminUser>> {
        let admin = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {} FROM admin_users WHERE email = $1",
            COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(admin)
    }

    pub async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE admin_users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("admin", id));
        }
        Ok(())
    }

    /// Dashboard counts in one round trip
    pub async fn stats(&self) -> StoreResult<Stats> {
        let (users, lifetime_users, valuations, paid_valuations, active_subscriptions, uploads): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM users WHERE has_lifetime_access),
                (SELECT COUNT(*) FROM valuations),
                (SELECT COUNT(*) FROM valuations WHERE is_paid),
                (SELECT COUNT(*) FROM email_subscriptions WHERE subscribed),
                (SELECT COUNT(*) FROM file_uploads)
            "#,
        )
        .fetch_one(self.pool)
        .await?;

        Ok(Stats {
            users,
            lifetime_users,
            valuations,
            paid_valuations,
            active_subscriptions,
            uploads,
        })
    }
}
