//! User repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vgenie_core::UsageDecision;

use super::unique_or;
use crate::models::{NewUser, User};
use crate::store::{StoreError, StoreResult};

const COLUMNS: &str = "id, email, name, password_hash, has_lifetime_access, lifetime_purchased_at, \
                       valuations_this_period, usage_period_start, created_at";

pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user; duplicate email is a `Conflict`
    pub async fn create(&self, new: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            COLUMNS
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| unique_or(e, "user", &new.email))
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", COLUMNS))
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    pub async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", id));
        }
        Ok(())
    }

    /// Take one valuation from the user's allowance.
    ///
    /// The row is locked for the check, so concurrent requests are counted
    /// one after another.
    pub async fn consume_valuation(
        &self,
        id: Uuid,
        limit: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<UsageDecision> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("user", id))?;

        let decision = user.usage().consume(now, limit, user.has_lifetime_access);
        if let UsageDecision::Allowed(usage) = decision {
            sqlx::query(
                "UPDATE users SET valuations_this_period = $2, usage_period_start = $3 WHERE id = $1",
            )
            .bind(id)
            .bind(i32::try_from(usage.count).unwrap_or(i32::MAX))
            .bind(usage.period_start)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(decision)
    }

    /// Returns `false` when the user already had lifetime access
    pub async fn grant_lifetime_access(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET has_lifetime_access = TRUE, lifetime_purchased_at = $2
            WHERE id = $1 AND NOT has_lifetime_access
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        // Either already granted or no such user
        self.get(id).await.map(|_| false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");
        crate::db::migrations::run(&pool).await.expect("migrations failed");
        pool
    }

    fn new_user() -> NewUser {
        NewUser {
            email: format!("{}@example.com", Uuid::new_v4()),
            name: Some("Test".into()),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_email_is_conflict() {
        let pool = pool().await;
        let repo = UserRepo::new(&pool);
        let new = new_user();
        repo.create(new.clone()).await.unwrap();
        let err = repo.create(new).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { resource: "user", .. }));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn lifetime_grant_is_idempotent() {
        let pool = pool().await;
        let repo = UserRepo::new(&pool);
        let user = repo.create(new_user()).await.unwrap();
        assert!(repo.grant_lifetime_access(user.id, Utc::now()).await.unwrap());
        assert!(!repo.grant_lifetime_access(user.id, Utc::now()).await.unwrap());
        assert!(repo.grant_lifetime_access(Uuid::new_v4(), Utc::now()).await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn concurrent_consumes_respect_limit() {
        let pool = pool().await;
        let user = UserRepo::new(&pool).create(new_user()).await.unwrap();
        let now = Utc::now();

        let attempts = (0..6).map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { UserRepo::new(&pool).consume_valuation(user.id, 3, now).await })
        });
        let mut allowed = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            if matches!(attempt.await.unwrap().unwrap(), UsageDecision::Allowed(_)) {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 3);
        let user = UserRepo::new(&pool).get(user.id).await.unwrap();
        assert_eq!(user.valuations_this_period, 3);
    }
}
