//! Newsletter subscription repository

use sqlx::PgPool;

use crate::models::{EmailSubscription, Paginated, Pagination, SubscribeOutcome};
use crate::store::StoreResult;

const COLUMNS: &str = "id, email, source, subscribed, created_at, unsubscribed_at";

pub struct SubscriptionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an address, reactivating it if it had unsubscribed.
    ///
    /// Runs in a transaction so the outcome reflects the row as it was
    /// before this call.
    pub async fn subscribe(
        &self,
        email: &str,
        source: Option<&str>,
    ) -> StoreResult<(EmailSubscription, SubscribeOutcome)> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, EmailSubscription>(&format!(
            "SELECT {} FROM email_subscriptions WHERE email = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match existing {
            Some(sub) if sub.subscribed => (sub, SubscribeOutcome::AlreadySubscribed),
            Some(_) => {
                let sub = sqlx::query_as::<_, EmailSubscription>(&format!(
                    r#"
                    UPDATE email_subscriptions
                    SET subscribed = TRUE, unsubscribed_at = NULL, source = COALESCE($2, source)
                    WHERE email = $1
                    RETURNING {}
                    "#,
                    COLUMNS
                ))
                .bind(email)
                .bind(source)
                .fetch_one(&mut *tx)
                .await?;
                (sub, SubscribeOutcome::Resubscribed)
            }
            None => {
                // A concurrent insert of the same address wins; report it as existing
                let inserted = sqlx::query_as::<_, EmailSubscription>(&format!(
                    r#"
                    INSERT INTO email_subscriptions (email, source) VALUES ($1, $2)
                    ON CONFLICT (email) DO NOTHING
                    RETURNING {}
                    "#,
                    COLUMNS
                ))
                .bind(email)
                .bind(source)
                .fetch_optional(&mut *tx)
                .await?;
                match inserted {
                    Some(sub) => (sub, SubscribeOutcome::Created),
                    None => {
                        let sub = sqlx::query_as::<_, EmailSubscription>(&format!(
                            "SELECT {} FROM email_subscriptions WHERE email = $1",
                            COLUMNS
                        ))
                        .bind(email)
                        .fetch_one(&mut *tx)
                        .await?;
                        (sub, SubscribeOutcome::AlreadySubscribed)
                    }
                }
            }
        };

        tx.commit().await?;
        Ok(result)
    }

    /// Returns `false` when the address was not subscribed
    pub async fn unsubscribe(&self, email: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE email_subscriptions
            SET subscribed = FALSE, unsubscribed_at = NOW()
            WHERE email = $1 AND subscribed
            "#,
        )
        .bind(email)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn list(&self, page: Pagination) -> StoreResult<Paginated<EmailSubscription>> {
        let items = sqlx::query_as::<_, EmailSubscription>(&format!(
            "SELECT {} FROM email_subscriptions ORDER BY created_at DESC, email LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM email_subscriptions")
            .fetch_one(self.pool)
            .await?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }
}
