//! Schema migrations
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements run at start-up and by
//! `vgenie migrate`.

use sqlx::PgPool;

pub const STATEMENTS: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            password_hash TEXT NOT NULL,
            has_lifetime_access BOOLEAN NOT NULL DEFAULT FALSE,
            lifetime_purchased_at TIMESTAMPTZ,
            valuations_this_period INTEGER NOT NULL DEFAULT 0,
            usage_period_start TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "sessions",
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            kind TEXT NOT NULL CHECK (kind IN ('user', 'admin')),
            principal_id UUID NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            expires_at TIMESTAMPTZ NOT NULL
        )
        "#,
    ),
    (
        "sessions_expires_idx",
        "CREATE INDEX IF NOT EXISTS sessions_expires_idx ON sessions (expires_at)",
    ),
    (
        "valuations",
        r#"
        CREATE TABLE IF NOT EXISTS valuations (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            business_name TEXT NOT NULL,
            industry TEXT NOT NULL,
            inputs JSONB NOT NULL,
            result JSONB NOT NULL,
            value_low DOUBLE PRECISION NOT NULL,
            value_high DOUBLE PRECISION NOT NULL,
            is_paid BOOLEAN NOT NULL DEFAULT FALSE,
            payment_intent_id TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CHECK (value_low <= value_high)
        )
        "#,
    ),
    (
        "valuations_user_idx",
        "CREATE INDEX IF NOT EXISTS valuations_user_idx ON valuations (user_id, created_at DESC)",
    ),
    (
        "file_uploads",
        r#"
        CREATE TABLE IF NOT EXISTS file_uploads (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            valuation_id UUID REFERENCES valuations(id) ON DELETE SET NULL,
            original_name TEXT NOT NULL,
            stored_name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            size_bytes BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "file_uploads_valuation_idx",
        "CREATE INDEX IF NOT EXISTS file_uploads_valuation_idx ON file_uploads (valuation_id)",
    ),
    (
        "email_subscriptions",
        r#"
        CREATE TABLE IF NOT EXISTS email_subscriptions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT NOT NULL UNIQUE,
            source TEXT,
            subscribed BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            unsubscribed_at TIMESTAMPTZ
        )
        "#,
    ),
    (
        "admin_users",
        r#"
        CREATE TABLE IF NOT EXISTS admin_users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            last_login_at TIMESTAMPTZ
        )
        "#,
    ),
];

/// Run all migrations
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running migrations...");

    for (name, sql) in STATEMENTS {
        tracing::debug!(name, "applying");
        sqlx::query(sql).execute(pool).await?;
    }

    tracing::info!(count = STATEMENTS.len(), "Migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_idempotent() {
        for (name, sql) in STATEMENTS {
            assert!(sql.contains("IF NOT EXISTS"), "{} is not idempotent", name);
        }
    }

    #[test]
    fn tables_precede_their_references() {
        let position = |name: &str| STATEMENTS.iter().position(|(n, _)| *n == name).unwrap();
        assert!(position("users") < position("valuations"));
        assert!(position("valuations") < position("file_uploads"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_run_twice() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool creation failed");
        run(&pool).await.expect("first run");
        run(&pool).await.expect("second run");
    }
}
