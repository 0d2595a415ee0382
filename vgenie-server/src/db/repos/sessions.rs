//! Session repository

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::{Session, SessionKind};
use crate::store::{StoreError, StoreResult};

pub struct SessionRepo<'a> {
    pool: &'a PgPool,
}

fn session_from_row(row: &PgRow) -> StoreResult<Session> {
    let kind: String = row.try_get("kind")?;
    let kind = kind.parse::<SessionKind>().map_err(|reason| StoreError::Corrupt {
        resource: "session",
        reason,
    })?;
    Ok(Session {
        token_hash: row.try_get("token_hash")?,
        kind,
        principal_id: row.try_get("principal_id")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

impl<'a> SessionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, kind, principal_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&session.token_hash)
        .bind(session.kind.as_str())
        .bind(session.principal_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT token_hash, kind, principal_id, created_at, expires_at FROM sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    pub async fn delete(&self, token_hash: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
