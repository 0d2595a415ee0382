//! File upload metadata repository

use sqlx::PgPool;
use uuid::Uuid;

use super::foreign_key_or;
use crate::models::FileUpload;
use crate::store::StoreResult;

const COLUMNS: &str =
    "id, user_id, valuation_id, original_name, stored_name, content_type, size_bytes, created_at";

pub struct UploadRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UploadRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, upload: &FileUpload) -> StoreResult<FileUpload> {
        sqlx::query_as::<_, FileUpload>(&format!(
            r#"
            INSERT INTO file_uploads
                (id, user_id, valuation_id, original_name, stored_name, content_type, size_bytes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(upload.id)
        .bind(upload.user_id)
        .bind(upload.valuation_id)
        .bind(&upload.original_name)
        .bind(&upload.stored_name)
        .bind(&upload.content_type)
        .bind(upload.size_bytes)
        .bind(upload.created_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            foreign_key_or(
                e,
                "valuation",
                upload.valuation_id.map(|id| id.to_string()).unwrap_or_default(),
            )
        })
    }

    /// Uploads attached to a valuation, newest first
    pub async fn list_for_valuation(&self, valuation_id: Uuid) -> StoreResult<Vec<FileUpload>> {
        let uploads = sqlx::query_as::<_, FileUpload>(&format!(
            "SELECT {} FROM file_uploads WHERE valuation_id = $1 ORDER BY created_at DESC",
            COLUMNS
        ))
        .bind(valuation_id)
        .fetch_all(self.pool)
        .await?;
        Ok(uploads)
    }
}
