//! Uploaded supporting documents (P&L statements, tax returns)

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct FileUpload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub valuation_id: Option<Uuid>,
    pub original_name: String,
    /// File name inside the uploads directory
    #[serde(skip)]
    pub stored_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}
