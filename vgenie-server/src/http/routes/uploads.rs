//! Supporting document uploads
//!
//! Files are written to the uploads directory as `<uuid>-<sanitized name>`;
//! metadata goes to the store. Only the extensions in [`ALLOWED_TYPES`]
//! are accepted.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use uuid::Uuid;

use super::valuations::owned_valuation;
use crate::http::error::ApiError;
use crate::http::extractors::{CurrentUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::FileUpload;

/// Accepted extensions and the content type stored for each
pub const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("csv", "text/csv"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
];

const MAX_NAME_LEN: usize = 100;

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Content type for an accepted file name
pub fn content_type_for(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, content_type)| *content_type)
}

/// Reduce a client file name to `[A-Za-z0-9._-]`, without leading dots
pub fn sanitize_file_name(name: &str) -> String {
    // Browsers on Windows may send the full path
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = if cleaned.len() > MAX_NAME_LEN {
        // Keep the extension when truncating
        match cleaned.rsplit_once('.') {
            Some((stem, ext)) if ext.len() < 10 => {
                format!("{}.{}", &stem[..MAX_NAME_LEN.saturating_sub(ext.len() + 1).min(stem.len())], ext)
            }
            _ => cleaned[..MAX_NAME_LEN].to_string(),
        }
    } else {
        cleaned.to_string()
    };
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// POST /api/valuations/{id}/uploads
async fn upload_file(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    ValidUuid(valuation_id): ValidUuid,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileUpload>), ApiError> {
    owned_valuation(&state, &user, valuation_id).await?;
    let limit = state.config.uploads.max_bytes;

    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.file_name().is_some() => break field,
            Ok(Some(_)) => continue,
            Ok(None) => return Err(ApiError::bad_request("multipart body has no file field")),
            Err(e) => return Err(multipart_error(e, limit)),
        }
    };

    let original_name = field.file_name().unwrap_or_default().to_string();
    let content_type = content_type_for(&original_name).ok_or_else(|| ApiError::UnsupportedMediaType {
        message: format!(
            "'{}' is not an accepted file type (pdf, csv, xls, xlsx, png, jpg)",
            original_name
        ),
    })?;

    let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
    if data.len() > limit {
        return Err(ApiError::PayloadTooLarge { limit });
    }
    if data.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    let id = Uuid::new_v4();
    let stored_name = format!("{}-{}", id, sanitize_file_name(&original_name));
    let dir = &state.config.uploads.dir;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::internal(format!("create {}: {}", dir.display(), e)))?;
    let path = dir.join(&stored_name);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| ApiError::internal(format!("write {}: {}", path.display(), e)))?;

    let upload = FileUpload {
        id,
        user_id: user.id,
        valuation_id: Some(valuation_id),
        original_name,
        stored_name,
        content_type: content_type.to_string(),
        size_bytes: data.len() as i64,
        created_at: Utc::now(),
    };
    let upload = match state.store.insert_upload(upload).await {
        Ok(upload) => upload,
        Err(e) => {
            // Don't leave an orphaned file behind
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %rm, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        upload_id = %upload.id,
        valuation_id = %valuation_id,
        size = upload.size_bytes,
        content_type = %upload.content_type,
        "File uploaded"
    );
    Ok((StatusCode::CREATED, Json(upload)))
}

fn multipart_error(e: axum::extract::multipart::MultipartError, limit: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::bad_request(e.body_text())
    }
}

/// GET /api/valuations/{id}/uploads
async fn list_uploads(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    ValidUuid(valuation_id): ValidUuid,
) -> Result<Json<Vec<FileUpload>>, ApiError> {
    owned_valuation(&state, &user, valuation_id).await?;
    Ok(Json(state.store.list_uploads(valuation_id).await?))
}

pub fn router(max_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/valuations/{id}/uploads",
            get(list_uploads).post(upload_file),
        )
        .layer(DefaultBodyLimit::max(max_bytes.saturating_add(MULTIPART_OVERHEAD)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_extensions_case_insensitively() {
        assert_eq!(content_type_for("P&L 2023.PDF"), Some("application/pdf"));
        assert_eq!(content_type_for("photo.jpeg"), Some("image/jpeg"));
        assert_eq!(content_type_for("books.xlsx").map(|t| t.contains("spreadsheetml")), Some(true));
        assert_eq!(content_type_for("run.exe"), None);
        assert_eq!(content_type_for("noextension"), None);
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("P&L 2023.pdf"), "P_L_2023.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\tax return.pdf"), "tax_return.pdf");
        assert_eq!(sanitize_file_name(".hidden.csv"), "hidden.csv");
        assert_eq!(sanitize_file_name("..."), "upload");
    }

    #[test]
    fn long_names_keep_extension() {
        let long = format!("{}.pdf", "a".repeat(300));
        let cleaned = sanitize_file_name(&long);
        assert!(cleaned.len() <= MAX_NAME_LEN);
        assert!(cleaned.ends_with(".pdf"));
    }
}
