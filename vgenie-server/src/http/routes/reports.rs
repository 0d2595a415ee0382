//! Report downloads, gated on payment or lifetime access

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use vgenie_core::report::{render_html, render_pdf, ReportView};

use super::valuations::owned_valuation;
use crate::http::error::ApiError;
use crate::http::extractors::{CurrentUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::User;

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    /// Open the print dialog on load
    #[serde(default)]
    pub print: bool,
}

/// Owned, unlocked valuation as a report view
async fn unlocked_view(state: &AppState, user: &User, id: uuid::Uuid) -> Result<(ReportView, String), ApiError> {
    let valuation = owned_valuation(state, user, id).await?;
    if !valuation.is_paid && !user.has_lifetime_access {
        return Err(ApiError::PaymentRequired {
            message: "purchase this report or lifetime access to download it".to_string(),
        });
    }
    let prepared_for = user.name.clone().or_else(|| Some(user.email.clone()));
    Ok((valuation.report_view(prepared_for), valuation.file_stem()))
}

/// GET /api/valuations/{id}/report
async fn html_report(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    ValidUuid(id): ValidUuid,
    Query(params): Query<ReportParams>,
) -> Result<Response, ApiError> {
    let (view, _) = unlocked_view(&state, &user, id).await?;
    let html = render_html(&view, params.print)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        html,
    )
        .into_response())
}

/// GET /api/valuations/{id}/report.pdf
async fn pdf_report(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    ValidUuid(id): ValidUuid,
) -> Result<Response, ApiError> {
    let (view, stem) = unlocked_view(&state, &user, id).await?;
    let bytes = render_pdf(&view);
    tracing::debug!(valuation_id = %id, size = bytes.len(), "Rendered PDF report");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.pdf\"", stem),
            ),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        bytes,
    )
        .into_response())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/valuations/{id}/report", get(html_report))
        .route("/api/valuations/{id}/report.pdf", get(pdf_report))
}
