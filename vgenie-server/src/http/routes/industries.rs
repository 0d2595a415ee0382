//! Industry multiple table

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use vgenie_core::industry::{industries, DEFAULT_MULTIPLE};
use vgenie_core::{Industry, MultipleRange};

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct IndustriesResponse {
    pub industries: &'static [Industry],
    /// Applied when a submitted industry is not in the table
    pub default_multiple: MultipleRange,
}

/// GET /api/industries
async fn list_industries() -> Json<IndustriesResponse> {
    Json(IndustriesResponse {
        industries: industries(),
        default_multiple: DEFAULT_MULTIPLE,
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/industries", get(list_industries))
}
