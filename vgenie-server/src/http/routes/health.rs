//! Health and status endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::http::server::AppState;
use crate::store::StoreMode;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct StatusResponse {
    /// `ok` or `degraded`
    pub status: &'static str,
    pub store: StoreMode,
    pub store_reachable: bool,
    pub payments_configured: bool,
    pub webhooks_configured: bool,
    pub email_configured: bool,
}

/// GET /status
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let store_reachable = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store ping failed");
            false
        }
    };
    // Read after the ping so a recovered primary reports as such
    let store = state.store.mode();
    let degraded = !store_reachable || store == StoreMode::Degraded;

    Json(StatusResponse {
        status: if degraded { "degraded" } else { "ok" },
        store,
        store_reachable,
        payments_configured: state.payments.is_configured(),
        webhooks_configured: state.config.stripe.webhook_secret.is_some(),
        email_configured: state.config.email.api_key.is_some(),
    })
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}
