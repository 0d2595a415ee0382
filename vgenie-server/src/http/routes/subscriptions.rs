//! Newsletter signup

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use vgenie_core::validation::normalize_email;

use crate::email::{send_best_effort, templates};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::models::{EmailSubscription, SubscribeOutcome};

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    /// Where the signup happened, e.g. "footer" or "results"
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct UnsubscribeResponse {
    pub unsubscribed: bool,
}

/// POST /api/subscriptions
async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<EmailSubscription>), ApiError> {
    let email = normalize_email(&req.email)?;
    let source = req.source.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let (subscription, outcome) = state.store.subscribe(&email, source).await?;

    if outcome.is_new() {
        tracing::info!(subscription_id = %subscription.id, ?outcome, "Newsletter subscription");
        send_best_effort(
            state.mailer.as_ref(),
            templates::subscription_confirmation(&subscription.email, &state.config.server.public_url),
            "subscription_confirmation",
        )
        .await;
    }

    let status = match outcome {
        SubscribeOutcome::Created => StatusCode::CREATED,
        SubscribeOutcome::Resubscribed | SubscribeOutcome::AlreadySubscribed => StatusCode::OK,
    };
    Ok((status, Json(subscription)))
}

/// POST /api/subscriptions/unsubscribe
async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnsubscribeRequest>,
) -> Result<Json<UnsubscribeResponse>, ApiError> {
    let email = normalize_email(&req.email)?;
    let unsubscribed = state.store.unsubscribe(&email).await?;
    if unsubscribed {
        tracing::info!("Newsletter unsubscribe");
    }
    Ok(Json(UnsubscribeResponse { unsubscribed }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/subscriptions", post(subscribe))
        .route("/api/subscriptions/unsubscribe", post(unsubscribe))
}
