//! Payment processor webhooks
//!
//! The raw body is verified against the signing secret before parsing.
//! Events the server cannot act on are acknowledged so the processor
//! stops retrying them; store failures return 500 so it retries.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::payments::fulfil;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::payments::webhook::{DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};
use crate::payments::{verify_signature, WebhookEvent};

/// POST /api/webhooks/stripe
async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable {
            message: "webhooks are not configured".into(),
        })?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("missing signature header"))?;
    verify_signature(&body, signature, secret, Utc::now().timestamp(), DEFAULT_TOLERANCE_SECS)?;

    let event = WebhookEvent::parse(&body)?;
    let Some(intent) = event.succeeded_intent() else {
        tracing::debug!(event_id = %event.id, kind = %event.kind, "Ignoring webhook event");
        return Ok(Json(json!({ "received": true })));
    };

    let outcome = match intent {
        Ok(intent) => fulfil(&state, &intent).await.map(|_| ()),
        Err(e) => Err(e.into()),
    };
    match outcome {
        Ok(()) => {}
        // Unknown user or valuation, or unusable metadata: retrying won't help
        Err(ApiError::NotFound { resource, id }) => {
            tracing::warn!(event_id = %event.id, %resource, %id, "Webhook references a missing record");
        }
        Err(ApiError::BadRequest { message }) => {
            tracing::warn!(event_id = %event.id, %message, "Webhook payment intent not actionable");
        }
        Err(e) => return Err(e),
    }

    Ok(Json(json!({ "received": true })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/webhooks/stripe", post(stripe_webhook))
}
