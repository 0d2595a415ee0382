//! Checkout: create and confirm payment intents
//!
//! The client pays with the returned `client_secret`, then calls `confirm`.
//! The `payment_intent.succeeded` webhook runs the same [`fulfil`], so a
//! purchase is unlocked by whichever arrives first.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::valuations::owned_valuation;
use crate::email::{send_best_effort, templates};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::http::server::AppState;
use crate::payments::{PaymentError, PaymentIntent, PaymentRequest, Product};

#[derive(Deserialize)]
pub struct IntentRequest {
    pub product: Product,
    #[serde(default)]
    pub valuation_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct IntentResponse {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub payment_intent_id: String,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub product: Product,
    pub valuation_id: Option<Uuid>,
    /// False when this intent had already been fulfilled
    pub newly_fulfilled: bool,
}

/// Apply a succeeded payment intent. Idempotent: `newly_fulfilled` is
/// false when the purchase was already applied.
pub(crate) async fn fulfil(state: &AppState, intent: &PaymentIntent) -> Result<ConfirmResponse, ApiError> {
    let purchase = intent.purchase()?;
    let user = state.store.get_user(purchase.user_id).await?;

    let (newly_fulfilled, business_name) = match purchase.product {
        Product::Report => {
            // purchase() guarantees a valuation id for reports
            let valuation_id = purchase.valuation_id.ok_or_else(|| {
                PaymentError::InvalidRequest(format!("payment intent {} has no valuation_id", intent.id))
            })?;
            let valuation = state.store.get_valuation(valuation_id).await?;
            if valuation.user_id != user.id {
                return Err(PaymentError::InvalidRequest(format!(
                    "payment intent {} names a valuation of another user",
                    intent.id
                ))
                .into());
            }
            let newly = state.store.mark_valuation_paid(valuation_id, &intent.id).await?;
            (newly, Some(valuation.input.business_name))
        }
        Product::Lifetime => {
            let newly = state.store.grant_lifetime_access(user.id, Utc::now()).await?;
            (newly, None)
        }
    };

    if newly_fulfilled {
        tracing::info!(
            payment_intent = %intent.id,
            user_id = %user.id,
            product = %purchase.product,
            amount = intent.amount,
            "Purchase fulfilled"
        );
        send_best_effort(
            state.mailer.as_ref(),
            templates::receipt(
                &user.email,
                purchase.product,
                intent.amount,
                business_name.as_deref(),
                &state.config.server.public_url,
            ),
            "receipt",
        )
        .await;
    } else {
        tracing::debug!(payment_intent = %intent.id, "Purchase already fulfilled");
    }

    Ok(ConfirmResponse {
        product: purchase.product,
        valuation_id: purchase.valuation_id,
        newly_fulfilled,
    })
}

/// POST /api/payments/intent
async fn create_intent(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Json(req): Json<IntentRequest>,
) -> Result<(StatusCode, Json<IntentResponse>), ApiError> {
    if !state.payments.is_configured() {
        return Err(PaymentError::NotConfigured.into());
    }

    let valuation_id = match req.product {
        Product::Report => {
            let id = req.valuation_id.ok_or_else(|| ApiError::Validation {
                field: "valuation_id".into(),
                reason: "required for report purchases".into(),
            })?;
            let valuation = owned_valuation(&state, &user, id).await?;
            if valuation.is_paid || user.has_lifetime_access {
                return Err(ApiError::Conflict {
                    message: "this report is already unlocked".into(),
                });
            }
            Some(id)
        }
        Product::Lifetime => {
            if user.has_lifetime_access {
                return Err(ApiError::Conflict {
                    message: "lifetime access is already active".into(),
                });
            }
            None
        }
    };

    let request = PaymentRequest {
        amount_cents: req.product.price_cents(&state.config.pricing),
        currency: state.config.pricing.currency.clone(),
        product: req.product,
        user_id: user.id,
        valuation_id,
        receipt_email: Some(user.email.clone()),
    };
    let intent = state.payments.create_payment_intent(&request).await?;
    tracing::info!(
        payment_intent = %intent.id,
        user_id = %user.id,
        product = %req.product,
        amount = intent.amount,
        "Payment intent created"
    );

    Ok((
        StatusCode::CREATED,
        Json(IntentResponse {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
        }),
    ))
}

/// POST /api/payments/confirm
async fn confirm(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let intent = state.payments.retrieve_payment_intent(&req.payment_intent_id).await?;

    let purchase = intent.purchase()?;
    if purchase.user_id != user.id {
        tracing::warn!(
            payment_intent = %intent.id,
            user_id = %user.id,
            "Confirm attempted for another user's payment"
        );
        return Err(ApiError::Forbidden {
            reason: "payment belongs to another account".into(),
        });
    }
    if !intent.succeeded() {
        return Err(ApiError::PaymentRequired {
            message: format!("payment has not completed (status: {})", intent.status),
        });
    }

    Ok(Json(fulfil(&state, &intent).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/payments/intent", post(create_intent))
        .route("/api/payments/confirm", post(confirm))
}
