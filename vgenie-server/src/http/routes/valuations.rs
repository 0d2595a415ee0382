//! Valuation endpoints
//!
//! `estimate` is public and stateless. Everything else is scoped to the
//! signed-in user; another user's valuation is reported as not found.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use vgenie_core::{compute, UsageDecision, ValuationInput, ValuationResult};

use crate::http::error::ApiError;
use crate::http::extractors::{CurrentUser, ValidUuid};
use crate::http::server::AppState;
use crate::models::{NewValuation, Paginated, Pagination, PaginationParams, User, Valuation, ValuationResponse};
use crate::store::StoreError;

/// Load a valuation owned by `user`
pub(crate) async fn owned_valuation(
    state: &AppState,
    user: &User,
    id: uuid::Uuid,
) -> Result<Valuation, ApiError> {
    let valuation = state.store.get_valuation(id).await?;
    if valuation.user_id != user.id {
        tracing::debug!(valuation_id = %id, user_id = %user.id, "Valuation owned by another user");
        return Err(StoreError::not_found("valuation", id).into());
    }
    Ok(valuation)
}

/// POST /api/valuations/estimate
async fn estimate(Json(input): Json<ValuationInput>) -> Result<Json<ValuationResult>, ApiError> {
    Ok(Json(compute(&input)?))
}

#[derive(Serialize)]
pub struct CreatedValuation {
    #[serde(flatten)]
    pub valuation: ValuationResponse,
    /// Free valuations left this month; `null` when unlimited
    pub valuations_remaining: Option<u32>,
}

/// POST /api/valuations
async fn create_valuation(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Json(input): Json<ValuationInput>,
) -> Result<(StatusCode, Json<CreatedValuation>), ApiError> {
    // Invalid input must not use up the allowance
    let result = compute(&input)?;

    let now = Utc::now();
    let limit = state.free_limit();
    let usage = match state.store.consume_valuation(user.id, limit, now).await? {
        UsageDecision::Allowed(usage) => usage,
        UsageDecision::LimitReached { limit } => {
            return Err(ApiError::PaymentRequired {
                message: format!(
                    "the free plan allows {} valuations per month; upgrade to lifetime access for unlimited valuations",
                    limit
                ),
            });
        }
    };

    let valuation = state
        .store
        .insert_valuation(NewValuation {
            user_id: user.id,
            input,
            result,
        })
        .await?;

    tracing::info!(
        valuation_id = %valuation.id,
        user_id = %user.id,
        value_low = valuation.result.value_low,
        value_high = valuation.result.value_high,
        "Valuation created"
    );

    let remaining = usage.remaining(now, limit, user.has_lifetime_access);
    Ok((
        StatusCode::CREATED,
        Json(CreatedValuation {
            valuation: ValuationResponse::new(valuation, user.has_lifetime_access),
            valuations_remaining: remaining,
        }),
    ))
}

/// GET /api/valuations
async fn list_valuations(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<ValuationResponse>>, ApiError> {
    let page = Pagination::from(params);
    let result = state.store.list_valuations(Some(user.id), page).await?;
    let lifetime = user.has_lifetime_access;
    Ok(Json(result.map(|v| ValuationResponse::new(v, lifetime))))
}

/// GET /api/valuations/{id}
async fn get_valuation(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<ValuationResponse>, ApiError> {
    let valuation = owned_valuation(&state, &user, id).await?;
    Ok(Json(ValuationResponse::new(valuation, user.has_lifetime_access)))
}

/// PUT /api/valuations/{id} - replace inputs and recompute
async fn update_valuation(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    ValidUuid(id): ValidUuid,
    Json(input): Json<ValuationInput>,
) -> Result<Json<ValuationResponse>, ApiError> {
    owned_valuation(&state, &user, id).await?;
    let result = compute(&input)?;
    let valuation = state.store.update_valuation(id, input, result).await?;
    tracing::info!(valuation_id = %id, "Valuation recomputed");
    Ok(Json(ValuationResponse::new(valuation, user.has_lifetime_access)))
}

/// DELETE /api/valuations/{id}
async fn delete_valuation(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    owned_valuation(&state, &user, id).await?;
    state.store.delete_valuation(id).await?;
    tracing::info!(valuation_id = %id, "Valuation deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/valuations/estimate", post(estimate))
        .route("/api/valuations", get(list_valuations).post(create_valuation))
        .route(
            "/api/valuations/{id}",
            get(get_valuation).put(update_valuation).delete(delete_valuation),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgenie_core::Addbacks;

    #[tokio::test]
    async fn estimate_rejects_invalid_input() {
        let input = ValuationInput {
            business_name: "".into(),
            industry: "retail".into(),
            annual_revenue: 100_000.0,
            net_profit: 10_000.0,
            owner_salary: 0.0,
            addbacks: Addbacks::default(),
            years_in_business: None,
            revenue_trend: None,
            location: None,
        };
        let err = estimate(Json(input)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
