//! Back-office endpoints
//!
//! Admins sign in separately from customers and get a short-lived session
//! under their own cookie. Admin accounts are created from the CLI.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vgenie_core::validation::normalize_email;

use crate::auth::session::{hash_token, read_cookie, ADMIN_COOKIE, ADMIN_SESSION_HOURS};
use crate::auth::{clear_cookie, session_cookie, start_session};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentAdmin;
use crate::http::server::AppState;
use crate::models::{AdminUser, EmailSubscription, Paginated, Pagination, PaginationParams, SessionKind, Stats, ValuationResponse};
use crate::store::{StoreError, StoreMode};

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AdminStatsResponse {
    #[serde(flatten)]
    pub stats: Stats,
    pub store: StoreMode,
}

#[derive(Serialize)]
pub struct AdminValuation {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub valuation: ValuationResponse,
}

const BAD_CREDENTIALS: ApiError = ApiError::Unauthorized {
    message: "invalid email or password",
};

/// POST /api/admin/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&req.email).map_err(|_| BAD_CREDENTIALS)?;
    let Some(admin) = state.store.find_admin_by_email(&email).await? else {
        state.hasher.verify_blocking(req.password, None).await?;
        return Err(BAD_CREDENTIALS);
    };
    let verification = state
        .hasher
        .verify_blocking(req.password, Some(admin.password_hash.clone()))
        .await?;
    if !verification.is_valid() {
        tracing::warn!(admin_id = %admin.id, "Failed admin login");
        return Err(BAD_CREDENTIALS);
    }

    let now = Utc::now();
    if let Err(e) = state.store.record_admin_login(admin.id, now).await {
        tracing::warn!(admin_id = %admin.id, error = %e, "Failed to record admin login");
    }
    let ttl = Duration::hours(ADMIN_SESSION_HOURS);
    let token = start_session(state.store.as_ref(), SessionKind::Admin, admin.id, ttl, now).await?;
    tracing::info!(admin_id = %admin.id, "Admin signed in");

    let cookie = session_cookie(SessionKind::Admin, &token, ttl, state.config.session.secure_cookie);
    let admin = AdminUser {
        last_login_at: Some(now),
        ..admin
    };
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(admin)).into_response())
}

/// POST /api/admin/logout
async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = read_cookie(&headers, ADMIN_COOKIE) {
        state.store.delete_session(&hash_token(&token)).await?;
    }
    let cookie = clear_cookie(SessionKind::Admin, state.config.session.secure_cookie);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

/// GET /api/admin/me
async fn me(CurrentAdmin { admin }: CurrentAdmin) -> Json<AdminUser> {
    Json(admin)
}

/// GET /api/admin/stats
async fn stats(
    State(state): State<Arc<AppState>>,
    _admin: CurrentAdmin,
) -> Result<Json<AdminStatsResponse>, ApiError> {
    let stats = state.store.stats().await?;
    Ok(Json(AdminStatsResponse {
        stats,
        store: state.store.mode(),
    }))
}

/// GET /api/admin/valuations
async fn list_valuations(
    State(state): State<Arc<AppState>>,
    _admin: CurrentAdmin,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<AdminValuation>>, ApiError> {
    let result = state.store.list_valuations(None, Pagination::from(params)).await?;

    // Owners with lifetime access see every report unlocked
    let mut lifetime: HashMap<Uuid, bool> = HashMap::new();
    for v in &result.items {
        if lifetime.contains_key(&v.user_id) {
            continue;
        }
        let has_access = match state.store.get_user(v.user_id).await {
            Ok(user) => user.has_lifetime_access,
            Err(StoreError::NotFound { .. }) => false,
            Err(e) => return Err(e.into()),
        };
        lifetime.insert(v.user_id, has_access);
    }

    Ok(Json(result.map(|v| {
        let has_access = lifetime.get(&v.user_id).copied().unwrap_or(false);
        AdminValuation {
            user_id: v.user_id,
            valuation: ValuationResponse::new(v, has_access),
        }
    })))
}

/// GET /api/admin/subscriptions
async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    _admin: CurrentAdmin,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<EmailSubscription>>, ApiError> {
    Ok(Json(state.store.list_subscriptions(Pagination::from(params)).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", post(logout))
        .route("/api/admin/me", get(me))
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/valuations", get(list_valuations))
        .route("/api/admin/subscriptions", get(list_subscriptions))
}
