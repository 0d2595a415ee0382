//! Signup, login, logout and the current profile

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use vgenie_core::validation::{normalize_email, validate_password};

use crate::auth::session::{hash_token, read_cookie, USER_COOKIE};
use crate::auth::{clear_cookie, session_cookie, start_session, Verification};
use crate::email::{send_best_effort, templates};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::http::server::AppState;
use crate::models::{NewUser, SessionKind, UserProfile};

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
}

const BAD_CREDENTIALS: ApiError = ApiError::Unauthorized {
    message: "invalid email or password",
};

fn with_cookie(status: StatusCode, cookie: String, body: AuthResponse) -> Response {
    (status, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

/// POST /api/auth/signup
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let password_hash = state.hasher.hash_blocking(req.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            email,
            name,
            password_hash,
        })
        .await?;
    tracing::info!(user_id = %user.id, "User signed up");

    let now = Utc::now();
    let ttl = state.session_ttl();
    let token = start_session(state.store.as_ref(), SessionKind::User, user.id, ttl, now).await?;

    send_best_effort(
        state.mailer.as_ref(),
        templates::welcome(&user.email, user.name.as_deref(), &state.config.server.public_url),
        "welcome",
    )
    .await;

    let cookie = session_cookie(SessionKind::User, &token, ttl, state.config.session.secure_cookie);
    let body = AuthResponse {
        user: user.profile(now, state.free_limit()),
    };
    Ok(with_cookie(StatusCode::CREATED, cookie, body))
}

/// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&req.email).map_err(|_| BAD_CREDENTIALS)?;
    let Some(user) = state.store.find_user_by_email(&email).await? else {
        state.hasher.verify_blocking(req.password, None).await?;
        return Err(BAD_CREDENTIALS);
    };

    let verification = state
        .hasher
        .verify_blocking(req.password.clone(), Some(user.password_hash.clone()))
        .await?;
    match verification {
        Verification::Invalid => {
            tracing::info!(user_id = %user.id, "Failed login");
            return Err(BAD_CREDENTIALS);
        }
        Verification::ValidNeedsRehash => {
            let upgraded = state.hasher.hash_blocking(req.password).await?;
            match state.store.update_password_hash(user.id, &upgraded).await {
                Ok(()) => tracing::info!(user_id = %user.id, "Upgraded password hash"),
                Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Failed to upgrade password hash"),
            }
        }
        Verification::Valid => {}
    }

    let now = Utc::now();
    let ttl = state.session_ttl();
    let token = start_session(state.store.as_ref(), SessionKind::User, user.id, ttl, now).await?;
    let cookie = session_cookie(SessionKind::User, &token, ttl, state.config.session.secure_cookie);
    let body = AuthResponse {
        user: user.profile(now, state.free_limit()),
    };
    Ok(with_cookie(StatusCode::OK, cookie, body))
}

/// POST /api/auth/logout
///
/// Always clears the cookie, whether or not the session still exists.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = read_cookie(&headers, USER_COOKIE) {
        state.store.delete_session(&hash_token(&token)).await?;
    }
    let cookie = clear_cookie(SessionKind::User, state.config.session.secure_cookie);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

/// GET /api/auth/me
async fn me(State(state): State<Arc<AppState>>, current: CurrentUser) -> Json<UserProfile> {
    Json(current.user.profile(Utc::now(), state.free_limit()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}
