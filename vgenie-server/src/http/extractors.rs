//! Custom Axum extractors

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use chrono::Utc;
use uuid::Uuid;

use super::error::ApiError;
use super::server::AppState;
use crate::auth::session::{cookie_name, hash_token, read_cookie};
use crate::models::{AdminUser, Session, SessionKind, User};
use crate::store::StoreError;

/// Extract and validate a UUID from path
pub struct ValidUuid(pub Uuid);

impl<S> FromRequestParts<S> for ValidUuid
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::bad_request("missing id"))?;

        let uuid = Uuid::parse_str(&id).map_err(|_| ApiError::Validation {
            field: "id".into(),
            reason: "invalid UUID format".into(),
        })?;

        Ok(Self(uuid))
    }
}

/// Resolve the session cookie for `kind` into a live session
async fn authenticate(
    parts: &Parts,
    state: &AppState,
    kind: SessionKind,
) -> Result<Session, ApiError> {
    let token = read_cookie(&parts.headers, cookie_name(kind)).ok_or_else(ApiError::unauthorized)?;
    let token_hash = hash_token(&token);

    let session = state
        .store
        .get_session(&token_hash)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    if session.kind != kind {
        return Err(ApiError::unauthorized());
    }
    if session.is_expired(Utc::now()) {
        if let Err(e) = state.store.delete_session(&token_hash).await {
            tracing::warn!(error = %e, "Failed to delete expired session");
        }
        return Err(ApiError::Unauthorized {
            message: "session expired",
        });
    }
    Ok(session)
}

/// The signed-in customer
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = authenticate(parts, state, SessionKind::User).await?;
        let user = match state.store.get_user(session.principal_id).await {
            Ok(user) => user,
            // Account removed under a live session
            Err(StoreError::NotFound { .. }) => return Err(ApiError::unauthorized()),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { user, session })
    }
}

/// The signed-in operator
pub struct CurrentAdmin {
    pub admin: AdminUser,
}

impl FromRequestParts<Arc<AppState>> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = authenticate(parts, state, SessionKind::Admin).await?;
        let admin = match state.store.get_admin(session.principal_id).await {
            Ok(admin) => admin,
            Err(StoreError::NotFound { .. }) => return Err(ApiError::unauthorized()),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { admin })
    }
}
