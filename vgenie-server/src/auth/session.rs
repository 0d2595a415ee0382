//! Cookie sessions
//!
//! The browser holds a random token; the store only ever sees its SHA-256.

use axum::http::header::{HeaderMap, COOKIE};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Session, SessionKind};
use crate::store::{Store, StoreResult};

pub const USER_COOKIE: &str = "vg_session";
pub const ADMIN_COOKIE: &str = "vg_admin_session";

/// Admin sessions are kept short regardless of configuration
pub const ADMIN_SESSION_HOURS: i64 = 12;

pub fn cookie_name(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::User => USER_COOKIE,
        SessionKind::Admin => ADMIN_COOKIE,
    }
}

/// 32 random bytes, hex encoded
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(kind: SessionKind, token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        cookie_name(kind),
        token,
        ttl.num_seconds().max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_cookie(kind: SessionKind, secure: bool) -> String {
    session_cookie(kind, "", Duration::zero(), secure)
}

/// Find a cookie value in the request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Persist a new session and return the raw token for the cookie
pub async fn start_session(
    store: &dyn Store,
    kind: SessionKind,
    principal_id: Uuid,
    ttl: Duration,
    now: DateTime<Utc>,
) -> StoreResult<String> {
    let token = generate_token();
    store
        .create_session(Session {
            token_hash: hash_token(&token),
            kind,
            principal_id,
            created_at: now,
            expires_at: now + ttl,
        })
        .await?;
    tracing::debug!(%principal_id, kind = %kind, "session started");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(hash_token(&a).len(), 64);
        assert_ne!(hash_token(&a), a);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie(SessionKind::User, "tok", Duration::days(30), false);
        assert_eq!(
            cookie,
            "vg_session=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=2592000"
        );
        let secure = session_cookie(SessionKind::Admin, "tok", Duration::hours(1), true);
        assert!(secure.starts_with("vg_admin_session=tok;"));
        assert!(secure.ends_with("; Secure"));
        assert!(clear_cookie(SessionKind::User, false).contains("vg_session=; "));
        assert!(clear_cookie(SessionKind::User, false).contains("Max-Age=0"));
    }

    #[test]
    fn reads_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; vg_session=abc123"));
        headers.append(COOKIE, HeaderValue::from_static("vg_admin_session=xyz"));
        assert_eq!(read_cookie(&headers, USER_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(read_cookie(&headers, ADMIN_COOKIE).as_deref(), Some("xyz"));
        assert_eq!(read_cookie(&headers, "missing"), None);

        let mut empty = HeaderMap::new();
        empty.insert(COOKIE, HeaderValue::from_static("vg_session="));
        assert_eq!(read_cookie(&empty, USER_COOKIE), None);
    }

    #[tokio::test]
    async fn started_session_is_stored_hashed() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let id = Uuid::new_v4();
        let token = start_session(&store, SessionKind::User, id, Duration::hours(1), now)
            .await
            .unwrap();

        assert!(store.get_session(&token).await.unwrap().is_none());
        let session = store.get_session(&hash_token(&token)).await.unwrap().unwrap();
        assert_eq!(session.principal_id, id);
        assert_eq!(session.expires_at, now + Duration::hours(1));
    }
}
