//! Axum server setup
//!
//! Server skeleton with:
//! - Configured-origin CORS (credentials allowed for the session cookie)
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vgenie_core::config::{DatabaseConfig, ServerConfig};
use vgenie_core::GenieConfig;

use super::routes;
use crate::auth::PasswordHasher;
use crate::db::{self, PgStore};
use crate::email::{HttpMailer, LogMailer, MailError, Mailer};
use crate::payments::{DisabledGateway, PaymentError, PaymentGateway, StripeClient};
use crate::store::{Backoff, MemoryStore, ResilientStore, Store};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub hasher: PasswordHasher,
    pub config: GenieConfig,
}

impl AppState {
    /// Session lifetime for customer logins
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.config.session.ttl_hours.max(1))
    }

    pub fn free_limit(&self) -> u32 {
        self.config.pricing.free_monthly_valuations
    }
}

/// Open the configured store.
///
/// With a database URL: connect with retry, migrate, and wrap in the memory
/// fallback when enabled. A database that cannot be reached at all is only
/// fatal when the fallback is disabled.
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn Store>, ServerError> {
    let Some(url) = config.url.as_deref() else {
        tracing::warn!("No database URL configured, using in-memory store (data is lost on restart)");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let backoff = Backoff::with_attempts(config.connect_attempts);
    match db::connect_with_retry(url, config.max_connections, backoff).await {
        Ok(pool) => {
            db::migrations::run(&pool).await?;
            let store = PgStore::new(pool);
            if config.memory_fallback {
                tracing::info!("Using PostgreSQL store with in-memory fallback");
                Ok(Arc::new(ResilientStore::new(store)))
            } else {
                tracing::info!("Using PostgreSQL store");
                Ok(Arc::new(store))
            }
        }
        Err(e) if config.memory_fallback => {
            tracing::error!(error = %e, "Database unreachable, falling back to in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Build state from configuration: store, payment gateway and mailer
pub async fn build_state(config: GenieConfig) -> Result<AppState, ServerError> {
    let store = open_store(&config.database).await?;

    match store.delete_expired_sessions(Utc::now()).await {
        Ok(0) => {}
        Ok(n) => tracing::info!(count = n, "Purged expired sessions"),
        Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions"),
    }

    let payments: Arc<dyn PaymentGateway> = match config.stripe.secret_key.as_deref() {
        Some(key) => Arc::new(StripeClient::new(key, config.stripe.api_base.as_str())?),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, payment endpoints will return 503");
            Arc::new(DisabledGateway)
        }
    };
    if config.stripe.webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, webhooks will be rejected");
    }

    let mailer: Arc<dyn Mailer> = match config.email.api_key.as_deref() {
        Some(key) => Arc::new(HttpMailer::new(
            key,
            config.email.api_base.as_str(),
            config.email.from.as_str(),
        )?),
        None => {
            tracing::warn!("EMAIL_API_KEY not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    Ok(AppState {
        store,
        payments,
        mailer,
        hasher: PasswordHasher::default(),
        config,
    })
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Build the application router with all routes
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);
    let upload_limit = state.config.uploads.max_bytes;

    Router::new()
        .merge(routes::health::router())
        .merge(routes::industries::router())
        .merge(routes::auth::router())
        .merge(routes::valuations::router())
        .merge(routes::reports::router())
        .merge(routes::uploads::router(upload_limit))
        .merge(routes::payments::router())
        .merge(routes::webhooks::router())
        .merge(routes::subscriptions::router())
        .merge(routes::admin::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let state = build_state(GenieConfig::load(None)?).await?;
/// run_server(state).await?;
/// ```
pub async fn run_server(state: AppState) -> Result<(), ServerError> {
    let bind = state.config.server.bind;
    tracing::info!(
        store = ?state.store.mode(),
        payments = state.payments.is_configured(),
        "Application state ready"
    );
    let app = build_router(Arc::new(state));

    // Bind listener
    let listener = TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", bind);

    // Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("payment client error: {0}")]
    Payments(#[from] PaymentError),

    #[error("email client error: {0}")]
    Email(#[from] MailError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreMode;

    #[tokio::test]
    async fn no_database_url_uses_memory() {
        let store = open_store(&DatabaseConfig::default()).await.unwrap();
        assert_eq!(store.mode(), StoreMode::Memory);
    }

    #[tokio::test]
    async fn unreachable_database_falls_back_when_allowed() {
        let config = DatabaseConfig {
            url: Some("postgres://vgenie@127.0.0.1:1/vgenie".into()),
            connect_attempts: 1,
            ..DatabaseConfig::default()
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.mode(), StoreMode::Memory);

        let strict = DatabaseConfig {
            memory_fallback: false,
            ..config
        };
        assert!(open_store(&strict).await.is_err());
    }

    #[tokio::test]
    async fn default_state_has_disabled_integrations() {
        let state = build_state(GenieConfig::default()).await.unwrap();
        assert!(!state.payments.is_configured());
        assert_eq!(state.session_ttl(), chrono::Duration::days(30));
        assert_eq!(state.free_limit(), 3);
    }
}
