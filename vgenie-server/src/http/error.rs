//! API error types with IntoResponse
//!
//! Errors are converted to `{"error": code, "message": text}` JSON
//! responses with the matching status code. Server-side failures are
//! logged and answered with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use vgenie_core::GenieError;

use crate::email::MailError;
use crate::payments::PaymentError;
use crate::store::StoreError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Input failed validation (400)
    Validation { field: String, reason: String },

    /// Malformed request that is not a field error (400)
    BadRequest { message: String },

    /// Missing or invalid credentials (401)
    Unauthorized { message: &'static str },

    /// Paywall or free-plan limit (402)
    PaymentRequired { message: String },

    /// Authenticated but not allowed (403)
    Forbidden { reason: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Uniqueness or state conflict (409)
    Conflict { message: String },

    /// Body over the configured limit (413)
    PayloadTooLarge { limit: usize },

    /// File type not accepted (415)
    UnsupportedMediaType { message: String },

    /// Payment or email provider failed (502, logged)
    Upstream { message: String },

    /// Feature needs configuration that is absent (503)
    Unavailable { message: String },

    /// Database error (500, logged)
    Database(StoreError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized {
            message: "authentication required",
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match self {
            Self::Validation { field, reason } => ("validation_error", format!("{}: {}", field, reason)),
            Self::BadRequest { message } => ("bad_request", message),
            Self::Unauthorized { message } => ("unauthorized", message.to_string()),
            Self::PaymentRequired { message } => ("payment_required", message),
            Self::Forbidden { reason } => ("forbidden", reason),
            Self::NotFound { resource, id } => ("not_found", format!("{} '{}' not found", resource, id)),
            Self::Conflict { message } => ("conflict", message),
            Self::PayloadTooLarge { limit } => (
                "payload_too_large",
                format!("upload exceeds the {} byte limit", limit),
            ),
            Self::UnsupportedMediaType { message } => ("unsupported_media_type", message),
            Self::Upstream { message } => {
                tracing::error!("Upstream error: {}", message);
                ("upstream_error", "a downstream service failed, please retry".to_string())
            }
            Self::Unavailable { message } => ("unavailable", message),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                ("internal_error", "an internal error occurred".to_string())
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                ("internal_error", "an internal error occurred".to_string())
            }
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

impl From<GenieError> for ApiError {
    fn from(e: GenieError) -> Self {
        match e {
            GenieError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { resource, id } => Self::NotFound { resource, id },
            StoreError::Conflict { resource, key } => Self::Conflict {
                message: format!("{} '{}' already exists", resource, key),
            },
            _ => Self::Database(e),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::NotConfigured => Self::Unavailable {
                message: "payments are not configured".to_string(),
            },
            PaymentError::InvalidSignature(reason) => {
                tracing::warn!(%reason, "Rejected webhook signature");
                Self::bad_request("invalid signature")
            }
            PaymentError::InvalidRequest(message) => Self::BadRequest { message },
            PaymentError::Api { status, message } if (400..500).contains(&status) => {
                Self::PaymentRequired { message }
            }
            other => Self::Upstream {
                message: other.to_string(),
            },
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::internal(format!("background task failed: {}", e))
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        Self::Upstream {
            message: e.to_string(),
        }
    }
}
