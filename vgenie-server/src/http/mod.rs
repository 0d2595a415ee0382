//! HTTP server layer
//!
//! Axum server with:
//! - CORS restricted to configured origins
//! - Request tracing
//! - Graceful shutdown
//! - JSON error responses

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, build_state, open_store, run_server, AppState, ServerError};
