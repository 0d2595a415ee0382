//! Credentials and cookie sessions
//!
//! The request extractors that enforce these live in
//! [`crate::http::extractors`].

pub mod password;
pub mod session;

pub use password::{PasswordHasher, Verification};
pub use session::{clear_cookie, session_cookie, start_session};
