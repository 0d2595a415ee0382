//! Input validation shared by the API and CLI

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GenieError, Result};

const MAX_EMAIL_LEN: usize = 254;

/// Minimum password length accepted at signup
pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// Pragmatic address check: one `@`, no whitespace, a dot in the domain
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("invalid email regex")
});

/// Trim and lowercase an email, then validate its shape.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(GenieError::validation("email", "cannot be empty"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(GenieError::validation(
            "email",
            format!("exceeds maximum length of {} characters", MAX_EMAIL_LEN),
        ));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(GenieError::validation("email", "is not a valid email address"));
    }
    Ok(email)
}

/// Length bounds only; composition rules are left to the user.
pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(GenieError::validation(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(GenieError::validation(
            "password",
            format!("exceeds maximum length of {} characters", MAX_PASSWORD_LEN),
        ));
    }
    Ok(())
}
