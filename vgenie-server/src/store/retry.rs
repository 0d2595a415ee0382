//! Exponential backoff for transient failures

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Backoff schedule: `base_delay` doubled after each failed attempt, capped
/// at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl Backoff {
    pub fn with_attempts(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `f` until it succeeds or the attempts are used up, returning the
/// last error.
pub async fn retry_with_backoff<T, E, F, Fut>(what: &str, backoff: Backoff, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = backoff.attempts.max(1);
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= attempts => {
                tracing::error!(%err, attempts, "{} failed, giving up", what);
                return Err(err);
            }
            Err(err) => {
                let delay = backoff.delay(attempt);
                tracing::warn!(
                    %err,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "{} failed, retrying",
                    what
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
