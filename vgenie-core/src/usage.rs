//! Monthly valuation allowance for free accounts

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Default number of valuations a free account may create per calendar month
pub const DEFAULT_FREE_MONTHLY_VALUATIONS: u32 = 3;

/// Usage counter as persisted on the user row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageState {
    pub count: u32,
    pub period_start: DateTime<Utc>,
}

/// Outcome of asking for one more valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageDecision {
    /// Allowed; persist the returned state
    Allowed(UsageState),
    /// Free allowance exhausted for the current month
    LimitReached { limit: u32 },
}

impl UsageState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            period_start: now,
        }
    }

    /// The counter as of `now`: reset when the stored period is another month.
    pub fn current(self, now: DateTime<Utc>) -> Self {
        if same_month(self.period_start, now) {
            self
        } else {
            Self::new(now)
        }
    }

    /// Valuations left this month, `None` meaning unlimited
    pub fn remaining(self, now: DateTime<Utc>, limit: u32, lifetime: bool) -> Option<u32> {
        if lifetime {
            None
        } else {
            Some(limit.saturating_sub(self.current(now).count))
        }
    }

    /// Consume one valuation from the allowance.
    ///
    /// Lifetime access overrides the limit but is still counted.
    pub fn consume(self, now: DateTime<Utc>, limit: u32, lifetime: bool) -> UsageDecision {
        let current = self.current(now);
        if !lifetime && current.count >= limit {
            return UsageDecision::LimitReached { limit };
        }
        UsageDecision::Allowed(Self {
            count: current.count.saturating_add(1),
            period_start: current.period_start,
        })
    }
}

fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn consumes_until_limit() {
        let now = at(2026, 3, 10);
        let mut state = UsageState::new(now);
        for _ in 0..3 {
            match state.consume(now, 3, false) {
                UsageDecision::Allowed(next) => state = next,
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(state.count, 3);
        assert_eq!(state.consume(now, 3, false), UsageDecision::LimitReached { limit: 3 });
        assert_eq!(state.remaining(now, 3, false), Some(0));
    }

    #[test]
    fn resets_in_new_month() {
        let state = UsageState {
            count: 3,
            period_start: at(2026, 1, 31),
        };
        let now = at(2026, 2, 1);
        assert_eq!(state.remaining(now, 3, false), Some(3));
        match state.consume(now, 3, false) {
            UsageDecision::Allowed(next) => {
                assert_eq!(next.count, 1);
                assert_eq!(next.period_start, now);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn same_month_different_year_resets() {
        let state = UsageState {
            count: 5,
            period_start: at(2025, 6, 1),
        };
        assert_eq!(state.current(at(2026, 6, 1)).count, 0);
    }

    #[test]
    fn lifetime_ignores_limit() {
        let now = at(2026, 3, 10);
        let state = UsageState { count: 50, period_start: now };
        assert!(matches!(state.consume(now, 3, true), UsageDecision::Allowed(s) if s.count == 51));
        assert_eq!(state.remaining(now, 3, true), None);
    }
}
