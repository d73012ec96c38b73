//! Session expiry.
//!
//! Expiry is discovered when a session is next touched, never scheduled.

use chrono::Duration;

use crate::domain::foundation::Timestamp;

/// Default time a session may stay non-terminal.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 90;

/// Pure expiry test: true once `now` is at or past `created_at + ttl`.
pub fn is_expired(now: Timestamp, created_at: Timestamp, ttl: Duration) -> bool {
    now.duration_since(&created_at) >= ttl
}

/// Expiry configuration handed to components that evaluate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    ttl: Duration,
}

impl ExpiryPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_expired(&self, now: Timestamp, created_at: Timestamp) -> bool {
        is_expired(now, created_at, self.ttl)
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_SESSION_TTL_MINUTES)
    }
}
