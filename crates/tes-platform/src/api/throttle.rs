//! Per-user rate limits
//!
//! In-memory keyed limiter for event creation. State lives in the
//! process; a multi-instance deployment throttles per instance, which is
//! acceptable for an abuse brake.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

use crate::error::{Result, ServiceError};

pub struct CreateEventThrottle {
    limiter: RateLimiter<i64, DefaultKeyedStateStore<i64>, DefaultClock>,
}

impl CreateEventThrottle {
    /// Zero is treated as one; the limiter cannot express "never".
    pub fn new(per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(nonzero!(1u32));
        Self { limiter: RateLimiter::keyed(Quota::per_minute(per_minute)) }
    }

    pub fn check(&self, user_id: i64) -> Result<()> {
        self.limiter.check_key(&user_id).map_err(|_| ServiceError::Throttled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttles_per_user() {
        let throttle = CreateEventThrottle::new(2);
        assert!(throttle.check(1).is_ok());
        assert!(throttle.check(1).is_ok());
        assert!(throttle.check(1).is_err());
        // A different user has their own quota.
        assert!(throttle.check(2).is_ok());
    }

    #[test]
    fn throttled_error_is_429() {
        let throttle = CreateEventThrottle::new(1);
        throttle.check(7).unwrap();
        let err = throttle.check(7).unwrap_err();
        assert_eq!(err.to_string(), "Request was throttled.");
        assert_eq!(err.status_code(), axum::http::StatusCode::TOO_MANY_REQUESTS);
    }
}
