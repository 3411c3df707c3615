//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Default cap on combat actions per second per connection
pub const DEFAULT_ACTION_RATE_LIMIT: u32 = 30;

/// Per-connection action rate limiter
#[derive(Clone)]
pub struct ActionRateLimiter {
    limiter: Arc<Limiter>,
}

impl ActionRateLimiter {
    pub fn new(actions_per_second: u32) -> Self {
        Self {
            limiter: create_limiter(actions_per_second),
        }
    }

    /// Check if an action message is allowed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for ActionRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_RATE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_beyond_quota_is_rejected() {
        let limiter = ActionRateLimiter::new(3);
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }
}
