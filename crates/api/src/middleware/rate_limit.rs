//! Per-user upload quota.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use sikjipsa_core::error::CoreError;
use sikjipsa_core::types::DbId;

use crate::error::AppError;

/// Keyed token bucket: `per_hour` uploads, replenished evenly over the hour.
pub struct UploadRateLimiter {
    limiter: RateLimiter<DbId, DefaultKeyedStateStore<DbId>, DefaultClock>,
}

impl UploadRateLimiter {
    /// A zero quota is treated as one upload per hour.
    pub fn per_hour(per_hour: u32) -> Self {
        let burst = NonZeroU32::new(per_hour).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(Quota::per_hour(burst))
    }

    fn with_quota(quota: Quota) -> Self {
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// Drop buckets that have fully refilled. Returns how many remain.
    pub fn prune(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    /// Consume one upload from the user's bucket.
    pub fn check(&self, user_id: DbId) -> Result<(), AppError> {
        self.limiter.check_key(&user_id).map_err(|_| {
            tracing::warn!(user_id, "Upload quota exceeded");
            AppError::Core(CoreError::RateLimited(
                "Too many diagnosis requests. Please try again later.".into(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn quota_is_enforced_per_user() {
        let limiter = UploadRateLimiter::per_hour(2);

        assert!(limiter.check(1).is_ok());
        assert!(limiter.check(1).is_ok());
        assert_matches!(
            limiter.check(1),
            Err(AppError::Core(CoreError::RateLimited(_)))
        );

        assert!(limiter.check(2).is_ok());
    }

    #[test]
    fn prune_forgets_refilled_buckets() {
        let limiter = UploadRateLimiter::with_quota(
            Quota::with_period(Duration::from_millis(1)).unwrap(),
        );
        limiter.check(1).unwrap();
        limiter.check(2).unwrap();
        assert_eq!(limiter.limiter.len(), 2);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(limiter.prune(), 0);
    }

    #[test]
    fn prune_keeps_recent_buckets() {
        let limiter = UploadRateLimiter::per_hour(5);
        limiter.check(1).unwrap();
        assert_eq!(limiter.prune(), 1);
    }

    #[test]
    fn zero_quota_still_allows_one() {
        let limiter = UploadRateLimiter::per_hour(0);
        assert!(limiter.check(7).is_ok());
        assert!(limiter.check(7).is_err());
    }
}
