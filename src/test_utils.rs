// src/test_utils.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use crate::algorithms::RateLimitAlgorithm;
use crate::clock::{Clock, ManualClock};
use crate::config::{
    FixedWindowCounterConfig, LeakingBucketConfig, SlidingWindowLogConfig, TokenBucketConfig,
};
use crate::registry::LimiterRegistry;

/// A manual clock pinned to a fixed, readable start time
pub fn test_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
}

/// The same clock as a shareable trait object
pub fn shared(clock: &ManualClock) -> Arc<dyn Clock> {
    Arc::new(clock.clone())
}

/// Registry on a manual clock, plus the handle to advance it
pub fn create_test_registry() -> (LimiterRegistry, ManualClock) {
    let clock = test_clock();
    (LimiterRegistry::with_clock(shared(&clock)), clock)
}

/// Sets up every algorithm with small, valid parameters
pub fn setup_all(registry: &LimiterRegistry) {
    registry
        .setup_token_bucket(TokenBucketConfig {
            capacity: 2,
            refill_rate_per_minute: 1,
        })
        .unwrap();
    registry
        .setup_leaking_bucket(LeakingBucketConfig {
            bucket_size: 2,
            outflow_rate_per_minute: 1,
        })
        .unwrap();
    registry
        .setup_fixed_window_counter(FixedWindowCounterConfig {
            max_number_req: 2,
            time_interval: 60,
        })
        .unwrap();
    registry
        .setup_sliding_window_log(SlidingWindowLogConfig {
            max_req_allowed: 2,
            time_window: 60,
        })
        .unwrap();
}

/// Runs `request_count` decisions, advancing the clock by `between` after
/// each, and returns how many were admitted
pub fn count_admitted<A: RateLimitAlgorithm + ?Sized>(
    limiter: &A,
    clock: &ManualClock,
    request_count: usize,
    between: Duration,
) -> usize {
    let mut allowed_count = 0;
    for _ in 0..request_count {
        if limiter.handle() {
            allowed_count += 1;
        }
        clock.advance(between);
    }
    allowed_count
}

