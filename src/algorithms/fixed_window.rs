// src/algorithms/fixed_window.rs

use crate::algorithms::{LimiterKind, RateLimitAlgorithm, RateLimitStatus, StatusDetails};
use crate::clock::{Clock, Timestamp};
use crate::config::{FixedWindowCounterConfig, LimiterConfig};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Fixed Window rate limiting algorithm
///
/// Counts admitted requests in the current window and rejects once
/// `max_number_req` is reached. The window does not roll over by itself: a
/// driver calls [`FixedWindowCounter::handle_new_timeframe`] at whatever
/// boundary policy it chooses, typically every `time_interval` seconds.
#[derive(Debug)]
pub struct FixedWindowCounter {
    config: FixedWindowCounterConfig,
    clock: Arc<dyn Clock>,
    /// Admission timestamps of the current window
    window: Mutex<Vec<Timestamp>>,
}

impl FixedWindowCounter {
    pub fn new(config: FixedWindowCounterConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            window: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &FixedWindowCounterConfig {
        &self.config
    }

    pub fn handle_request(&self) -> bool {
        self.check_and_record().allowed
    }

    /// Starts a fresh window and returns its count, which is always 0.
    pub fn handle_new_timeframe(&self) -> usize {
        let mut window = self.window.lock();
        window.clear();
        window.len()
    }

    /// Length of one window, for scheduling rollover.
    pub fn time_interval(&self) -> Duration {
        Duration::from_secs(self.config.time_interval)
    }

    pub fn request_count(&self) -> usize {
        self.window.lock().len()
    }

    /// Snapshot of the admissions in the current window.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.window.lock().clone()
    }

    fn max_requests(&self) -> usize {
        usize::try_from(self.config.max_number_req).unwrap_or(usize::MAX)
    }
}

impl RateLimitAlgorithm for FixedWindowCounter {
    fn kind(&self) -> LimiterKind {
        LimiterKind::FixedWindowCounter
    }

    fn check_and_record(&self) -> RateLimitStatus {
        let mut window = self.window.lock();
        let allowed = window.len() < self.max_requests();
        if allowed {
            window.push(self.clock.now());
        }
        let num_of_request = window.len();

        RateLimitStatus {
            allowed,
            remaining: self
                .config
                .max_number_req
                .saturating_sub(num_of_request as u64),
            limit: self.config.max_number_req,
            details: StatusDetails::FixedWindowCounter { num_of_request },
        }
    }
}
