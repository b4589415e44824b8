// src/algorithms/sliding_window.rs

use crate::algorithms::{LimiterKind, RateLimitAlgorithm, RateLimitStatus, StatusDetails};
use crate::clock::{Clock, Timestamp};
use crate::config::{LimiterConfig, SlidingWindowLogConfig};
use crate::error::{RateLimiterError, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Sliding Window Log rate limiting algorithm
///
/// Keeps the timestamp of every admitted request. Each decision first prunes
/// entries older than `time_window` seconds, so cleanup and admission happen
/// in the same critical section and there is no separate sweep.
///
/// Two views of pruned entries are kept apart:
/// - the *outdated* set holds only what the latest decision pruned and is
///   replaced every call;
/// - the *removed* history accumulates everything ever pruned and only grows.
#[derive(Debug)]
pub struct SlidingWindowLog {
    config: SlidingWindowLogConfig,
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
    state: Mutex<SlidingWindowState>,
}

#[derive(Debug, Default)]
struct SlidingWindowState {
    /// Admissions still inside the window, oldest first
    log: Vec<Timestamp>,
    /// Entries pruned by the most recent decision
    outdated: Vec<Timestamp>,
    /// Every entry ever pruned
    removed: Vec<Timestamp>,
}

impl SlidingWindowLog {
    pub fn new(config: SlidingWindowLogConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let window = i64::try_from(config.time_window)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                RateLimiterError::InvalidConfiguration("time_window is out of range".into())
            })?;

        Ok(Self {
            config,
            clock,
            window,
            state: Mutex::new(SlidingWindowState::default()),
        })
    }

    pub fn config(&self) -> &SlidingWindowLogConfig {
        &self.config
    }

    pub fn handle_request(&self) -> bool {
        self.check_and_record().allowed
    }

    /// Timestamps currently inside the window, as of the last decision.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.state.lock().log.clone()
    }

    /// Timestamps pruned by the most recent decision.
    pub fn outdated_timestamps(&self) -> Vec<Timestamp> {
        self.state.lock().outdated.clone()
    }

    /// Every timestamp pruned since setup.
    pub fn removed_timestamps(&self) -> Vec<Timestamp> {
        self.state.lock().removed.clone()
    }

    fn max_requests(&self) -> usize {
        usize::try_from(self.config.max_req_allowed).unwrap_or(usize::MAX)
    }
}

impl RateLimitAlgorithm for SlidingWindowLog {
    fn kind(&self) -> LimiterKind {
        LimiterKind::SlidingWindowLog
    }

    fn check_and_record(&self) -> RateLimitStatus {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let (valid, outdated): (Vec<Timestamp>, Vec<Timestamp>) = state
            .log
            .drain(..)
            .partition(|&t| now.signed_duration_since(t) <= self.window);
        state.log = valid;
        state.removed.extend_from_slice(&outdated);
        state.outdated = outdated;

        let allowed = state.log.len() < self.max_requests();
        if allowed {
            state.log.push(now);
        }

        let num_of_request = state.log.len();
        RateLimitStatus {
            allowed,
            remaining: self
                .config
                .max_req_allowed
                .saturating_sub(num_of_request as u64),
            limit: self.config.max_req_allowed,
            details: StatusDetails::SlidingWindowLog {
                num_of_request,
                outdated_req: state.outdated.len(),
                timestamps: state.log.clone(),
                outdated_timestamps: state.outdated.clone(),
            },
        }
    }
}
