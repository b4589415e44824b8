// src/algorithms/leaking_bucket.rs

use crate::algorithms::{LimiterKind, RateLimitAlgorithm, RateLimitStatus, StatusDetails};
use crate::clock::{Clock, Timestamp};
use crate::config::{LeakingBucketConfig, LimiterConfig};
use crate::error::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// Leaking Bucket rate limiting algorithm
///
/// Admitted requests wait in a bounded FIFO queue. The queue only shrinks
/// when a driver calls [`LeakingBucket::process_requests`], which drains at
/// most `outflow_rate_per_minute` entries from the head. Admission and
/// draining are decoupled: a full queue rejects until the next drain.
#[derive(Debug)]
pub struct LeakingBucket {
    config: LeakingBucketConfig,
    clock: Arc<dyn Clock>,
    /// Arrival timestamps, oldest first
    queue: Mutex<VecDeque<Timestamp>>,
}

/// Outcome of one drain pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    /// Requests still waiting after the pass
    pub queue_size: usize,

    /// Requests removed by the pass
    pub processed_request: u64,
}

impl LeakingBucket {
    pub fn new(config: LeakingBucketConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            queue: Mutex::new(VecDeque::new()),
        })
    }

    pub fn config(&self) -> &LeakingBucketConfig {
        &self.config
    }

    /// Enqueues the request if the bucket has room.
    pub fn add_request(&self) -> bool {
        self.check_and_record().allowed
    }

    /// Drains up to `outflow_rate_per_minute` requests in arrival order.
    pub fn process_requests(&self) -> ProcessReport {
        let mut queue = self.queue.lock();
        let mut processed_request = 0;
        while processed_request < self.config.outflow_rate_per_minute {
            if queue.pop_front().is_none() {
                break;
            }
            processed_request += 1;
        }
        ProcessReport {
            queue_size: queue.len(),
            processed_request,
        }
    }

    pub fn queue_size(&self) -> usize {
        self.queue.lock().len()
    }

    /// Snapshot of the waiting requests, oldest first.
    pub fn queued(&self) -> Vec<Timestamp> {
        self.queue.lock().iter().copied().collect()
    }

    fn bucket_size(&self) -> usize {
        usize::try_from(self.config.bucket_size).unwrap_or(usize::MAX)
    }
}

impl RateLimitAlgorithm for LeakingBucket {
    fn kind(&self) -> LimiterKind {
        LimiterKind::LeakingBucket
    }

    fn check_and_record(&self) -> RateLimitStatus {
        let mut queue = self.queue.lock();
        let allowed = queue.len() < self.bucket_size();
        if allowed {
            queue.push_back(self.clock.now());
        }
        let queue_size = queue.len();

        RateLimitStatus {
            allowed,
            remaining: self.config.bucket_size.saturating_sub(queue_size as u64),
            limit: self.config.bucket_size,
            details: StatusDetails::LeakingBucket { queue_size },
        }
    }
}
