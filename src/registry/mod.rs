// src/registry/mod.rs

//! Owner of the live limiter instances.
//!
//! A [`LimiterRegistry`] holds at most one instance of each algorithm. Setup
//! validates first and then swaps the instance handle in one step, so a
//! decision racing a setup runs entirely against either the old or the new
//! instance. Nothing here is process-global: every transport layer or test
//! builds its own registry.

#[cfg(test)]
mod tests;

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::algorithms::{
    FixedWindowCounter, LeakingBucket, LimiterKind, ProcessReport, RateLimitAlgorithm,
    RateLimitStatus, SlidingWindowLog, TokenBucket,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{
    AppConfig, FixedWindowCounterConfig, LeakingBucketConfig, LimiterConfig,
    SlidingWindowLogConfig, TokenBucketConfig,
};
use crate::error::{RateLimiterError, Result};
use crate::{decision_event, maintenance_event};

/// One swappable instance handle.
#[derive(Debug)]
struct Slot<T> {
    kind: LimiterKind,
    current: RwLock<Option<Arc<T>>>,
    /// Bumped after every replace
    generation: watch::Sender<u64>,
}

impl<T> Slot<T> {
    fn new(kind: LimiterKind) -> Self {
        Self {
            kind,
            current: RwLock::new(None),
            generation: watch::Sender::new(0),
        }
    }

    fn get(&self) -> Result<Arc<T>> {
        self.current
            .read()
            .clone()
            .ok_or(RateLimiterError::NotInitialized(self.kind))
    }

    fn peek(&self) -> Option<Arc<T>> {
        self.current.read().clone()
    }

    fn replace(&self, instance: T) -> Arc<T> {
        let instance = Arc::new(instance);
        *self.current.write() = Some(Arc::clone(&instance));
        self.generation.send_modify(|g| *g += 1);
        instance
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}

/// Acknowledgment of a successful setup, echoing the accepted configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupReceipt {
    pub status: &'static str,
    pub algorithm: LimiterKind,
    pub config: serde_json::Value,
}

/// Registry of the live limiters, at most one per algorithm.
#[derive(Debug)]
pub struct LimiterRegistry {
    clock: Arc<dyn Clock>,
    token_bucket: Slot<TokenBucket>,
    leaking_bucket: Slot<LeakingBucket>,
    fixed_window_counter: Slot<FixedWindowCounter>,
    sliding_window_log: Slot<SlidingWindowLog>,
}

impl Default for LimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LimiterRegistry {
    /// Creates an empty registry on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty registry whose limiters read time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            token_bucket: Slot::new(LimiterKind::TokenBucket),
            leaking_bucket: Slot::new(LimiterKind::LeakingBucket),
            fixed_window_counter: Slot::new(LimiterKind::FixedWindowCounter),
            sliding_window_log: Slot::new(LimiterKind::SlidingWindowLog),
        }
    }

    /// Creates a registry and sets up every limiter named in `config`.
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let registry = Self::with_clock(clock);
        if let Some(tb) = config.token_bucket {
            registry.setup_token_bucket(tb)?;
        }
        if let Some(lb) = config.leaking_bucket {
            registry.setup_leaking_bucket(lb)?;
        }
        if let Some(fw) = config.fixed_window_counter {
            registry.setup_fixed_window_counter(fw)?;
        }
        if let Some(sw) = config.sliding_window_log {
            registry.setup_sliding_window_log(sw)?;
        }
        Ok(registry)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    // ---- setup ----

    pub fn setup_token_bucket(&self, config: TokenBucketConfig) -> Result<Arc<TokenBucket>> {
        let bucket = TokenBucket::new(config)
            .inspect_err(|e| log_rejected_setup(LimiterKind::TokenBucket, e))?;
        info!(
            capacity = config.capacity,
            refill_rate_per_minute = config.refill_rate_per_minute,
            "Token bucket initialized"
        );
        Ok(self.token_bucket.replace(bucket))
    }

    pub fn setup_leaking_bucket(&self, config: LeakingBucketConfig) -> Result<Arc<LeakingBucket>> {
        let bucket = LeakingBucket::new(config, self.clock())
            .inspect_err(|e| log_rejected_setup(LimiterKind::LeakingBucket, e))?;
        info!(
            bucket_size = config.bucket_size,
            outflow_rate_per_minute = config.outflow_rate_per_minute,
            "Leaking bucket initialized"
        );
        Ok(self.leaking_bucket.replace(bucket))
    }

    pub fn setup_fixed_window_counter(
        &self,
        config: FixedWindowCounterConfig,
    ) -> Result<Arc<FixedWindowCounter>> {
        let counter = FixedWindowCounter::new(config, self.clock())
            .inspect_err(|e| log_rejected_setup(LimiterKind::FixedWindowCounter, e))?;
        info!(
            max_number_req = config.max_number_req,
            time_interval = config.time_interval,
            "Fixed window counter initialized"
        );
        Ok(self.fixed_window_counter.replace(counter))
    }

    pub fn setup_sliding_window_log(
        &self,
        config: SlidingWindowLogConfig,
    ) -> Result<Arc<SlidingWindowLog>> {
        let log = SlidingWindowLog::new(config, self.clock())
            .inspect_err(|e| log_rejected_setup(LimiterKind::SlidingWindowLog, e))?;
        info!(
            max_req_allowed = config.max_req_allowed,
            time_window = config.time_window,
            "Sliding window log initialized"
        );
        Ok(self.sliding_window_log.replace(log))
    }

    /// Sets up a limiter from a raw JSON setup body.
    ///
    /// On any error the previous instance of that kind stays in place.
    pub fn setup_from_json(
        &self,
        kind: LimiterKind,
        body: serde_json::Value,
    ) -> Result<SetupReceipt> {
        let config = match kind {
            LimiterKind::TokenBucket => {
                let config = parse_setup::<TokenBucketConfig>(kind, body)?;
                self.setup_token_bucket(config)?;
                serde_json::to_value(config)?
            }
            LimiterKind::LeakingBucket => {
                let config = parse_setup::<LeakingBucketConfig>(kind, body)?;
                self.setup_leaking_bucket(config)?;
                serde_json::to_value(config)?
            }
            LimiterKind::FixedWindowCounter => {
                let config = parse_setup::<FixedWindowCounterConfig>(kind, body)?;
                self.setup_fixed_window_counter(config)?;
                serde_json::to_value(config)?
            }
            LimiterKind::SlidingWindowLog => {
                let config = parse_setup::<SlidingWindowLogConfig>(kind, body)?;
                self.setup_sliding_window_log(config)?;
                serde_json::to_value(config)?
            }
        };

        Ok(SetupReceipt {
            status: "initialized",
            algorithm: kind,
            config,
        })
    }

    // ---- decisions ----

    pub fn handle_token_bucket(&self) -> Result<RateLimitStatus> {
        Ok(decide(&*self.token_bucket.get()?))
    }

    pub fn add_request_to_queue(&self) -> Result<RateLimitStatus> {
        Ok(decide(&*self.leaking_bucket.get()?))
    }

    pub fn handle_request_fixed_window_counter(&self) -> Result<RateLimitStatus> {
        Ok(decide(&*self.fixed_window_counter.get()?))
    }

    pub fn handle_request_sliding_window_log(&self) -> Result<RateLimitStatus> {
        Ok(decide(&*self.sliding_window_log.get()?))
    }

    /// Routes a decision to the selected algorithm.
    pub fn handle(&self, kind: LimiterKind) -> Result<RateLimitStatus> {
        match kind {
            LimiterKind::TokenBucket => self.handle_token_bucket(),
            LimiterKind::LeakingBucket => self.add_request_to_queue(),
            LimiterKind::FixedWindowCounter => self.handle_request_fixed_window_counter(),
            LimiterKind::SlidingWindowLog => self.handle_request_sliding_window_log(),
        }
    }

    // ---- driver-triggered maintenance ----

    /// Refills the token bucket and returns its new token count.
    pub fn refill(&self) -> Result<u64> {
        let tokens = self.token_bucket.get()?.refill();
        maintenance_event!(LimiterKind::TokenBucket, "refill", tokens);
        Ok(tokens)
    }

    /// Drains the leaking bucket by one outflow step.
    pub fn process_requests(&self) -> Result<ProcessReport> {
        let report = self.leaking_bucket.get()?.process_requests();
        maintenance_event!(LimiterKind::LeakingBucket, "process_requests", report);
        Ok(report)
    }

    /// Starts a new fixed window and returns its count, always 0.
    pub fn handle_new_timeframe(&self) -> Result<usize> {
        let count = self.fixed_window_counter.get()?.handle_new_timeframe();
        maintenance_event!(LimiterKind::FixedWindowCounter, "handle_new_timeframe", count);
        Ok(count)
    }

    // ---- accessors ----

    pub fn token_bucket(&self) -> Result<Arc<TokenBucket>> {
        self.token_bucket.get()
    }

    pub fn leaking_bucket(&self) -> Result<Arc<LeakingBucket>> {
        self.leaking_bucket.get()
    }

    pub fn fixed_window_counter(&self) -> Result<Arc<FixedWindowCounter>> {
        self.fixed_window_counter.get()
    }

    pub fn sliding_window_log(&self) -> Result<Arc<SlidingWindowLog>> {
        self.sliding_window_log.get()
    }

    /// Receiver that changes every time a fixed window counter is set up.
    pub fn watch_fixed_window_counter(&self) -> watch::Receiver<u64> {
        self.fixed_window_counter.subscribe()
    }

    pub fn is_initialized(&self, kind: LimiterKind) -> bool {
        match kind {
            LimiterKind::TokenBucket => self.token_bucket.peek().is_some(),
            LimiterKind::LeakingBucket => self.leaking_bucket.peek().is_some(),
            LimiterKind::FixedWindowCounter => self.fixed_window_counter.peek().is_some(),
            LimiterKind::SlidingWindowLog => self.sliding_window_log.peek().is_some(),
        }
    }
}

fn decide<A: RateLimitAlgorithm + ?Sized>(limiter: &A) -> RateLimitStatus {
    let status = limiter.check_and_record();
    decision_event!(limiter.kind(), status);
    status
}

fn parse_setup<C: LimiterConfig>(kind: LimiterKind, body: serde_json::Value) -> Result<C> {
    C::from_json(body).inspect_err(|e| log_rejected_setup(kind, e))
}

fn log_rejected_setup(kind: LimiterKind, err: &RateLimiterError) {
    warn!(algorithm = kind.as_str(), error = %err, "Rejected limiter setup");
}
