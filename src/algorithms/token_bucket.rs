// src/algorithms/token_bucket.rs

use crate::algorithms::{LimiterKind, RateLimitAlgorithm, RateLimitStatus, StatusDetails};
use crate::config::{LimiterConfig, TokenBucketConfig};
use crate::error::Result;
use parking_lot::Mutex;

/// Token Bucket rate limiting algorithm
///
/// The bucket starts full. Each admitted request consumes one token and a
/// request arriving at an empty bucket is rejected. Tokens come back only
/// through [`TokenBucket::refill`], which a driver calls at its own cadence.
#[derive(Debug)]
pub struct TokenBucket {
    /// Configuration for the token bucket
    config: TokenBucketConfig,

    /// Tokens currently available, always within `0..=capacity`
    tokens: Mutex<u64>,
}

impl TokenBucket {
    /// Creates a full token bucket, rejecting invalid configuration.
    pub fn new(config: TokenBucketConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tokens: Mutex::new(config.capacity),
        })
    }

    pub fn config(&self) -> &TokenBucketConfig {
        &self.config
    }

    /// Consumes one token if any is left.
    pub fn handle_request(&self) -> bool {
        self.check_and_record().allowed
    }

    /// Adds `refill_rate_per_minute` tokens, saturating at capacity, and
    /// returns the new count.
    pub fn refill(&self) -> u64 {
        let mut tokens = self.tokens.lock();
        *tokens = self
            .config
            .capacity
            .min(tokens.saturating_add(self.config.refill_rate_per_minute));
        *tokens
    }

    /// Current token count.
    pub fn tokens(&self) -> u64 {
        *self.tokens.lock()
    }

    fn status(&self, allowed: bool, tokens: u64) -> RateLimitStatus {
        RateLimitStatus {
            allowed,
            remaining: tokens,
            limit: self.config.capacity,
            details: StatusDetails::TokenBucket { tokens },
        }
    }
}

impl RateLimitAlgorithm for TokenBucket {
    fn kind(&self) -> LimiterKind {
        LimiterKind::TokenBucket
    }

    fn check_and_record(&self) -> RateLimitStatus {
        let mut tokens = self.tokens.lock();
        let allowed = *tokens > 0;
        if allowed {
            *tokens -= 1;
        }
        self.status(allowed, *tokens)
    }
}
