// src/algorithms/mod.rs

pub mod fixed_window;
pub mod leaking_bucket;
pub mod sliding_window;
pub mod token_bucket;

#[cfg(test)]
mod tests;

pub use fixed_window::FixedWindowCounter;
pub use leaking_bucket::{LeakingBucket, ProcessReport};
pub use sliding_window::SlidingWindowLog;
pub use token_bucket::TokenBucket;

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// The four admission algorithms the crate provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimiterKind {
    TokenBucket,
    LeakingBucket,
    FixedWindowCounter,
    SlidingWindowLog,
}

impl LimiterKind {
    pub const ALL: [LimiterKind; 4] = [
        LimiterKind::TokenBucket,
        LimiterKind::LeakingBucket,
        LimiterKind::FixedWindowCounter,
        LimiterKind::SlidingWindowLog,
    ];

    /// Stable identifier used in logs and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimiterKind::TokenBucket => "token_bucket",
            LimiterKind::LeakingBucket => "leaking_bucket",
            LimiterKind::FixedWindowCounter => "fixed_window_counter",
            LimiterKind::SlidingWindowLog => "sliding_window_log",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        LimiterKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for LimiterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LimiterKind::TokenBucket => "token bucket",
            LimiterKind::LeakingBucket => "leaking bucket",
            LimiterKind::FixedWindowCounter => "fixed window counter",
            LimiterKind::SlidingWindowLog => "sliding window log",
        };
        f.write_str(name)
    }
}

/// Status returned by an admission decision
///
/// Every field is captured inside the limiter's critical section, so it
/// reflects the state right after this decision and nothing later.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStatus {
    /// Whether the request was admitted
    pub allowed: bool,

    /// How many more requests could be admitted right now
    pub remaining: u64,

    /// Configured ceiling of the limiter
    pub limit: u64,

    /// State specific to the algorithm
    pub details: StatusDetails,
}

/// Algorithm-specific state reported alongside a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum StatusDetails {
    TokenBucket {
        tokens: u64,
    },
    LeakingBucket {
        queue_size: usize,
    },
    FixedWindowCounter {
        num_of_request: usize,
    },
    SlidingWindowLog {
        num_of_request: usize,
        outdated_req: usize,
        timestamps: Vec<Timestamp>,
        outdated_timestamps: Vec<Timestamp>,
    },
}

/// Core trait that all rate limiting algorithms implement
pub trait RateLimitAlgorithm: Send + Sync + Debug {
    /// Which of the four algorithms this is
    fn kind(&self) -> LimiterKind;

    /// Decides on a request arriving now, recording it if admitted, and
    /// reports the resulting state
    fn check_and_record(&self) -> RateLimitStatus;

    /// Decides on a request arriving now
    fn handle(&self) -> bool {
        self.check_and_record().allowed
    }
}
