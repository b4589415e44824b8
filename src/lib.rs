// library entry
pub mod algorithms;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export key components for convenience
pub use algorithms::{
    FixedWindowCounter, LeakingBucket, LimiterKind, ProcessReport, RateLimitAlgorithm,
    RateLimitStatus, SlidingWindowLog, StatusDetails, TokenBucket,
};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use driver::MaintenanceDriver;
pub use error::{RateLimiterError, Result, DECISION_STATUS, SETUP_STATUS};
pub use logging::init as init_logging;
pub use registry::{LimiterRegistry, SetupReceipt};
