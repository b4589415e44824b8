// src/config/mod.rs

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::{RateLimiterError, Result};

/// Shared decoding for the per-algorithm setup bodies.
pub trait LimiterConfig: DeserializeOwned + Sized {
    /// Rejects parameters that are not strictly positive.
    fn validate(&self) -> Result<()>;

    /// Decodes and validates a setup body.
    ///
    /// Missing fields, non-integers and negative numbers fail to decode; zero
    /// fails validation. Both are reported as `InvalidConfiguration`.
    fn from_json(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }
}

fn require_positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(RateLimiterError::InvalidConfiguration(format!(
            "{} must be greater than 0",
            field
        )));
    }
    Ok(())
}

/// Longest window a limiter accepts, in seconds.
const MAX_WINDOW_SECS: u64 = i64::MAX as u64 / 1_000;

fn require_window(field: &str, secs: u64) -> Result<()> {
    require_positive(field, secs)?;
    if secs > MAX_WINDOW_SECS {
        return Err(RateLimiterError::InvalidConfiguration(format!(
            "{} must be at most {} seconds",
            field, MAX_WINDOW_SECS
        )));
    }
    Ok(())
}

/// Configuration for token bucket algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBucketConfig {
    /// Capacity of the token bucket, also the initial token count
    pub capacity: u64,

    /// Tokens added by each refill
    pub refill_rate_per_minute: u64,
}

impl LimiterConfig for TokenBucketConfig {
    fn validate(&self) -> Result<()> {
        require_positive("capacity", self.capacity)?;
        require_positive("refill_rate_per_minute", self.refill_rate_per_minute)
    }
}

/// Configuration for leaking bucket algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakingBucketConfig {
    /// Maximum number of queued requests
    pub bucket_size: u64,

    /// Requests drained by each processing pass
    pub outflow_rate_per_minute: u64,
}

impl LimiterConfig for LeakingBucketConfig {
    fn validate(&self) -> Result<()> {
        require_positive("bucket_size", self.bucket_size)?;
        require_positive("outflow_rate_per_minute", self.outflow_rate_per_minute)
    }
}

/// Configuration for fixed window counter algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWindowCounterConfig {
    /// Maximum number of requests allowed in the window
    pub max_number_req: u64,

    /// Window length in seconds, used by the driver to schedule rollover
    pub time_interval: u64,
}

impl LimiterConfig for FixedWindowCounterConfig {
    fn validate(&self) -> Result<()> {
        require_positive("max_number_req", self.max_number_req)?;
        require_window("time_interval", self.time_interval)
    }
}

/// Configuration for sliding window log algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidingWindowLogConfig {
    /// Maximum number of requests allowed in the window
    pub max_req_allowed: u64,

    /// Window length in seconds
    pub time_window: u64,
}

impl LimiterConfig for SlidingWindowLogConfig {
    fn validate(&self) -> Result<()> {
        require_positive("max_req_allowed", self.max_req_allowed)?;
        require_window("time_window", self.time_window)
    }
}

/// Cadence of the background maintenance driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// How often the token bucket is refilled
    #[serde(default = "default_minute", with = "duration_serde")]
    pub refill_interval: Duration,

    /// How often the leaking bucket is drained
    #[serde(default = "default_minute", with = "duration_serde")]
    pub drain_interval: Duration,

    /// How long the window task waits before looking again when no fixed
    /// window counter is configured
    #[serde(default = "default_idle_poll", with = "duration_serde")]
    pub idle_poll_interval: Duration,
}

fn default_minute() -> Duration {
    Duration::from_secs(60)
}

fn default_idle_poll() -> Duration {
    Duration::from_secs(1)
}

impl DriverConfig {
    /// Rejects zero periods, which the tick loops cannot run on.
    pub fn validate(&self) -> Result<()> {
        for (name, period) in [
            ("refill_interval", self.refill_interval),
            ("drain_interval", self.drain_interval),
            ("idle_poll_interval", self.idle_poll_interval),
        ] {
            if period.is_zero() {
                return Err(RateLimiterError::Config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            refill_interval: default_minute(),
            drain_interval: default_minute(),
            idle_poll_interval: default_idle_poll(),
        }
    }
}

/// Settings for the service binary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub driver: DriverConfig,

    /// Limiters to set up at startup
    #[serde(default)]
    pub token_bucket: Option<TokenBucketConfig>,
    #[serde(default)]
    pub leaking_bucket: Option<LeakingBucketConfig>,
    #[serde(default)]
    pub fixed_window_counter: Option<FixedWindowCounterConfig>,
    #[serde(default)]
    pub sliding_window_log: Option<SlidingWindowLogConfig>,
}

pub const REFILL_INTERVAL_ENV: &str = "RATE_LIMITER_REFILL_INTERVAL_MS";
pub const DRAIN_INTERVAL_ENV: &str = "RATE_LIMITER_DRAIN_INTERVAL_MS";
pub const IDLE_POLL_ENV: &str = "RATE_LIMITER_IDLE_POLL_MS";
/// Optional JSON settings file; interval variables override its values.
pub const CONFIG_FILE_ENV: &str = "RATE_LIMITER_CONFIG_FILE";

impl AppConfig {
    /// Builds settings from the process environment, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(path)?,
            None => AppConfig::default(),
        };
        if let Some(ms) = millis_var(&lookup, REFILL_INTERVAL_ENV)? {
            config.driver.refill_interval = ms;
        }
        if let Some(ms) = millis_var(&lookup, DRAIN_INTERVAL_ENV)? {
            config.driver.drain_interval = ms;
        }
        if let Some(ms) = millis_var(&lookup, IDLE_POLL_ENV)? {
            config.driver.idle_poll_interval = ms;
        }
        Ok(config)
    }

    /// Loads settings from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RateLimiterError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = serde_json::from_str(&contents)
            .map_err(|e| RateLimiterError::Config(format!("{}: {}", path.display(), e)))?;
        config.driver.validate()?;
        Ok(config)
    }
}

fn millis_var<F>(lookup: &F, name: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let millis: u64 = raw.trim().parse().map_err(|_| {
        RateLimiterError::Config(format!("{} must be a whole number of milliseconds", name))
    })?;
    if millis == 0 {
        return Err(RateLimiterError::Config(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(Some(Duration::from_millis(millis)))
}

// Helper module to serialize/deserialize Duration with serde
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
