// for error definitions
use crate::algorithms::LimiterKind;
use thiserror::Error;

/// Status code a transport layer should answer with after a successful setup.
pub const SETUP_STATUS: u16 = 201;

/// Status code for a completed decision or maintenance call, accepted or not.
pub const DECISION_STATUS: u16 = 200;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimiterError {
    /// Setup parameters were missing, non-integer or not strictly positive
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A decision or maintenance call reached a limiter that was never set up
    #[error("{0} not initialized")]
    NotInitialized(LimiterKind),

    /// Application settings (environment or file) could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RateLimiterError {
    /// Status code a transport layer should map this error onto.
    pub fn status_code(&self) -> u16 {
        match self {
            RateLimiterError::InvalidConfiguration(_) => 422,
            RateLimiterError::NotInitialized(_) => 400,
            RateLimiterError::Config(_) => 500,
        }
    }
}

// setup bodies arrive as JSON, so decode failures are configuration errors
impl From<serde_json::Error> for RateLimiterError {
    fn from(err: serde_json::Error) -> Self {
        RateLimiterError::InvalidConfiguration(err.to_string())
    }
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, RateLimiterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            RateLimiterError::InvalidConfiguration("capacity".into()).status_code(),
            422
        );
        assert_eq!(
            RateLimiterError::NotInitialized(LimiterKind::TokenBucket).status_code(),
            400
        );
        assert_eq!(RateLimiterError::Config("bad".into()).status_code(), 500);
    }

    #[test]
    fn test_not_initialized_message_names_the_limiter() {
        let err = RateLimiterError::NotInitialized(LimiterKind::LeakingBucket);
        assert_eq!(err.to_string(), "leaking bucket not initialized");
    }

    #[test]
    fn test_json_errors_become_invalid_configuration() {
        let err = serde_json::from_str::<u64>("-3").unwrap_err();
        let err: RateLimiterError = err.into();
        assert!(matches!(err, RateLimiterError::InvalidConfiguration(_)));
    }
}
