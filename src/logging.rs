use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Ensure initialization happens only once
static INIT: Once = Once::new();

/// Environment variable selecting the log format; `json` switches to JSON lines.
pub const LOG_FORMAT_ENV: &str = "RATE_LIMITER_LOG_FORMAT";

/// Initialize the logging system with sensible defaults.
///
/// Log level can be set using the RUST_LOG environment variable.
/// Example: RUST_LOG=debug,rate_limit_algorithms=trace
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let json = std::env::var(LOG_FORMAT_ENV)
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if json {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_thread_ids(true))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true) // contention shows up per thread
                        .with_line_number(true),
                )
                .init();
        }

        tracing::info!(json, "Logging initialized");
    });
}

/// Macro for logging admission decisions
#[macro_export]
macro_rules! decision_event {
    ($kind:expr, $status:expr) => {
        tracing::debug!(
            algorithm = $kind.as_str(),
            allowed = $status.allowed,
            remaining = $status.remaining,
            limit = $status.limit,
            "Admission decision"
        )
    };
}

/// Macro for logging driver-triggered maintenance
#[macro_export]
macro_rules! maintenance_event {
    ($kind:expr, $operation:expr, $result:expr) => {
        tracing::debug!(
            algorithm = $kind.as_str(),
            operation = $operation,
            result = ?$result,
            "Maintenance operation"
        )
    };
}
