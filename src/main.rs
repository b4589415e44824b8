use std::sync::Arc;

use dotenv::dotenv;
use futures::future::join_all;
use rate_limit_algorithms::config::AppConfig;
use rate_limit_algorithms::{init_logging, LimiterKind, LimiterRegistry, MaintenanceDriver, SystemClock};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();
    info!("Rate limit service starting up");

    let config = AppConfig::from_env()?;
    debug!(?config, "Configuration loaded");

    let registry = Arc::new(LimiterRegistry::from_config(&config, Arc::new(SystemClock))?);
    for kind in LimiterKind::ALL {
        if !registry.is_initialized(kind) {
            info!(algorithm = kind.as_str(), "Limiter not configured at startup");
        }
    }

    let driver = MaintenanceDriver::new(Arc::clone(&registry), config.driver.clone());
    let handles = driver.start();

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    ctrlc::set_handler(move || signal.notify_one())?;

    info!("Rate limit service running, press Ctrl-C to stop");
    shutdown.notified().await;

    info!("Shutdown requested, stopping maintenance driver");
    driver.stop();
    for result in join_all(handles).await {
        if let Err(e) = result {
            warn!(error = %e, "Maintenance task ended abnormally");
        }
    }

    info!("Rate limit service stopped");
    Ok(())
}
