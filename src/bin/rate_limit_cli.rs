// src/bin/rate_limit_cli.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{row, Table};
use serde_json::{json, Value};
use structopt::StructOpt;
use tokio::time;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rate_limit_algorithms::config::DriverConfig;
use rate_limit_algorithms::{LimiterKind, LimiterRegistry, MaintenanceDriver, StatusDetails};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rate_limit_cli",
    about = "Simulates traffic against one rate limiting algorithm"
)]
struct Opt {
    /// Rate limiting algorithm to use
    #[structopt(short, long, possible_values = &["token_bucket", "leaking_bucket", "fixed_window_counter", "sliding_window_log"], default_value = "token_bucket")]
    algorithm: String,

    /// Ceiling: bucket capacity, queue size or requests per window
    #[structopt(short, long, default_value = "10")]
    limit: u64,

    /// Refill or outflow rate per minute (bucket algorithms)
    #[structopt(short, long, default_value = "60")]
    rate: u64,

    /// Window length in seconds (window algorithms)
    #[structopt(short, long, default_value = "1")]
    window_seconds: u64,

    /// Simulation mode
    #[structopt(long, possible_values = &["burst", "steady", "jitter"], default_value = "burst")]
    simulation: String,

    /// Number of requests to simulate
    #[structopt(short = "n", long, default_value = "20")]
    num_requests: usize,

    /// Time between requests in milliseconds (steady and jitter modes)
    #[structopt(short = "t", long, default_value = "100")]
    request_interval_ms: u64,

    /// Run the maintenance driver with this refill/drain period in milliseconds
    #[structopt(long)]
    maintenance_ms: Option<u64>,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,
}

#[derive(Debug, Default)]
struct Outcome {
    allowed: usize,
    rejected: usize,
    last_details: Option<StatusDetails>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "rate_limit_cli={},rate_limit_algorithms={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let kind = LimiterKind::parse(&opt.algorithm).ok_or_else(|| {
        error!("Unknown algorithm: {}", opt.algorithm);
        format!("Unknown algorithm: {}", opt.algorithm)
    })?;

    let registry = Arc::new(LimiterRegistry::new());
    let receipt = registry.setup_from_json(kind, setup_body(kind, &opt))?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);

    let driver = match opt.maintenance_ms {
        Some(ms) => {
            let period = Duration::from_millis(ms);
            let config = DriverConfig {
                refill_interval: period,
                drain_interval: period,
                ..DriverConfig::default()
            };
            config.validate()?;
            let driver = MaintenanceDriver::new(Arc::clone(&registry), config);
            let handles = driver.start();
            Some((driver, handles))
        }
        None => None,
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    info!(algorithm = kind.as_str(), simulation = %opt.simulation, "Starting simulation");
    let start_time = Instant::now();
    let outcome = simulate(&opt, kind, &registry, &interrupted).await?;
    let elapsed = start_time.elapsed();

    if let Some((driver, handles)) = driver {
        driver.stop();
        futures::future::join_all(handles).await;
    }

    print_summary(&opt, kind, &outcome, elapsed, interrupted.load(Ordering::SeqCst));
    Ok(())
}

fn setup_body(kind: LimiterKind, opt: &Opt) -> Value {
    match kind {
        LimiterKind::TokenBucket => json!({
            "capacity": opt.limit,
            "refill_rate_per_minute": opt.rate,
        }),
        LimiterKind::LeakingBucket => json!({
            "bucket_size": opt.limit,
            "outflow_rate_per_minute": opt.rate,
        }),
        LimiterKind::FixedWindowCounter => json!({
            "max_number_req": opt.limit,
            "time_interval": opt.window_seconds,
        }),
        LimiterKind::SlidingWindowLog => json!({
            "max_req_allowed": opt.limit,
            "time_window": opt.window_seconds,
        }),
    }
}

/// Gap before the next request for the chosen mode
fn next_gap(opt: &Opt) -> Option<Duration> {
    let base = Duration::from_millis(opt.request_interval_ms);
    match opt.simulation.as_str() {
        "steady" => Some(base),
        // between 0.5x and 1.5x the base interval
        "jitter" => Some(base.mul_f64(0.5 + rand::random::<f64>())),
        _ => None,
    }
}

async fn simulate(
    opt: &Opt,
    kind: LimiterKind,
    registry: &LimiterRegistry,
    interrupted: &AtomicBool,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let progress = ProgressBar::new(opt.num_requests as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut outcome = Outcome::default();
    for i in 0..opt.num_requests {
        if interrupted.load(Ordering::SeqCst) {
            progress.abandon_with_message("interrupted");
            return Ok(outcome);
        }

        let request_time = Instant::now();
        let status = registry.handle(kind)?;
        if status.allowed {
            outcome.allowed += 1;
        } else {
            outcome.rejected += 1;
        }
        debug!(request = i + 1, allowed = status.allowed, remaining = status.remaining);
        progress.set_message(format!(
            "allowed {} / rejected {}",
            outcome.allowed, outcome.rejected
        ));
        progress.inc(1);
        outcome.last_details = Some(status.details);

        if let Some(gap) = next_gap(opt) {
            let elapsed = request_time.elapsed();
            if elapsed < gap {
                time::sleep(gap - elapsed).await;
            }
        }
    }

    progress.finish_with_message("done");
    Ok(outcome)
}

fn print_summary(
    opt: &Opt,
    kind: LimiterKind,
    outcome: &Outcome,
    elapsed: Duration,
    interrupted: bool,
) {
    let sent = outcome.allowed + outcome.rejected;
    let mut table = Table::new();
    table.add_row(row!["Algorithm", kind]);
    table.add_row(row!["Simulation", opt.simulation]);
    table.add_row(row!["Requests sent", sent]);
    table.add_row(row!["Allowed", outcome.allowed]);
    table.add_row(row!["Rejected", outcome.rejected]);
    table.add_row(row!["Time elapsed", format!("{:?}", elapsed)]);
    if interrupted {
        table.add_row(row!["Stopped early", "yes"]);
    }
    if let Some(details) = &outcome.last_details {
        let details = serde_json::to_string(details).unwrap_or_default();
        table.add_row(row!["Final state", details]);
    }

    println!("\nSimulation Results:");
    table.printstd();
}
