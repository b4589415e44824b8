// src/bin/rate_limit_bench.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use prettytable::{row, Table};
use serde_json::json;
use structopt::StructOpt;
use tokio::sync::Barrier;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rate_limit_algorithms::{LimiterKind, LimiterRegistry};

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "rate_limit_bench",
    about = "Hammers each limiter from many concurrent tasks"
)]
struct Opt {
    /// Rate limiting algorithm to benchmark
    #[structopt(short, long, possible_values = &["token_bucket", "leaking_bucket", "fixed_window_counter", "sliding_window_log", "all"], default_value = "all")]
    algorithm: String,

    /// Ceiling shared by every algorithm
    #[structopt(short, long, default_value = "1000")]
    limit: u64,

    /// Number of concurrent tasks
    #[structopt(short = "u", long, default_value = "10")]
    num_users: usize,

    /// Number of requests per task
    #[structopt(short = "r", long, default_value = "100")]
    requests_per_user: usize,

    /// Number of iterations to run
    #[structopt(short, long, default_value = "3")]
    iterations: usize,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,
}

struct BenchResult {
    kind: LimiterKind,
    allowed: usize,
    rejected: usize,
    total_duration: Duration,
    max_allowed_per_iteration: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "rate_limit_bench={},rate_limit_algorithms={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let kinds = if opt.algorithm == "all" {
        LimiterKind::ALL.to_vec()
    } else {
        let kind = LimiterKind::parse(&opt.algorithm)
            .ok_or_else(|| format!("Unknown algorithm: {}", opt.algorithm))?;
        vec![kind]
    };

    let mut results = Vec::with_capacity(kinds.len());
    for kind in kinds {
        results.push(run_benchmark(kind, &opt).await?);
    }

    print_results(&opt, &results);
    Ok(())
}

async fn run_benchmark(
    kind: LimiterKind,
    opt: &Opt,
) -> Result<BenchResult, Box<dyn std::error::Error>> {
    info!(algorithm = kind.as_str(), "Benchmarking");

    let registry = Arc::new(LimiterRegistry::new());
    let mut result = BenchResult {
        kind,
        allowed: 0,
        rejected: 0,
        total_duration: Duration::ZERO,
        max_allowed_per_iteration: 0,
    };

    for iteration in 0..opt.iterations {
        // fresh instance per iteration; no maintenance runs, so the ceiling is exact
        registry.setup_from_json(kind, setup_body(kind, opt.limit))?;

        let barrier = Arc::new(Barrier::new(opt.num_users));
        let handles: Vec<_> = (0..opt.num_users)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                let requests = opt.requests_per_user;
                tokio::spawn(async move {
                    barrier.wait().await;

                    let mut allowed = 0;
                    let mut rejected = 0;
                    for _ in 0..requests {
                        match registry.handle(kind) {
                            Ok(status) if status.allowed => allowed += 1,
                            Ok(_) => rejected += 1,
                            Err(e) => warn!(error = %e, "Decision failed"),
                        }
                    }
                    (allowed, rejected)
                })
            })
            .collect();

        let start_time = Instant::now();
        let outcomes = join_all(handles).await;
        let elapsed = start_time.elapsed();

        let mut iteration_allowed = 0;
        for (allowed, rejected) in outcomes.into_iter().flatten() {
            iteration_allowed += allowed;
            result.rejected += rejected;
        }
        result.allowed += iteration_allowed;
        result.total_duration += elapsed;
        result.max_allowed_per_iteration = result.max_allowed_per_iteration.max(iteration_allowed);

        info!(
            algorithm = kind.as_str(),
            iteration = iteration + 1,
            allowed = iteration_allowed,
            ?elapsed,
            "Iteration complete"
        );
    }

    Ok(result)
}

fn setup_body(kind: LimiterKind, limit: u64) -> serde_json::Value {
    match kind {
        LimiterKind::TokenBucket => json!({"capacity": limit, "refill_rate_per_minute": limit}),
        LimiterKind::LeakingBucket => json!({"bucket_size": limit, "outflow_rate_per_minute": limit}),
        LimiterKind::FixedWindowCounter => json!({"max_number_req": limit, "time_interval": 3600}),
        LimiterKind::SlidingWindowLog => json!({"max_req_allowed": limit, "time_window": 3600}),
    }
}

fn print_results(opt: &Opt, results: &[BenchResult]) {
    let mut table = Table::new();
    table.set_titles(row![
        "Algorithm",
        "Requests",
        "Allowed",
        "Rejected",
        "Avg. duration",
        "Throughput (req/s)",
        "Within ceiling"
    ]);

    for result in results {
        let total = result.allowed + result.rejected;
        let iterations = opt.iterations.max(1) as u32;
        let throughput = if result.total_duration.is_zero() {
            0.0
        } else {
            total as f64 / result.total_duration.as_secs_f64()
        };
        let within = result.max_allowed_per_iteration as u64 <= opt.limit;
        table.add_row(row![
            result.kind,
            total,
            result.allowed,
            result.rejected,
            format!("{:?}", result.total_duration / iterations),
            format!("{:.2}", throughput),
            if within { "yes" } else { "NO" }
        ]);
    }

    println!(
        "\nBenchmark: {} tasks x {} requests, {} iterations, limit {}",
        opt.num_users, opt.requests_per_user, opt.iterations, opt.limit
    );
    table.printstd();
}
