// src/driver/mod.rs

//! Periodic maintenance for the time-driven limiters.
//!
//! None of the limiters advance time on their own. The driver is the external
//! collaborator that refills the token bucket, drains the leaking bucket and
//! rolls the fixed window over, by calling the same registry operations a
//! transport layer would.

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::algorithms::LimiterKind;
use crate::config::DriverConfig;
use crate::error::{RateLimiterError, Result};
use crate::maintenance_event;
use crate::registry::LimiterRegistry;

/// Background driver for refill, drain and window rollover
#[derive(Debug)]
pub struct MaintenanceDriver {
    registry: Arc<LimiterRegistry>,
    config: DriverConfig,
    /// Stop flag; the spawned tasks hold receivers and wake on change
    cancel: watch::Sender<bool>,
    started: AtomicBool,
}

impl MaintenanceDriver {
    pub fn new(registry: Arc<LimiterRegistry>, config: DriverConfig) -> Self {
        Self {
            registry,
            config,
            cancel: watch::Sender::new(false),
            started: AtomicBool::new(false),
        }
    }

    /// Spawns the three maintenance tasks on the current tokio runtime.
    ///
    /// Each task first fires one period after start, not immediately. A
    /// driver runs at most once: starting it again, or after `stop`, spawns
    /// nothing and returns no handles.
    pub fn start(&self) -> Vec<task::JoinHandle<()>> {
        if self.is_stopped() {
            warn!("Maintenance driver already stopped, not starting");
            return Vec::new();
        }
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Maintenance driver already started");
            return Vec::new();
        }

        info!(
            refill_interval = ?self.config.refill_interval,
            drain_interval = ?self.config.drain_interval,
            "Starting maintenance driver"
        );

        vec![
            self.spawn_periodic("refill", self.config.refill_interval, |registry| {
                registry.refill().map(|_| ())
            }),
            self.spawn_periodic("process_requests", self.config.drain_interval, |registry| {
                registry.process_requests().map(|_| ())
            }),
            self.spawn_window_rollover(),
        ]
    }

    /// Wakes every task and asks it to exit. Dropping the driver does the same.
    pub fn stop(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.cancel.borrow()
    }

    fn spawn_periodic<F>(
        &self,
        operation: &'static str,
        period: Duration,
        run: F,
    ) -> task::JoinHandle<()>
    where
        F: Fn(&LimiterRegistry) -> Result<()> + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let mut cancel = self.cancel.subscribe();

        task::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while !*cancel.borrow_and_update() {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = cancel.changed() => break,
                }
                report(operation, run(&registry));
            }

            debug!(operation, "Maintenance task stopped");
        })
    }

    /// Rolls the fixed window over once per `time_interval` of the live
    /// counter. Setting up a new counter restarts the timing, so its first
    /// window is a full `time_interval` of its own.
    fn spawn_window_rollover(&self) -> task::JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let mut cancel = self.cancel.subscribe();
        let mut swaps = registry.watch_fixed_window_counter();
        let idle_poll = self.config.idle_poll_interval;

        task::spawn(async move {
            while !*cancel.borrow_and_update() {
                swaps.borrow_and_update();
                let opened = registry.fixed_window_counter().ok();
                let period = opened
                    .as_ref()
                    .map(|c| c.time_interval())
                    .unwrap_or(idle_poll);

                tokio::select! {
                    _ = time::sleep(period) => {}
                    swapped = swaps.changed() => {
                        if swapped.is_err() {
                            break;
                        }
                        debug!("Fixed window counter set up, restarting timing");
                        continue;
                    }
                    _ = cancel.changed() => break,
                }

                match opened {
                    Some(counter) => {
                        let count = counter.handle_new_timeframe();
                        maintenance_event!(
                            LimiterKind::FixedWindowCounter,
                            "handle_new_timeframe",
                            count
                        );
                    }
                    None => report(
                        "handle_new_timeframe",
                        Err(RateLimiterError::NotInitialized(
                            LimiterKind::FixedWindowCounter,
                        )),
                    ),
                }
            }

            debug!(operation = "handle_new_timeframe", "Maintenance task stopped");
        })
    }
}

fn report(operation: &'static str, result: Result<()>) {
    match result {
        Ok(()) => {}
        Err(RateLimiterError::NotInitialized(kind)) => {
            trace!(
                operation,
                algorithm = kind.as_str(),
                "Skipping maintenance, limiter not set up"
            );
        }
        Err(e) => warn!(operation, error = %e, "Maintenance failed"),
    }
}
