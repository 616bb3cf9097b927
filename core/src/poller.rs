use crate::config::ConsoleConfig;
use crate::console::{Console, CycleReport};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// What to do when a cycle is due while the previous one is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Launch anyway; cycles are independent and reconciliation is idempotent.
    #[default]
    Allow,
    /// Skip the tick and wait for the next one.
    SkipWhileInFlight,
}

/// Free-running poll timer.
///
/// Cycles are spawned on a fixed cadence measured from one cycle start to the next, so a slow
/// cycle may still be running when the next one starts. The last snapshot to complete wins
/// even when it was fetched earlier (see [`crate::lifecycle::AlertLifecycle::settle`]).
/// Stopping cancels the timer only; cycles already spawned run to completion and still update
/// the store.
pub struct Poller {
    console: Console,
    overlap: OverlapPolicy,
    in_flight: Arc<AtomicUsize>,
    started: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn new(console: Console, overlap: OverlapPolicy) -> Self {
        Self {
            console,
            overlap,
            in_flight: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(AtomicU64::new(0)),
            ticker: None,
        }
    }

    pub fn from_config(console: Console, config: &ConsoleConfig) -> Self {
        let overlap = if config.skip_overlapping_cycles {
            OverlapPolicy::SkipWhileInFlight
        } else {
            OverlapPolicy::Allow
        };
        Self::new(console, overlap)
    }

    /// Start polling. The first cycle runs immediately; restarting replaces the old timer.
    pub fn start(&mut self, interval: Duration) {
        self.stop();

        let interval = interval.max(Duration::from_millis(1));
        let console = self.console.clone();
        let overlap = self.overlap;
        let in_flight = Arc::clone(&self.in_flight);
        let started = Arc::clone(&self.started);

        self.ticker = Some(task::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if overlap == OverlapPolicy::SkipWhileInFlight
                    && in_flight.load(Ordering::SeqCst) > 0
                {
                    debug!("previous cycle still in flight, skipping tick");
                    continue;
                }
                spawn_cycle(&console, &in_flight, &started);
            }
        }));

        info!(interval_ms = interval.as_millis() as u64, "poller started");
    }

    /// Stop the timer. In-flight cycles are left to finish.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            info!("poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .as_ref()
            .map(|ticker| !ticker.is_finished())
            .unwrap_or(false)
    }

    /// Run a cycle now without disturbing the timer's phase.
    pub fn refresh_now(&self) -> JoinHandle<CycleReport> {
        spawn_cycle(&self.console, &self.in_flight, &self.started)
    }

    /// Number of cycles launched so far, scheduled or manual.
    pub fn cycles_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub fn cycles_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_cycle(
    console: &Console,
    in_flight: &Arc<AtomicUsize>,
    started: &Arc<AtomicU64>,
) -> JoinHandle<CycleReport> {
    let console = console.clone();
    let in_flight = Arc::clone(in_flight);
    in_flight.fetch_add(1, Ordering::SeqCst);
    let cycle = started.fetch_add(1, Ordering::SeqCst) + 1;

    task::spawn(async move {
        let report = console.run_cycle().await;
        in_flight.fetch_sub(1, Ordering::SeqCst);

        let failed = report.failed();
        if failed.is_empty() {
            debug!(cycle, "poll cycle complete");
        } else {
            debug!(cycle, failed = ?failed, "poll cycle complete with failures");
        }
        report
    })
}
