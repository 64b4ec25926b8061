//! Polling driver.
//!
//! Runs a [`Probe`] immediately and then on a fixed interval until cancelled.
//!
//! - Probes never overlap: the loop awaits each probe before waiting for the
//!   next tick, and ticks missed while a probe was running are skipped.
//! - Cancellation races the in-flight probe; its future is dropped, so a
//!   result arriving after teardown is never applied.
//! - A failing probe is logged and counted. The next tick runs normally.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use vigil_core::poller::{Poller, Probe};
//!
//! struct Heartbeat;
//!
//! #[async_trait]
//! impl Probe for Heartbeat {
//!     fn name(&self) -> &str { "heartbeat" }
//!     async fn probe(&mut self, _token: &CancellationToken) -> vigil_core::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() {
//! let handle = Poller::new(Duration::from_secs(10)).spawn(Heartbeat, CancellationToken::new());
//! // ... later
//! handle.stop().await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Default poll interval (10 seconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Shortest interval a [`Poller`] will run at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One unit of polled work.
#[async_trait]
pub trait Probe: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run one probe. `token` is cancelled when the owner tears down; probes
    /// should check it before applying results that outlive the await.
    async fn probe(&mut self, token: &CancellationToken) -> Result<()>;
}

/// Counters shared between the poll task and its handle.
#[derive(Debug, Default)]
pub struct PollStats {
    cycles: AtomicU64,
    failures: AtomicU64,
}

impl PollStats {
    /// Completed probes, successful or not.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

/// Interval-driven probe runner.
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl Poller {
    /// Intervals shorter than [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling on a background task.
    ///
    /// The task stops when `token` (or any parent token) is cancelled, when
    /// [`PollHandle::stop`] is called, or when the handle is dropped.
    pub fn spawn<P>(&self, probe: P, token: CancellationToken) -> PollHandle
    where
        P: Probe + 'static,
    {
        let stats = Arc::new(PollStats::default());
        let task_stats = Arc::clone(&stats);
        let task_token = token.clone();
        let interval = self.interval;

        info!(
            probe = probe.name(),
            interval_ms = interval.as_millis() as u64,
            "Starting poller"
        );

        let join = tokio::spawn(async move {
            run_loop(probe, interval, task_token, task_stats).await;
        });

        PollHandle {
            token,
            join: Some(join),
            stats,
        }
    }
}

async fn run_loop<P: Probe>(
    mut probe: P,
    interval: Duration,
    token: CancellationToken,
    stats: Arc<PollStats>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // The first tick completes immediately.
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            _ = token.cancelled() => {
                debug!(probe = probe.name(), "Cancelled with probe in flight");
                break;
            }
            outcome = probe.probe(&token) => outcome,
        };

        stats.cycles.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = outcome {
            stats.failures.fetch_add(1, Ordering::SeqCst);
            warn!(probe = probe.name(), error = %e, "Probe failed");
        }
    }

    debug!(probe = probe.name(), "Poller stopped");
}

/// Owner handle for a running poller. Dropping it cancels the poller.
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
    stats: Arc<PollStats>,
}

impl PollHandle {
    /// Cancel the poller and wait for its task to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!("Poll task ended abnormally: {}", e);
            }
        }
    }

    /// Cancel without waiting.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
