//! Single-flight periodic execution of the prove job.
//!
//! Each tick either starts the job, when none is running, or is dropped.
//! Ticks are never queued or coalesced, and a failing or panicking job never
//! stops the scheduler.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::{FutureExt as _, Stream, StreamExt as _};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::orchestrator::{ProveBlockError, ProveOrchestrator, ProveOutcome};
use crate::prover_state::BlockProver;
use crate::store::BlockStore;

pub mod cli;

/// Period between ticks when none is configured.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// What a single [`ProofScheduler::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another job was still running.
    Skipped,
    Completed(ProveOutcome),
    /// The job returned an error or panicked. Already logged.
    Failed,
}

/// The unit of work a [`ProofScheduler`] runs on each tick.
pub trait ProveJob: Send + Sync + 'static {
    fn run(&self) -> impl Future<Output = Result<ProveOutcome, ProveBlockError>> + Send;
}

impl<S: BlockStore, P: BlockProver> ProveJob for ProveOrchestrator<S, P> {
    fn run(&self) -> impl Future<Output = Result<ProveOutcome, ProveBlockError>> + Send {
        self.prove_next_block()
    }
}

/// Resets the running flag when the job finishes, unwinds or is dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct ProofScheduler<J> {
    job: J,
    running: AtomicBool,
}

impl<J: ProveJob> ProofScheduler<J> {
    pub fn new(job: J) -> Self {
        Self {
            job,
            running: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Runs the job to completion unless it is already running.
    ///
    /// Safe to call concurrently; at most one caller runs the job.
    pub async fn tick(&self) -> TickOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("proof job still running, skipping tick");
            return TickOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);

        match AssertUnwindSafe(self.job.run()).catch_unwind().await {
            Ok(Ok(outcome)) => {
                debug!(?outcome, "proof job finished");
                TickOutcome::Completed(outcome)
            }
            Ok(Err(e)) => {
                error!("proof job failed: {e}");
                TickOutcome::Failed
            }
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                error!("proof job panicked: {msg}");
                TickOutcome::Failed
            }
        }
    }

    /// Starts a tick for every item of `ticks`, until the stream ends.
    ///
    /// Ticks run on their own tasks, so a long job does not hold back the
    /// trigger; the ticks arriving meanwhile are skipped. Returns once the
    /// stream has ended and the last job has finished.
    pub async fn run(self: Arc<Self>, ticks: impl Stream<Item = ()>) {
        info!(state = ?self.state(), "proof scheduler started");
        let mut ticks = std::pin::pin!(ticks);
        let mut jobs = JoinSet::new();

        while ticks.next().await.is_some() {
            while let Some(res) = jobs.try_join_next() {
                if let Err(e) = res {
                    error!("tick task failed: {e}");
                }
            }
            let scheduler = self.clone();
            jobs.spawn(async move { scheduler.tick().await });
        }

        while let Some(res) = jobs.join_next().await {
            if let Err(e) = res {
                error!("tick task failed: {e}");
            }
        }
        info!("proof scheduler stopped");
    }
}

/// A tick stream firing every `period`, the first one immediately. Ticks
/// missed while the consumer lagged are dropped, not replayed.
pub fn interval_ticks(period: Duration) -> impl Stream<Item = ()> {
    stream! {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            yield ();
        }
    }
}
