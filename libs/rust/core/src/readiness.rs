//! Readiness handle for a freshly registered worker.
//!
//! A [`ReadinessFuture`] polls the worker's online flag until it flips, the
//! deadline passes, or the status query itself fails. Polling starts lazily on
//! the first `get`; the first terminal outcome is cached and replayed to every
//! later caller without touching the controller again.

use futures::future::BoxFuture;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::future::IntoFuture;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::controller::WorkerHandle;
use crate::error::{Error, Result};
use crate::timeline::{ProvisionPhase, ProvisionTimeline};
use crate::poll::PollPolicy;
use crate::telemetry::METRICS;

pub type SharedWorker = Arc<dyn WorkerHandle>;

// Upper bound for deadlines so `Instant + timeout` cannot overflow.
const MAX_WAIT: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadinessState { NotStarted = 0, Polling = 1, Ready = 2, TimedOut = 3, Faulted = 4 }

impl ReadinessState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ReadinessState::NotStarted,
            1 => ReadinessState::Polling,
            2 => ReadinessState::Ready,
            3 => ReadinessState::TimedOut,
            _ => ReadinessState::Faulted,
        }
    }
    pub fn is_terminal(self) -> bool {
        matches!(self, ReadinessState::Ready | ReadinessState::TimedOut | ReadinessState::Faulted)
    }
}

/// Unit for [`ReadinessFuture::get_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit { Nanoseconds, Microseconds, Milliseconds, Seconds, Minutes, Hours, Days }

impl TimeUnit {
    /// Whole seconds in `amount` of this unit, truncating sub-second parts.
    pub fn to_seconds(self, amount: u64) -> u64 {
        match self {
            TimeUnit::Nanoseconds => amount / 1_000_000_000,
            TimeUnit::Microseconds => amount / 1_000_000,
            TimeUnit::Milliseconds => amount / 1_000,
            TimeUnit::Seconds => amount,
            TimeUnit::Minutes => amount.saturating_mul(60),
            TimeUnit::Hours => amount.saturating_mul(3_600),
            TimeUnit::Days => amount.saturating_mul(86_400),
        }
    }
}

#[derive(Debug)]
enum Outcome { Ready, Failed(Error) }

#[derive(Debug)]
struct Inner {
    worker: SharedWorker,
    default_timeout_secs: u64,
    policy: PollPolicy,
    state: AtomicU8,
    outcome: OnceCell<Outcome>,
    timeline: Mutex<ProvisionTimeline>,
}

/// Cloneable handle; clones share one state and one cached outcome.
#[derive(Debug, Clone)]
pub struct ReadinessFuture { inner: Arc<Inner> }

impl ReadinessFuture {
    pub fn new(worker: SharedWorker, default_timeout_secs: u64, policy: PollPolicy) -> Self {
        Self::with_timeline(worker, default_timeout_secs, policy, ProvisionTimeline::awaiting_online())
    }

    pub(crate) fn with_timeline(worker: SharedWorker, default_timeout_secs: u64, policy: PollPolicy, timeline: ProvisionTimeline) -> Self {
        Self {
            inner: Arc::new(Inner {
                worker,
                default_timeout_secs,
                policy,
                state: AtomicU8::new(ReadinessState::NotStarted as u8),
                outcome: OnceCell::new(),
                timeline: Mutex::new(timeline),
            }),
        }
    }

    pub fn worker(&self) -> &SharedWorker { &self.inner.worker }
    pub fn default_timeout_secs(&self) -> u64 { self.inner.default_timeout_secs }
    pub fn state(&self) -> ReadinessState { ReadinessState::from_u8(self.inner.state.load(Ordering::SeqCst)) }
    pub fn timeline(&self) -> ProvisionTimeline { self.inner.timeline.lock().clone() }

    /// True once resolved, otherwise asks the worker once. Never starts the
    /// polling loop. A failing status query is returned as [`Error::Wait`].
    pub async fn is_done(&self) -> Result<bool> {
        if self.state().is_terminal() { return Ok(true); }
        self.inner.worker.is_online().await.map_err(|e| {
            Error::wait(self.inner.worker.name(), self.inner.default_timeout_secs, e)
        })
    }

    /// True once a wait has concluded, whatever the outcome. Nothing can
    /// cancel a wait, so this is a completion marker.
    pub fn is_cancelled(&self) -> bool { self.state().is_terminal() }

    /// Mid-wait cancellation is unsupported; always `false`, changes nothing.
    pub fn cancel(&self) -> bool { false }

    /// Wait using the configured default timeout.
    pub async fn get(&self) -> Result<SharedWorker> { self.wait(self.inner.default_timeout_secs).await }

    /// Wait with a caller-supplied timeout, normalised to whole seconds.
    pub async fn get_timeout(&self, timeout: u64, unit: TimeUnit) -> Result<SharedWorker> {
        self.wait(unit.to_seconds(timeout)).await
    }

    async fn wait(&self, timeout_secs: u64) -> Result<SharedWorker> {
        if let Some(outcome) = self.inner.outcome.get() { return self.replay(outcome); }
        let _ = self.inner.state.compare_exchange(
            ReadinessState::NotStarted as u8, ReadinessState::Polling as u8, Ordering::SeqCst, Ordering::SeqCst,
        );

        let worker = self.inner.worker.name().to_string();
        info!(worker = %worker, timeout_secs, "waiting for worker to come online");
        let started = Instant::now();
        let deadline = started + std::cmp::min(Duration::from_secs(timeout_secs), MAX_WAIT);
        let mut attempt: u32 = 0;
        let outcome = loop {
            let now = Instant::now();
            if now >= deadline {
                break Outcome::Failed(Error::ReadinessTimeout { worker: worker.clone(), timeout_secs, elapsed: now - started });
            }
            METRICS.readiness_polls.add(1, &[]);
            // a query still in flight at the deadline counts as not online
            match tokio::time::timeout(deadline - now, self.inner.worker.is_online()).await {
                Ok(Ok(true)) => break Outcome::Ready,
                Ok(Ok(false)) => debug!(worker = %worker, attempt, "worker not online yet"),
                Ok(Err(e)) => break Outcome::Failed(Error::wait(&worker, timeout_secs, e)),
                Err(_) => {
                    debug!(worker = %worker, attempt, "online check still pending at deadline");
                    continue;
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.inner.policy.delay(attempt, remaining)).await;
            attempt = attempt.saturating_add(1);
        };
        self.resolve(outcome, started.elapsed())
    }

    fn resolve(&self, outcome: Outcome, waited: Duration) -> Result<SharedWorker> {
        let mut won = false;
        let stored = self.inner.outcome.get_or_init(|| { won = true; outcome });
        if won {
            let state = match stored {
                Outcome::Ready => ReadinessState::Ready,
                Outcome::Failed(Error::ReadinessTimeout { .. }) => ReadinessState::TimedOut,
                Outcome::Failed(_) => ReadinessState::Faulted,
            };
            if state == ReadinessState::Ready { self.inner.timeline.lock().enter(ProvisionPhase::Operational); }
            // outcome is published before the state flips
            self.inner.state.store(state as u8, Ordering::SeqCst);
            METRICS.readiness_wait_seconds.record(waited.as_secs_f64(), &[]);
            match stored {
                Outcome::Ready => {
                    METRICS.readiness_ready.add(1, &[]);
                    info!(worker = %self.inner.worker.name(), waited_ms = waited.as_millis() as u64, "worker online");
                }
                Outcome::Failed(e @ Error::ReadinessTimeout { .. }) => {
                    METRICS.readiness_timeouts.add(1, &[]);
                    warn!(error = %e, "readiness wait timed out");
                }
                Outcome::Failed(e) => {
                    METRICS.readiness_faults.add(1, &[]);
                    error!(error = %e, "readiness wait failed");
                }
            }
        }
        self.replay(stored)
    }

    fn replay(&self, outcome: &Outcome) -> Result<SharedWorker> {
        match outcome {
            Outcome::Ready => Ok(self.inner.worker.clone()),
            Outcome::Failed(e) => Err(e.clone()),
        }
    }
}

impl IntoFuture for ReadinessFuture {
    type Output = Result<SharedWorker>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture { Box::pin(async move { self.get().await }) }
}
