//! Scheduled work around a [`Session`].
//!
//! Two cancellable tokio tasks: the avoidance clock (one tick per configured
//! period, missed ticks skipped) and the one-shot celebration clear. Both are
//! owned by [`SessionHandle`]; `stop()` or dropping the handle aborts them.
//!
//! Every command, tick and expiry runs to completion under one lock, so no
//! caller ever observes a half-updated task or cell.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::session::{ApplyReport, Command, Session};

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SessionHandle {
    session: Arc<Mutex<Session>>,
    ticker: Option<JoinHandle<()>>,
    clear: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            ticker: None,
            clear: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Start the avoidance clock. Must be called within a tokio runtime.
    ///
    /// Starting twice is a no-op.
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime, avoidance clock not started");
            return;
        };

        let session = Arc::clone(&self.session);
        let period = lock(&session).config().tick_interval();
        self.ticker = Some(runtime.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                lock(&session).tick(Utc::now());
            }
        }));
        info!(period_ms = period.as_millis() as u64, "avoidance clock started");

        // A pre-marked startup board may already be celebrating.
        let pending = lock(&self.session).pending_celebration();
        if let Some(generation) = pending {
            self.arm_clear(generation);
        }
    }

    /// Cancel all scheduled work and clear any active celebration.
    pub fn stop(&mut self) {
        self.abort_all();
        lock(&self.session).dispose();
        info!("avoidance clock stopped");
    }

    /// Apply a command, arming the celebration clear if it completed a line.
    pub fn apply(&mut self, command: Command) -> ApplyReport {
        let report = lock(&self.session).apply(command, Utc::now());
        if let Some(generation) = report.armed {
            self.arm_clear(generation);
        }
        report
    }

    /// Read access under the lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let guard = lock(&self.session);
        f(&guard)
    }

    fn arm_clear(&mut self, generation: u64) {
        if let Some(previous) = self.clear.take() {
            previous.abort();
        }
        let Ok(runtime) = Handle::try_current() else {
            debug!(generation, "no tokio runtime, celebration clears on tick");
            return;
        };

        let session = Arc::clone(&self.session);
        let delay = lock(&session)
            .board()
            .celebration()
            .duration()
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.clear = Some(runtime.spawn(async move {
            time::sleep(delay).await;
            lock(&session).expire_celebration(generation, Utc::now());
        }));
    }

    fn abort_all(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(clear) = self.clear.take() {
            clear.abort();
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.abort_all();
        lock(&self.session).dispose();
    }
}
