use std::ops::ControlFlow;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) type TickFuture = BoxFuture<'static, ControlFlow<()>>;

struct ActiveTimer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owned, cancellable repeating task.
///
/// At most one task runs per slot. `stop` is a soft cancel that lets a tick
/// in progress finish (safe to call from inside that tick); `abort` also
/// cancels the tick in progress.
pub(crate) struct TimerSlot {
    name: &'static str,
    active: Option<ActiveTimer>,
}

impl TimerSlot {
    pub(crate) fn new(name: &'static str) -> Self {
        Self { name, active: None }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|timer| !timer.cancel.is_cancelled() && !timer.handle.is_finished())
    }

    /// Start ticking every `period`, first tick one period from now.
    ///
    /// Returns `false` without doing anything when the slot is already active.
    pub(crate) fn start<F>(&mut self, period: Duration, mut on_tick: F) -> bool
    where
        F: FnMut() -> TickFuture + Send + 'static,
    {
        if self.is_active() {
            debug!(timer = self.name, "timer already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let name = self.name;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if on_tick().await.is_break() {
                            break;
                        }
                    }
                }
            }
            debug!(timer = name, "timer task exited");
        });

        self.active = Some(ActiveTimer { cancel, handle });
        debug!(timer = self.name, period_ms = period.as_millis() as u64, "timer started");
        true
    }

    pub(crate) fn stop(&mut self) {
        if let Some(timer) = self.active.take() {
            timer.cancel.cancel();
            debug!(timer = self.name, "timer stopped");
        }
    }

    pub(crate) fn abort(&mut self) {
        if let Some(timer) = self.active.take() {
            timer.cancel.cancel();
            timer.handle.abort();
            debug!(timer = self.name, "timer aborted");
        }
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.abort();
    }
}
