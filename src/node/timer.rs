//! Resettable heartbeat timer
//!
//! Every node waits on its own timer. Any liveness poll the node serves
//! resets the timer, so a node that is being supervised never promotes
//! itself. When the period elapses with no reset, the node coordinates one
//! round.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// How a call to [`HeartbeatTimer::start`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// A full period passed with no reset: attempt coordination
    Elapsed,
    /// A reset arrived during the wait: skip this round
    Reset,
}

pub struct HeartbeatTimer {
    period: Duration,
    notify: Notify,
    reset_flag: AtomicBool,
}

impl HeartbeatTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            notify: Notify::new(),
            reset_flag: AtomicBool::new(false),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Block until one full period passes without a reset.
    ///
    /// Each reset restarts the wait. The outcome reports whether any reset
    /// happened since this call began.
    pub async fn start(&self) -> TimerOutcome {
        self.reset_flag.store(false, Ordering::SeqCst);

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            tokio::select! {
                _ = tokio::time::sleep(self.period) => break,
                _ = &mut notified => continue,
            }
        }

        if self.reset_flag.swap(false, Ordering::SeqCst) {
            TimerOutcome::Reset
        } else {
            TimerOutcome::Elapsed
        }
    }

    /// Restart a pending wait and mark the current round void
    pub fn reset(&self) {
        self.reset_flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}
