//! # Cancellable idle timers.
//!
//! [`IdleTimer`] is the scheduled-callback abstraction behind the
//! auto-behaviors: `arm` schedules a future after a delay and replaces any
//! previous schedule; `cancel` revokes the pending schedule. The timer
//! tolerates being armed and cancelled many times per second — each
//! superseded schedule is a cancelled tokio task, not a leak.
//!
//! Grounded on the cancellable-sleep pattern used throughout the engine:
//! `select!` over `tokio::time::sleep` and a [`CancellationToken`].

use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// One rearmable, cancellable timer slot.
pub(crate) struct IdleTimer {
    armed: Mutex<Option<CancellationToken>>,
}

impl IdleTimer {
    pub(crate) fn new() -> Self {
        Self {
            armed: Mutex::new(None),
        }
    }

    /// Schedules `on_expiry` to run after `delay`, replacing any previous
    /// schedule.
    pub(crate) fn arm<F>(&self, delay: Duration, on_expiry: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let previous = self
            .armed
            .lock()
            .expect("timer lock poisoned")
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => on_expiry.await,
            }
        });
    }

    /// Revokes the pending schedule, if any. Idempotent.
    pub(crate) fn cancel(&self) {
        if let Some(token) = self.armed.lock().expect("timer lock poisoned").take() {
            token.cancel();
        }
    }
}
