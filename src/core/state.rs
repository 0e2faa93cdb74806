//! # Unit lifecycle states and counters.
//!
//! [`UnitState`] is the shared lifecycle enum for both unit flavors. A
//! standalone [`Task`](crate::Task) reads [`UnitState::Idle`] as its PENDING
//! state; a [`Queue`](crate::Queue) reads it as IDLE — the transitions are
//! identical:
//!
//! ```text
//! Idle ──add()──► Processing ──(batch drained, buffer empty)──► Idle
//! Processing ──(idle timers expire, nothing pending)──► Completed
//! Idle|Processing ──complete()──► Completing ──(final drain)──► Completed
//! any non-terminal ──force_shutdown(reason)──► Failed
//! ```
//!
//! `Completed` and `Failed` are terminal; [`StateCell`] refuses to leave a
//! terminal state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::observers::{ObserverSet, ObserverToken};

/// Lifecycle state of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitState {
    /// No work buffered or in flight (PENDING for a task, IDLE for a queue).
    Idle,
    /// A batch is buffered or in flight.
    Processing,
    /// `complete()` is draining the remaining work.
    Completing,
    /// Terminal success.
    Completed,
    /// Terminal failure (`exit_on_error` fatality or forced shutdown).
    Failed,
}

impl UnitState {
    /// True for [`UnitState::Completed`] and [`UnitState::Failed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Completed | UnitState::Failed)
    }

    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            UnitState::Idle => "idle",
            UnitState::Processing => "processing",
            UnitState::Completing => "completing",
            UnitState::Completed => "completed",
            UnitState::Failed => "failed",
        }
    }
}

/// Observable state slot.
pub(crate) struct StateCell {
    current: Mutex<UnitState>,
    observers: ObserverSet<UnitState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(UnitState::Idle),
            observers: ObserverSet::new(),
        }
    }

    pub(crate) fn get(&self) -> UnitState {
        *self.current.lock().expect("state lock poisoned")
    }

    /// Transitions to `next` unless the current state is terminal or already
    /// `next`; observers are notified outside the lock.
    pub(crate) fn set(&self, next: UnitState) -> bool {
        {
            let mut current = self.current.lock().expect("state lock poisoned");
            if current.is_terminal() || *current == next {
                return false;
            }
            *current = next;
        }
        self.observers.notify(&next);
        true
    }

    pub(crate) fn subscribe(
        &self,
        callback: impl Fn(&UnitState) + Send + Sync + 'static,
    ) -> ObserverToken {
        self.observers.subscribe(callback)
    }

    pub(crate) fn unsubscribe(&self, token: ObserverToken) {
        self.observers.unsubscribe(token);
    }
}

/// Point-in-time counter readout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Items settled successfully.
    pub processed: u64,
    /// Items failed or rejected before starting.
    pub failed: u64,
    /// Items registered but not yet settled.
    pub pending: u64,
}

/// Unit counters.
pub(crate) struct Stats {
    processed: AtomicU64,
    failed: AtomicU64,
    pending: AtomicU64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            pending: AtomicU64::new(0),
        }
    }

    pub(crate) fn registered(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn item_processed(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn item_failed(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            pending: self.pending.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_terminal_states_stick() {
        let cell = StateCell::new();
        assert!(cell.set(UnitState::Processing));
        assert!(cell.set(UnitState::Completed));
        assert!(!cell.set(UnitState::Failed));
        assert_eq!(cell.get(), UnitState::Completed);
    }

    #[test]
    fn test_observers_see_transitions() {
        let cell = StateCell::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let token = cell.subscribe(move |s| sink.lock().unwrap().push(*s));

        cell.set(UnitState::Processing);
        cell.set(UnitState::Processing); // no-op, not delivered
        cell.set(UnitState::Idle);
        cell.unsubscribe(token);
        cell.set(UnitState::Completed);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![UnitState::Processing, UnitState::Idle]
        );
    }
}
