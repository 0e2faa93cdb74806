//! # Settleable completion cell.
//!
//! [`SettleCell`] is the explicit completion-controller value the engine owns
//! per unit and per item: a result slot that can be settled exactly once and
//! awaited by any number of callers, before or after settlement.
//!
//! ## Rules
//! - First write wins: later `settle` calls are no-ops and report `false`.
//! - `wait` never misses a settlement, no matter when the caller subscribes.
//! - The payload must be `Clone`: every awaiter receives the same outcome.

use tokio::sync::watch;

/// One-shot result slot with multi-awaiter support.
pub(crate) struct SettleCell<T: Clone> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> SettleCell<T> {
    /// Creates an unsettled cell.
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Settles the cell; returns `true` if this call won the write.
    pub(crate) fn settle(&self, value: T) -> bool {
        let mut won = false;
        self.tx.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(value.clone());
                won = true;
                true
            } else {
                false
            }
        });
        won
    }

    /// Returns the settled value without waiting, if available.
    pub(crate) fn peek(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Waits for settlement; resolves immediately if already settled.
    pub(crate) async fn wait(&self) -> T {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(value) = rx.borrow_and_update().clone() {
                return value;
            }
            if rx.changed().await.is_err() {
                // the sender lives inside `self`, which the caller borrows
                unreachable!("settle cell dropped while awaited");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_write_wins() {
        let cell = SettleCell::new();
        assert!(cell.settle(1));
        assert!(!cell.settle(2));
        assert_eq!(cell.peek(), Some(1));
        assert_eq!(cell.wait().await, 1);
    }

    #[tokio::test]
    async fn test_waiters_before_and_after_settlement() {
        let cell = std::sync::Arc::new(SettleCell::new());
        let early = {
            let cell = std::sync::Arc::clone(&cell);
            tokio::spawn(async move { cell.wait().await })
        };
        tokio::task::yield_now().await;
        cell.settle("done");
        assert_eq!(early.await.expect("join"), "done");
        assert_eq!(cell.wait().await, "done");
    }
}
