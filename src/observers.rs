//! # Token-based observer registry.
//!
//! [`ObserverSet`] delivers values to registered callbacks in registration
//! order. Each `subscribe` returns an [`ObserverToken`] that removes exactly
//! that callback when passed to `unsubscribe`.
//!
//! ## What it guarantees
//! - Delivery order is registration order.
//! - A panic inside one observer is caught and logged; the remaining observers
//!   still receive the value.
//! - Unsubscribing with a stale token is a no-op.
//!
//! ## What it does **not** guarantee
//! - No async delivery: callbacks run synchronously on the notifying thread
//!   and should return quickly.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

/// Opaque subscription token returned by [`ObserverSet::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

struct Entry<T> {
    token: ObserverToken,
    callback: Arc<dyn Fn(&T) + Send + Sync>,
}

/// Registry of observers for values of type `T`.
pub struct ObserverSet<T> {
    entries: Mutex<Vec<Entry<T>>>,
    next: Mutex<u64>,
}

impl<T> Default for ObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObserverSet<T> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next: Mutex::new(0),
        }
    }

    /// Registers a callback; returns the token that removes it.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ObserverToken {
        let token = {
            let mut next = self.next.lock().expect("observer lock poisoned");
            *next += 1;
            ObserverToken(*next)
        };
        self.entries
            .lock()
            .expect("observer lock poisoned")
            .push(Entry {
                token,
                callback: Arc::new(callback),
            });
        token
    }

    /// Removes the callback registered under `token`. Stale tokens are ignored.
    pub fn unsubscribe(&self, token: ObserverToken) {
        self.entries
            .lock()
            .expect("observer lock poisoned")
            .retain(|e| e.token != token);
    }

    /// Delivers `value` to every observer, in registration order.
    ///
    /// A panicking observer is isolated: the panic is caught, logged at `warn`,
    /// and delivery continues with the next observer. Callbacks run outside
    /// the registry lock, so an observer may subscribe or unsubscribe from
    /// within its own delivery; such changes take effect on the next `notify`.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<(ObserverToken, Arc<dyn Fn(&T) + Send + Sync>)> = self
            .entries
            .lock()
            .expect("observer lock poisoned")
            .iter()
            .map(|e| (e.token, Arc::clone(&e.callback)))
            .collect();
        for (token, callback) in snapshot {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| callback(value)));
            if result.is_err() {
                tracing::warn!(token = token.0, "observer panicked; skipping");
            }
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("observer lock poisoned").len()
    }

    /// True if no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
