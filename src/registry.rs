//! # Process-wide queue registry.
//!
//! An explicit registry holding at most one [`Queue`] instance. There is no
//! implicit construction: callers initialize with [`init`] (create-if-absent)
//! before the first [`get`].
//!
//! ## Rules
//! - [`init`] creates the queue on first call and returns the existing
//!   instance afterwards (the later configuration is ignored, logged at
//!   `debug`).
//! - [`get`] never constructs.
//! - [`reset`] awaits the registered queue's in-flight completion, then
//!   clears the slot — unless a newer instance was registered meanwhile.
//!
//! ## Example
//! ```no_run
//! use taskbatch::{registry, UnitConfig};
//!
//! # async fn example() {
//! let queue = registry::init(UnitConfig::new("global"));
//! assert!(registry::get().is_some());
//! registry::reset().await.ok();
//! assert!(registry::get().is_none());
//! # }
//! ```

use std::sync::{Mutex, OnceLock};

use crate::config::UnitConfig;
use crate::core::Queue;
use crate::error::SchedulerError;
use crate::render::Render;

static SLOT: OnceLock<Mutex<Option<Queue>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<Queue>> {
    SLOT.get_or_init(|| Mutex::new(None))
}

/// Returns the registered queue, creating it from `cfg` if absent.
///
/// Must be called inside a tokio runtime when it creates the queue.
pub fn init(cfg: UnitConfig) -> Queue {
    let mut guard = slot().lock().expect("registry lock poisoned");
    if let Some(existing) = guard.as_ref() {
        tracing::debug!(
            existing = %existing.title(),
            requested = %cfg.spec().title(),
            "registry already initialized; returning the existing queue"
        );
        return existing.clone();
    }
    let queue = Queue::create(cfg);
    *guard = Some(queue.clone());
    queue
}

/// Like [`init`], with an explicit renderer.
pub fn init_with(cfg: UnitConfig, renderer: std::sync::Arc<dyn Render>) -> Queue {
    let mut guard = slot().lock().expect("registry lock poisoned");
    if let Some(existing) = guard.as_ref() {
        tracing::debug!(
            existing = %existing.title(),
            requested = %cfg.spec().title(),
            "registry already initialized; returning the existing queue"
        );
        return existing.clone();
    }
    let queue = Queue::create_with(cfg, renderer);
    *guard = Some(queue.clone());
    queue
}

/// Returns the registered queue, if any. Never constructs.
pub fn get() -> Option<Queue> {
    slot().lock().expect("registry lock poisoned").clone()
}

/// Awaits the registered queue's completion, then clears the registration.
///
/// Returns the queue's settled outcome, or `Ok(())` when nothing was
/// registered. If a different queue was registered while completion was in
/// flight, the newer registration is left in place.
pub async fn reset() -> Result<(), SchedulerError> {
    let Some(queue) = get() else {
        return Ok(());
    };
    let outcome = queue.complete().await;
    let mut guard = slot().lock().expect("registry lock poisoned");
    if guard.as_ref().is_some_and(|current| current.ptr_eq(&queue)) {
        *guard = None;
    }
    outcome
}
