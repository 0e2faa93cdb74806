//! # Queue unit.
//!
//! A [`Queue`] is a root unit whose unresolved modes default to
//! [`RunMode::After`]: queue-submitted items run as they arrive, and the
//! queue's own body — if any — is driven explicitly, via `auto_execute`
//! expiry or [`Queue::complete`]. Its [`UnitState::Idle`] reads as IDLE.
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use taskbatch::{done, BodyFn, NodeSpec, Queue, UnitConfig};
//!
//! # async fn example() -> Result<(), taskbatch::SchedulerError> {
//! let queue = Queue::create(
//!     UnitConfig::new("uploads").with_auto_complete(Duration::from_millis(500)),
//! );
//! let handle = queue
//!     .add(NodeSpec::new("upload a.txt").with_body(BodyFn::arc(|_ctx, _live| async {
//!         done()
//!     })))
//!     .expect("queue accepts work");
//! handle.done().await.ok();
//! queue.complete().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::config::UnitConfig;
use crate::context::SharedContext;
use crate::core::state::{StatsSnapshot, UnitState};
use crate::core::unit::UnitInner;
use crate::error::SchedulerError;
use crate::nodes::{NodeHandle, NodeSpec, RunMode};
use crate::observers::ObserverToken;
use crate::render::{Render, SilentRenderer};

/// Root unit with `After`-default composition.
///
/// Cloneable; all clones drive the same unit. The unit's driver runs until a
/// terminal state — drive it there with [`Queue::complete`],
/// [`Queue::force_shutdown`], or the auto-behaviors.
#[derive(Clone)]
pub struct Queue {
    inner: Arc<UnitInner>,
}

impl Queue {
    /// Creates the unit with the embedded [`SilentRenderer`].
    ///
    /// Must be called inside a tokio runtime: creation spawns the unit's
    /// driver task.
    pub fn create(cfg: UnitConfig) -> Self {
        Self::create_with(cfg, Arc::new(SilentRenderer::new()))
    }

    /// Creates the unit with an explicit renderer.
    pub fn create_with(cfg: UnitConfig, renderer: Arc<dyn Render>) -> Self {
        Self {
            inner: UnitInner::create(cfg, RunMode::After, renderer),
        }
    }

    /// Enqueues an item. `None` once shutdown has begun or the unit is
    /// terminal (logged at `warn`, never fatal).
    pub fn add(&self, spec: NodeSpec) -> Option<NodeHandle> {
        self.inner.add(spec)
    }

    /// Enqueues several items in order.
    pub fn add_all(&self, specs: Vec<NodeSpec>) -> Option<Vec<NodeHandle>> {
        self.inner.add_all(specs)
    }

    /// Soft shutdown: drains remaining work, runs the deferred queue body if
    /// one exists, then settles. Idempotent.
    pub async fn complete(&self) -> Result<(), SchedulerError> {
        self.inner.complete().await
    }

    /// Hard shutdown: rejects all not-yet-started work with `reason` and
    /// fails the unit. A batch already mid-flight is not cancelled.
    pub fn force_shutdown(&self, reason: impl Into<String>) {
        self.inner.force_shutdown(reason);
    }

    /// Waits for the unit's settlement without requesting shutdown.
    pub async fn done(&self) -> Result<(), SchedulerError> {
        self.inner.done().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> UnitState {
        self.inner.state()
    }

    /// Observes state transitions; delivery is registration-ordered.
    pub fn on_state(
        &self,
        callback: impl Fn(&UnitState) + Send + Sync + 'static,
    ) -> ObserverToken {
        self.inner.on_state(callback)
    }

    /// Removes a state observer; stale tokens are ignored.
    pub fn unsubscribe_state(&self, token: ObserverToken) {
        self.inner.unsubscribe_state(token);
    }

    /// Observes registrations; the callback receives each new handle.
    pub fn on_subtask(
        &self,
        callback: impl Fn(&NodeHandle) + Send + Sync + 'static,
    ) -> ObserverToken {
        self.inner.on_subtask(callback)
    }

    /// Removes a subtask observer; stale tokens are ignored.
    pub fn unsubscribe_subtask(&self, token: ObserverToken) {
        self.inner.unsubscribe_subtask(token);
    }

    /// Items registered but not yet settled.
    pub fn pending_count(&self) -> u64 {
        self.inner.pending_count()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats()
    }

    /// The unit's shared context.
    pub fn context(&self) -> SharedContext {
        self.inner.context()
    }

    /// The unit's title.
    pub fn title(&self) -> &str {
        self.inner.title()
    }

    pub(crate) fn ptr_eq(&self, other: &Queue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("title", &self.title())
            .field("state", &self.state())
            .finish()
    }
}
