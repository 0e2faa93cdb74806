//! # Unit configuration.
//!
//! [`UnitConfig`] describes one root unit: its own node spec (title, body,
//! mode, directives), the debounce window for batching, the idle-driven
//! auto-behaviors, and the default policy applied to subtask lists.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use taskbatch::{done, BodyFn, ExecOptions, UnitConfig};
//!
//! let cfg = UnitConfig::new("deploy")
//!     .with_body(BodyFn::arc(|_ctx, _live| async { done() }))
//!     .with_options(ExecOptions::tolerant())
//!     .with_auto_complete(Duration::from_millis(200))
//!     .with_debounce(Duration::from_millis(25));
//! assert_eq!(cfg.debounce(), Duration::from_millis(25));
//! ```

use std::time::Duration;

use crate::nodes::{BodyRef, ExecOptions, NodeSpec, RunMode};

/// Default debounce window between the last registration and a batch drain.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Configuration for a [`Task`](crate::Task) or [`Queue`](crate::Queue).
#[derive(Clone, Debug)]
pub struct UnitConfig {
    spec: NodeSpec,
    debounce: Duration,
    auto_complete: Option<Duration>,
    auto_execute: Option<Duration>,
    default_subtask_options: Option<ExecOptions>,
}

impl UnitConfig {
    /// Creates a configuration with the given title.
    ///
    /// # Panics
    /// Panics if `title` is empty or whitespace-only (see [`NodeSpec::new`]).
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            spec: NodeSpec::new(title),
            debounce: DEFAULT_DEBOUNCE,
            auto_complete: None,
            auto_execute: None,
            default_subtask_options: None,
        }
    }

    /// Attaches the unit's own body.
    pub fn with_body(mut self, body: BodyRef) -> Self {
        self.spec = self.spec.with_body(body);
        self
    }

    /// Sets the unit's execution-order mode explicitly.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.spec = self.spec.with_mode(mode);
        self
    }

    /// Sets the unit-level concurrency policy.
    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.spec = self.spec.with_options(options);
        self
    }

    /// Marks the unit body to be skipped by the renderer.
    pub fn with_skip(mut self) -> Self {
        self.spec = self.spec.with_skip();
        self
    }

    /// Attaches a retry directive to the unit body.
    pub fn with_retry(mut self, tries: u32, delay: Duration) -> Self {
        self.spec = self.spec.with_retry(tries, delay);
        self
    }

    /// Attaches a rollback body to the unit.
    pub fn with_rollback(mut self, rollback: BodyRef) -> Self {
        self.spec = self.spec.with_rollback(rollback);
        self
    }

    /// Sets the debounce window (positive durations only; zero is clamped to
    /// one millisecond so a drain always happens off the registration path).
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce.max(Duration::from_millis(1));
        self
    }

    /// Enables deferred completion after `idle` of quiescence.
    pub fn with_auto_complete(mut self, idle: Duration) -> Self {
        self.auto_complete = (idle > Duration::ZERO).then_some(idle);
        self
    }

    /// Enables deferred body execution after `idle` without registrations
    /// (AFTER-mode units with a body only).
    pub fn with_auto_execute(mut self, idle: Duration) -> Self {
        self.auto_execute = (idle > Duration::ZERO).then_some(idle);
        self
    }

    /// Default policy for subtask lists that set none explicitly.
    pub fn with_default_subtask_options(mut self, options: ExecOptions) -> Self {
        self.default_subtask_options = Some(options);
        self
    }

    pub(crate) fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    /// Debounce window in effect.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub(crate) fn auto_complete(&self) -> Option<Duration> {
        self.auto_complete
    }

    pub(crate) fn auto_execute(&self) -> Option<Duration> {
        self.auto_execute
    }

    pub(crate) fn default_subtask_options(&self) -> Option<ExecOptions> {
        self.default_subtask_options
    }
}
