//! # Node specification.
//!
//! Defines [`NodeSpec`], the configuration bundle describing one task node:
//! title, optional body, execution-order mode, concurrency policy for its
//! direct children, and the execution directives the scheduler forwards to the
//! renderer verbatim (`skip`, `retry`, `rollback`, `enabled`).
//!
//! ## Rules
//! - The title is required and non-empty; an empty title is a construction
//!   error and panics synchronously (see [`NodeSpec::new`]).
//! - Directives are opaque to the scheduling core: the renderer applies them.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskbatch::{done, BodyFn, ExecOptions, NodeSpec, RunMode};
//!
//! let spec = NodeSpec::new("fetch sources")
//!     .with_body(BodyFn::arc(|_ctx, _live| async { done() }))
//!     .with_mode(RunMode::Before)
//!     .with_options(ExecOptions::concurrent())
//!     .with_retry(3, Duration::from_millis(250));
//! assert_eq!(spec.title(), "fetch sources");
//! ```

use std::time::Duration;

use crate::nodes::body::BodyRef;
use crate::nodes::mode::RunMode;

/// Concurrency policy for a node's direct children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecOptions {
    /// Interleave sibling execution instead of running them in registration
    /// order.
    pub concurrent: bool,
    /// Abort the remaining siblings after the first failure and propagate it
    /// to the owning unit's completion.
    pub exit_on_error: bool,
}

impl Default for ExecOptions {
    /// Sequential, fail-fast: `concurrent = false`, `exit_on_error = true`.
    fn default() -> Self {
        Self {
            concurrent: false,
            exit_on_error: true,
        }
    }
}

impl ExecOptions {
    /// Sequential execution that records failures and keeps going.
    pub fn tolerant() -> Self {
        Self {
            concurrent: false,
            exit_on_error: false,
        }
    }

    /// Interleaved execution, fail-fast at the unit level.
    pub fn concurrent() -> Self {
        Self {
            concurrent: true,
            exit_on_error: true,
        }
    }
}

/// Retry directive, forwarded to the renderer verbatim.
///
/// The scheduling core never performs retry arithmetic itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Retry {
    /// Additional attempts after the first failure.
    pub tries: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

/// Specification for one task node.
///
/// Created with [`NodeSpec::new`] and refined with `with_*` builders; passed
/// to `add` on a [`Task`](crate::Task), [`Queue`](crate::Queue), or
/// [`NodeHandle`](crate::NodeHandle).
#[derive(Clone)]
pub struct NodeSpec {
    title: String,
    body: Option<BodyRef>,
    mode: Option<RunMode>,
    options: Option<ExecOptions>,
    skip: bool,
    enabled: bool,
    retry: Option<Retry>,
    rollback: Option<BodyRef>,
    exit_after_rollback: bool,
}

impl NodeSpec {
    /// Creates a specification with the given title and no body.
    ///
    /// # Panics
    /// Panics if `title` is empty or whitespace-only. A missing title is the
    /// one fatal construction error of the engine and is raised synchronously.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        assert!(
            !title.trim().is_empty(),
            "task title must be non-empty"
        );
        Self {
            title,
            body: None,
            mode: None,
            options: None,
            skip: false,
            enabled: true,
            retry: None,
            rollback: None,
            exit_after_rollback: false,
        }
    }

    /// Attaches the node's body.
    pub fn with_body(mut self, body: BodyRef) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the execution-order mode explicitly. Unset modes fall back to the
    /// owning unit's default.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the concurrency policy for this node's direct children.
    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Marks the node to be skipped by the renderer.
    pub fn with_skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Enables or disables the node (disabled nodes never run).
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Attaches a retry directive: `tries` extra attempts, `delay` apart.
    pub fn with_retry(mut self, tries: u32, delay: Duration) -> Self {
        self.retry = Some(Retry { tries, delay });
        self
    }

    /// Attaches a rollback body, run by the renderer after the final failed
    /// attempt.
    pub fn with_rollback(mut self, rollback: BodyRef) -> Self {
        self.rollback = Some(rollback);
        self
    }

    /// After a rollback runs, abort the remaining siblings as well.
    pub fn with_exit_after_rollback(mut self) -> Self {
        self.exit_after_rollback = true;
        self
    }

    /// Node title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The node's body, if any.
    pub fn body(&self) -> Option<&BodyRef> {
        self.body.as_ref()
    }

    /// Explicit execution-order mode, if set.
    pub fn mode(&self) -> Option<RunMode> {
        self.mode
    }

    /// Explicit child concurrency policy, if set.
    pub fn options(&self) -> Option<ExecOptions> {
        self.options
    }

    /// Skip directive.
    pub fn skip(&self) -> bool {
        self.skip
    }

    /// Enabled directive.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Retry directive, if set.
    pub fn retry(&self) -> Option<Retry> {
        self.retry
    }

    /// Rollback body, if set.
    pub fn rollback(&self) -> Option<&BodyRef> {
        self.rollback.as_ref()
    }

    /// Whether a rollback aborts the remaining siblings.
    pub fn exit_after_rollback(&self) -> bool {
        self.exit_after_rollback
    }
}

impl std::fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("title", &self.title)
            .field("has_body", &self.body.is_some())
            .field("mode", &self.mode)
            .field("options", &self.options)
            .field("skip", &self.skip)
            .field("enabled", &self.enabled)
            .field("retry", &self.retry)
            .field("has_rollback", &self.rollback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "task title must be non-empty")]
    fn test_empty_title_panics() {
        let _ = NodeSpec::new("   ");
    }

    #[test]
    fn test_builder_accumulates() {
        let spec = NodeSpec::new("t")
            .with_mode(RunMode::Only)
            .with_options(ExecOptions::tolerant())
            .with_skip()
            .with_retry(2, Duration::from_millis(10));
        assert_eq!(spec.mode(), Some(RunMode::Only));
        assert_eq!(spec.options(), Some(ExecOptions::tolerant()));
        assert!(spec.skip());
        assert!(spec.enabled());
        assert_eq!(
            spec.retry(),
            Some(Retry {
                tries: 2,
                delay: Duration::from_millis(10)
            })
        );
    }
}
