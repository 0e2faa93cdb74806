//! # Body abstraction and closure-backed implementation.
//!
//! This module defines the [`Body`] trait (the async executor attached to a
//! node) and a convenient closure-backed implementation [`BodyFn`]. The common
//! handle type is [`BodyRef`], an `Arc<dyn Body>` suitable for sharing across
//! the runtime.
//!
//! A body receives the unit's [`SharedContext`] and a [`LiveHandle`] for
//! title/output updates, and settles with [`BodyOutput`]:
//! - [`BodyOutput::Done`] — plain completion;
//! - [`BodyOutput::Subtree`] — a dynamically produced list of child specs,
//!   honored in place of the static children for `After`/`Wrap` nodes.
//!
//! ## Example
//! ```rust
//! use taskbatch::{done, BodyFn, BodyRef, LiveHandle, SharedContext};
//!
//! let body: BodyRef = BodyFn::arc(|ctx: SharedContext, _live: LiveHandle| async move {
//!     ctx.insert("greeting", serde_json::json!("hello"));
//!     done()
//! });
//! let _ = body;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::SharedContext;
use crate::error::TaskError;
use crate::nodes::spec::NodeSpec;
use crate::render::LiveHandle;

/// Shared reference to a body.
pub type BodyRef = Arc<dyn Body>;

/// Result of a successful body run.
pub enum BodyOutput {
    /// The body is done; static children (if any) proceed per the node's mode.
    Done,
    /// Dynamically produced children, honored in place of the static children
    /// for `After`/`Wrap` nodes.
    Subtree(Vec<NodeSpec>),
}

/// Shorthand for `Ok(BodyOutput::Done)`, the common body return value.
pub fn done() -> Result<BodyOutput, TaskError> {
    Ok(BodyOutput::Done)
}

/// # Asynchronous unit of work attached to a node.
///
/// Implementations run cooperatively on the async runtime; a body must not
/// assume atomicity across its own await points when siblings run
/// concurrently.
#[async_trait]
pub trait Body: Send + Sync + 'static {
    /// Executes the body once.
    ///
    /// The renderer may invoke this again when a `retry` directive is in
    /// effect, so implementations keep per-run state inside the future.
    async fn run(&self, ctx: SharedContext, live: LiveHandle) -> Result<BodyOutput, TaskError>;
}

/// Closure-backed body implementation.
///
/// Wraps a closure that *creates* a new future per run, so retries never
/// observe stale state from a previous attempt.
pub struct BodyFn<F> {
    f: F,
}

impl<F> BodyFn<F> {
    /// Creates a new closure-backed body.
    ///
    /// Prefer [`BodyFn::arc`] when you immediately need a [`BodyRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the body and returns it as a shared handle (`Arc<dyn Body>`).
    pub fn arc<Fut>(f: F) -> BodyRef
    where
        F: Fn(SharedContext, LiveHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BodyOutput, TaskError>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Body for BodyFn<F>
where
    F: Fn(SharedContext, LiveHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BodyOutput, TaskError>> + Send + 'static,
{
    async fn run(&self, ctx: SharedContext, live: LiveHandle) -> Result<BodyOutput, TaskError> {
        (self.f)(ctx, live).await
    }
}
