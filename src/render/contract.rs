//! # The renderer contract.
//!
//! A renderer receives one [`RenderTree`] per batch: an ordered list of
//! [`RenderNode`]s plus the [`ExecOptions`] policy governing them. It executes
//! the nodes (in registration order when sequential, interleaved when
//! concurrent), applies the forwarded directives itself, and settles each
//! top-level node with an [`ItemOutcome`], positionally aligned with the
//! submitted list.
//!
//! ## Rules
//! - Directive mechanics (skip/enabled/retry/rollback) are the renderer's job;
//!   the scheduling core only forwards them and interprets outcomes.
//! - A body may resolve to [`NodeOutput::Subtree`]; the renderer executes the
//!   nested tree in place (dynamic children).
//! - Sequential execution with `exit_on_error` aborts the remainder of the
//!   list after the first failure; aborted nodes settle as
//!   [`ItemOutcome::NotRun`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::SharedContext;
use crate::error::TaskError;
use crate::nodes::{BodyRef, ExecOptions, Retry};
use crate::render::live::LiveHandle;

/// Boxed future produced by a composed node body.
pub type BoxBodyFuture = Pin<Box<dyn Future<Output = Result<NodeOutput, TaskError>> + Send>>;

/// Composed, re-invokable node body (retry re-invokes it).
pub type RenderBody = Arc<dyn Fn(SharedContext, LiveHandle) -> BoxBodyFuture + Send + Sync>;

/// Result of one body invocation.
pub enum NodeOutput {
    /// The node is finished.
    Done,
    /// Execute this nested tree in place, then finish the node with its
    /// aggregate outcome.
    Subtree(RenderTree),
}

/// One executable node, with the directives forwarded verbatim.
pub struct RenderNode {
    /// Display/identity label.
    pub title: String,
    /// Composed body (own body + children, per the node's mode).
    pub body: RenderBody,
    /// Skip directive: settle without running.
    pub skip: bool,
    /// Enabled directive: disabled nodes settle without running.
    pub enabled: bool,
    /// Retry directive.
    pub retry: Option<Retry>,
    /// Rollback body, run after the final failed attempt.
    pub rollback: Option<BodyRef>,
    /// Abort remaining siblings after a rollback ran.
    pub exit_after_rollback: bool,
}

/// One batch submission: shared context, ordered nodes, and policy.
pub struct RenderTree {
    /// Context shared by every body in the tree.
    pub ctx: SharedContext,
    /// Nodes in registration order.
    pub nodes: Vec<RenderNode>,
    /// Concurrency/failure policy for this list.
    pub policy: ExecOptions,
}

/// Terminal outcome of one top-level node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The node (including its subtree) completed, or was skipped/disabled.
    Completed,
    /// The node failed after all directives were applied.
    Failed(TaskError),
    /// The node never started (an earlier failure aborted the batch).
    NotRun,
}

/// # External executor of declarative task trees.
///
/// The scheduling engine drives any `Render` implementation; the embedded
/// [`SilentRenderer`](crate::render::SilentRenderer) is the default. A
/// terminal-UI renderer implements the same contract.
#[async_trait]
pub trait Render: Send + Sync + 'static {
    /// Executes the tree and returns one outcome per top-level node, in the
    /// submitted order.
    async fn render(&self, tree: RenderTree) -> Vec<ItemOutcome>;
}
