//! # Live task node and its host-facing handle.
//!
//! A [`TaskNode`] is created by `add` and owns its pending children and a
//! per-item completion cell. The host keeps a [`NodeHandle`], through which it
//! can append children (until the node executes) and await the node's
//! settlement.
//!
//! ## Rules
//! - `executed` flips exactly once, when the tree builder consumes the node;
//!   adding a child afterwards is logged at `warn` and returns `None`
//!   (non-fatal misuse, never an error value).
//! - The completion cell is first-write-wins: the node's authoritative
//!   settlement sticks, later back-fills are no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::completion::SettleCell;
use crate::error::TaskError;
use crate::nodes::spec::NodeSpec;

/// Live node: spec, pending children, executed flag, completion cell.
pub(crate) struct TaskNode {
    spec: NodeSpec,
    children: Mutex<Vec<Arc<TaskNode>>>,
    executed: AtomicBool,
    cell: SettleCell<Result<(), TaskError>>,
}

impl TaskNode {
    /// Creates a node from its spec.
    pub(crate) fn new(spec: NodeSpec) -> Arc<Self> {
        Arc::new(Self {
            spec,
            children: Mutex::new(Vec::new()),
            executed: AtomicBool::new(false),
            cell: SettleCell::new(),
        })
    }

    pub(crate) fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub(crate) fn title(&self) -> &str {
        self.spec.title()
    }

    /// Appends a child while the node has not yet executed.
    pub(crate) fn add_child(&self, spec: NodeSpec) -> Option<NodeHandle> {
        let child = TaskNode::new(spec);
        {
            let mut children = self.children.lock().expect("node lock poisoned");
            // the executed check lives under the children lock so a drain
            // cannot slip between check and push
            if self.executed.load(Ordering::SeqCst) {
                tracing::warn!(
                    parent = %self.title(),
                    child = %child.title(),
                    "child ignored: parent has already executed"
                );
                return None;
            }
            children.push(Arc::clone(&child));
        }
        Some(NodeHandle::new(child))
    }

    /// Flips the executed flag; returns `true` on the first call.
    pub(crate) fn mark_executed(&self) -> bool {
        // taken under the children lock: after this, add_child rejects
        let _children = self.children.lock().expect("node lock poisoned");
        !self.executed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn children_snapshot(&self) -> Vec<Arc<TaskNode>> {
        self.children.lock().expect("node lock poisoned").clone()
    }

    /// Settles this node's own cell (first write wins).
    pub(crate) fn settle(&self, result: Result<(), TaskError>) {
        self.cell.settle(result);
    }

    /// Settles this node and every descendant with the same value; already
    /// settled cells keep their outcome.
    pub(crate) fn settle_all(&self, value: &Result<(), TaskError>) {
        self.cell.settle(value.clone());
        for child in self.children_snapshot() {
            child.settle_all(value);
        }
    }

    /// Settles the root with `root` and back-fills every descendant that never
    /// ran (skipped or aborted) with `rest`.
    pub(crate) fn settle_subtree(&self, root: Result<(), TaskError>, rest: &Result<(), TaskError>) {
        self.cell.settle(root);
        for child in self.children_snapshot() {
            child.settle_all(rest);
        }
    }

    pub(crate) async fn wait(&self) -> Result<(), TaskError> {
        self.cell.wait().await
    }

    pub(crate) fn result(&self) -> Option<Result<(), TaskError>> {
        self.cell.peek()
    }
}

/// Host-facing handle to a registered node.
///
/// Cloneable; all clones refer to the same node. Dropping every handle does
/// not cancel the node.
#[derive(Clone)]
pub struct NodeHandle {
    node: Arc<TaskNode>,
}

impl NodeHandle {
    pub(crate) fn new(node: Arc<TaskNode>) -> Self {
        Self { node }
    }

    /// Title of the underlying node.
    pub fn title(&self) -> &str {
        self.node.title()
    }

    /// Appends a child node.
    ///
    /// Returns `None` (and logs at `warn`) once the node has executed.
    pub fn add(&self, spec: NodeSpec) -> Option<NodeHandle> {
        self.node.add_child(spec)
    }

    /// Appends several children in order; `None` if the node has executed.
    pub fn add_all(&self, specs: Vec<NodeSpec>) -> Option<Vec<NodeHandle>> {
        specs.into_iter().map(|spec| self.add(spec)).collect()
    }

    /// Waits for the node's settlement. Any number of callers may await this;
    /// each receives the same outcome.
    pub async fn done(&self) -> Result<(), TaskError> {
        self.node.wait().await
    }

    /// Returns the settled outcome without waiting, if available.
    pub fn result(&self) -> Option<Result<(), TaskError>> {
        self.node.result()
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("title", &self.title())
            .field("settled", &self.result().is_some())
            .finish()
    }
}
