//! # Tree builder: task nodes → renderer trees.
//!
//! Converts a [`TaskNode`] plus its pending children into a
//! renderer-consumable [`RenderNode`], resolving the execution-order mode with
//! one explicit composition function per [`RunMode`] variant.
//!
//! ## Composition
//! ```text
//! Before      body ─ok─► children          body ─err─► children do not run
//! After/Wrap  body ─Subtree─► dynamic children (static children replaced)
//!             body ─Done────► static children
//! Only        (body ignored) ─► children
//! ```
//!
//! ## Rules
//! - `mark_executed` flips when a node is built; children can no longer be
//!   appended from that point.
//! - Child nodes build **lazily**, when the parent's composite body produces
//!   its subtree — a child may still gain grandchildren up to the moment its
//!   own parent settles.
//! - Non-root nodes settle their completion cell with the body's own outcome;
//!   root (batch item) cells are settled by the batch scheduler with the
//!   renderer's aggregate outcome.

use std::sync::Arc;

use crate::context::SharedContext;
use crate::error::TaskError;
use crate::nodes::{BodyOutput, ExecOptions, NodeSpec, RunMode, TaskNode};
use crate::render::{LiveHandle, NodeOutput, RenderBody, RenderNode, RenderTree};

/// Defaults inherited from the owning unit while building a subtree.
#[derive(Clone, Copy)]
pub(crate) struct Inherit {
    /// Mode applied when a node does not set one explicitly.
    pub default_mode: RunMode,
    /// Unit-level concurrency policy (last resort of the merge).
    pub unit_options: ExecOptions,
    /// Unit-configured default for subtask lists.
    pub default_subtask_options: Option<ExecOptions>,
}

/// Merged policy for a node's direct children:
/// explicit per-node > unit `default_subtask_options` > unit-level options.
pub(crate) fn options_for_children(spec: &NodeSpec, inherit: Inherit) -> ExecOptions {
    spec.options()
        .or(inherit.default_subtask_options)
        .unwrap_or(inherit.unit_options)
}

/// Builds one executable node. `root` marks batch items, whose cells the
/// batch scheduler settles from renderer outcomes.
pub(crate) fn build_item(node: &Arc<TaskNode>, inherit: Inherit, root: bool) -> RenderNode {
    node.mark_executed();
    let spec = node.spec();
    RenderNode {
        title: spec.title().to_string(),
        skip: spec.skip(),
        enabled: spec.enabled(),
        retry: spec.retry(),
        rollback: spec.rollback().cloned(),
        exit_after_rollback: spec.exit_after_rollback(),
        body: compose(Arc::clone(node), inherit, root),
    }
}

fn compose(node: Arc<TaskNode>, inherit: Inherit, root: bool) -> RenderBody {
    let mode = node.spec().mode().unwrap_or(inherit.default_mode);
    match mode {
        RunMode::Before => compose_before(node, inherit, root),
        RunMode::After | RunMode::Wrap => compose_after(node, inherit, root),
        RunMode::Only => compose_only(node, inherit, root),
    }
}

/// `Before`: body gates the children; a body error cancels them.
fn compose_before(node: Arc<TaskNode>, inherit: Inherit, root: bool) -> RenderBody {
    Arc::new(move |ctx: SharedContext, live: LiveHandle| {
        let node = Arc::clone(&node);
        Box::pin(async move {
            if let Some(body) = node.spec().body() {
                match body.run(ctx.clone(), live).await {
                    Ok(BodyOutput::Done) => {}
                    Ok(BodyOutput::Subtree(_)) => {
                        tracing::debug!(
                            task = %node.title(),
                            "dynamic subtree ignored outside after/wrap mode"
                        );
                    }
                    Err(err) => {
                        settle_own(&node, root, Err(err.clone()));
                        return Err(err);
                    }
                }
            }
            settle_own(&node, root, Ok(()));
            static_children(&node, ctx, inherit)
        })
    })
}

/// `After`/`Wrap`: body first; a dynamic subtree replaces the static children.
fn compose_after(node: Arc<TaskNode>, inherit: Inherit, root: bool) -> RenderBody {
    Arc::new(move |ctx: SharedContext, live: LiveHandle| {
        let node = Arc::clone(&node);
        Box::pin(async move {
            if let Some(body) = node.spec().body() {
                match body.run(ctx.clone(), live).await {
                    Ok(BodyOutput::Done) => {}
                    Ok(BodyOutput::Subtree(specs)) => {
                        settle_own(&node, root, Ok(()));
                        return Ok(dynamic_children(&node, specs, ctx, inherit));
                    }
                    Err(err) => {
                        settle_own(&node, root, Err(err.clone()));
                        return Err(err);
                    }
                }
            }
            settle_own(&node, root, Ok(()));
            static_children(&node, ctx, inherit)
        })
    })
}

/// `Only`: the body is ignored; only children run.
fn compose_only(node: Arc<TaskNode>, inherit: Inherit, root: bool) -> RenderBody {
    Arc::new(move |ctx: SharedContext, _live: LiveHandle| {
        let node = Arc::clone(&node);
        Box::pin(async move {
            settle_own(&node, root, Ok(()));
            static_children(&node, ctx, inherit)
        })
    })
}

fn settle_own(node: &Arc<TaskNode>, root: bool, result: Result<(), TaskError>) {
    if !root {
        node.settle(result);
    }
}

fn static_children(
    node: &Arc<TaskNode>,
    ctx: SharedContext,
    inherit: Inherit,
) -> Result<NodeOutput, TaskError> {
    let children = node.children_snapshot();
    if children.is_empty() {
        return Ok(NodeOutput::Done);
    }
    let nodes = children
        .iter()
        .map(|child| build_item(child, inherit, false))
        .collect();
    Ok(NodeOutput::Subtree(RenderTree {
        ctx,
        nodes,
        policy: options_for_children(node.spec(), inherit),
    }))
}

fn dynamic_children(
    node: &Arc<TaskNode>,
    specs: Vec<NodeSpec>,
    ctx: SharedContext,
    inherit: Inherit,
) -> NodeOutput {
    if specs.is_empty() {
        return NodeOutput::Done;
    }
    let nodes = specs
        .into_iter()
        .map(|spec| build_item(&TaskNode::new(spec), inherit, false))
        .collect();
    NodeOutput::Subtree(RenderTree {
        ctx,
        nodes,
        policy: options_for_children(node.spec(), inherit),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{done, BodyFn};
    use crate::render::{ItemOutcome, Render, RenderTree, SilentRenderer};
    use serde_json::json;

    fn inherit() -> Inherit {
        Inherit {
            default_mode: RunMode::Before,
            unit_options: ExecOptions::default(),
            default_subtask_options: None,
        }
    }

    async fn run_one(node: &Arc<TaskNode>) -> ItemOutcome {
        let tree = RenderTree {
            ctx: SharedContext::new(),
            nodes: vec![build_item(node, inherit(), true)],
            policy: ExecOptions::default(),
        };
        SilentRenderer::new()
            .render(tree)
            .await
            .into_iter()
            .next()
            .expect("one outcome")
    }

    #[test]
    fn test_options_merge_order() {
        let inherit = Inherit {
            default_mode: RunMode::Before,
            unit_options: ExecOptions::default(),
            default_subtask_options: Some(ExecOptions::tolerant()),
        };
        // explicit per-node wins
        let spec = NodeSpec::new("n").with_options(ExecOptions::concurrent());
        assert_eq!(options_for_children(&spec, inherit), ExecOptions::concurrent());
        // falls back to the unit's subtask default
        let spec = NodeSpec::new("n");
        assert_eq!(options_for_children(&spec, inherit), ExecOptions::tolerant());
        // last resort: unit-level options
        let inherit = Inherit {
            default_subtask_options: None,
            ..inherit
        };
        assert_eq!(options_for_children(&spec, inherit), ExecOptions::default());
    }

    #[tokio::test]
    async fn test_before_mode_body_error_cancels_children() {
        let node = TaskNode::new(
            NodeSpec::new("parent").with_body(BodyFn::arc(|_ctx, _live| async {
                Err(TaskError::fail("parent failed"))
            })),
        );
        let child = node
            .add_child(NodeSpec::new("child").with_body(BodyFn::arc(|ctx, _live| async move {
                ctx.insert("child-ran", json!(true));
                done()
            })))
            .expect("child added");

        let outcome = run_one(&node).await;
        assert!(matches!(outcome, ItemOutcome::Failed(_)));
        // child body never ran, and its cell reports the body error path only
        // after the batch scheduler back-fills; here it stays unsettled
        assert!(child.result().is_none());
    }

    #[tokio::test]
    async fn test_before_mode_children_see_body_mutations() {
        let node = TaskNode::new(
            NodeSpec::new("parent").with_body(BodyFn::arc(|ctx, _live| async move {
                ctx.insert("from-parent", json!("value"));
                done()
            })),
        );
        node.add_child(NodeSpec::new("child").with_body(BodyFn::arc(
            |ctx, _live| async move {
                match ctx.get("from-parent") {
                    Some(v) if v == json!("value") => done(),
                    other => Err(TaskError::fail(format!("missing mutation: {other:?}"))),
                }
            },
        )))
        .expect("child added");

        assert_eq!(run_one(&node).await, ItemOutcome::Completed);
    }

    #[tokio::test]
    async fn test_after_mode_dynamic_subtree_replaces_static_children() {
        let node = TaskNode::new(
            NodeSpec::new("parent")
                .with_mode(RunMode::After)
                .with_body(BodyFn::arc(|_ctx, _live| async {
                    Ok(BodyOutput::Subtree(vec![NodeSpec::new("dynamic").with_body(
                        BodyFn::arc(|ctx, _live| async move {
                            ctx.insert("dynamic-ran", json!(true));
                            done()
                        }),
                    )]))
                })),
        );
        let stale = node
            .add_child(NodeSpec::new("static").with_body(BodyFn::arc(
                |ctx, _live| async move {
                    ctx.insert("static-ran", json!(true));
                    done()
                },
            )))
            .expect("child added");

        let ctx = SharedContext::new();
        let tree = RenderTree {
            ctx: ctx.clone(),
            nodes: vec![build_item(&node, inherit(), true)],
            policy: ExecOptions::default(),
        };
        let outcome = SilentRenderer::new().render(tree).await.remove(0);
        assert_eq!(outcome, ItemOutcome::Completed);
        assert_eq!(ctx.get("dynamic-ran"), Some(json!(true)));
        assert!(ctx.get("static-ran").is_none());
        // replaced child never ran
        assert!(stale.result().is_none());
    }

    #[tokio::test]
    async fn test_only_mode_ignores_body() {
        let node = TaskNode::new(
            NodeSpec::new("parent")
                .with_mode(RunMode::Only)
                .with_body(BodyFn::arc(|ctx, _live| async move {
                    ctx.insert("body-ran", json!(true));
                    done()
                })),
        );
        node.add_child(NodeSpec::new("child").with_body(BodyFn::arc(
            |ctx, _live| async move {
                ctx.insert("child-ran", json!(true));
                done()
            },
        )))
        .expect("child added");

        let ctx = SharedContext::new();
        let tree = RenderTree {
            ctx: ctx.clone(),
            nodes: vec![build_item(&node, inherit(), true)],
            policy: ExecOptions::default(),
        };
        let outcome = SilentRenderer::new().render(tree).await.remove(0);
        assert_eq!(outcome, ItemOutcome::Completed);
        assert!(ctx.get("body-ran").is_none());
        assert_eq!(ctx.get("child-ran"), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_child_cell_settles_on_its_body_outcome() {
        let node = TaskNode::new(NodeSpec::new("parent"));
        let ok_child = node
            .add_child(NodeSpec::new("ok").with_body(BodyFn::arc(|_c, _l| async { done() })))
            .expect("child added");
        let bad_child = node
            .add_child(NodeSpec::new("bad").with_body(BodyFn::arc(|_c, _l| async {
                Err(TaskError::fail("nope"))
            })))
            .expect("child added");

        // tolerant policy so both children run
        let node_spec_options = Inherit {
            default_mode: RunMode::Before,
            unit_options: ExecOptions::tolerant(),
            default_subtask_options: None,
        };
        let tree = RenderTree {
            ctx: SharedContext::new(),
            nodes: vec![build_item(&node, node_spec_options, true)],
            policy: ExecOptions::tolerant(),
        };
        let _ = SilentRenderer::new().render(tree).await;
        assert_eq!(ok_child.result(), Some(Ok(())));
        assert!(matches!(bad_child.result(), Some(Err(TaskError::Fail { .. }))));
    }
}
