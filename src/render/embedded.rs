//! # Embedded reference renderer.
//!
//! [`SilentRenderer`] is a complete, non-visual implementation of the
//! [`Render`] contract: it executes trees, applies the forwarded directives
//! (skip, enabled, retry, rollback), honors dynamic subtrees, and reports
//! progress through `tracing` instead of a terminal UI.
//!
//! ## Execution flow
//! ```text
//! Sequential:                      Concurrent:
//!   node 1 ─► node 2 ─► node 3      join_all(node 1, node 2, node 3)
//!   │                               (cooperative interleaving, no ordering
//!   └─ failure + exit_on_error       guarantee between siblings)
//!      → remaining nodes NotRun
//! ```
//!
//! ## Rules
//! - `skip` / `enabled = false` settle the node as completed without running.
//! - `retry { tries, delay }`: up to `1 + tries` attempts, `delay` apart; a
//!   failing subtree counts as a failed attempt and is re-run whole.
//! - `rollback` runs once, after the final failed attempt; the node still
//!   settles with the original error. With `exit_after_rollback`, the
//!   remaining sequential siblings are aborted even when the policy would
//!   otherwise continue.
//! - Concurrent lists always run every sibling; `exit_on_error` is then
//!   enforced at the unit level, not mid-list.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use crate::context::SharedContext;
use crate::error::TaskError;
use crate::render::contract::{ItemOutcome, NodeOutput, Render, RenderNode, RenderTree};
use crate::render::live::{LiveHandle, LiveSink};

/// Non-visual renderer: full directive support, `tracing` reporting.
#[derive(Debug, Default)]
pub struct SilentRenderer;

impl SilentRenderer {
    /// Creates the renderer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Render for SilentRenderer {
    async fn render(&self, tree: RenderTree) -> Vec<ItemOutcome> {
        exec_tree(tree).await
    }
}

/// Live sink that routes updates to `tracing` under the node's title.
struct TraceSink {
    title: Mutex<String>,
}

impl TraceSink {
    fn new(title: String) -> Self {
        Self {
            title: Mutex::new(title),
        }
    }
}

impl LiveSink for TraceSink {
    fn set_title(&self, title: String) {
        let mut current = self.title.lock().expect("sink lock poisoned");
        tracing::debug!(from = %current, to = %title, "title updated");
        *current = title;
    }

    fn set_output(&self, output: String) {
        let title = self.title.lock().expect("sink lock poisoned");
        tracing::debug!(task = %title, output = %output, "output");
    }
}

fn exec_tree(tree: RenderTree) -> futures::future::BoxFuture<'static, Vec<ItemOutcome>> {
    Box::pin(async move {
        let RenderTree { ctx, nodes, policy } = tree;
        let mut outcomes = Vec::with_capacity(nodes.len());

        if policy.concurrent {
            let runs = nodes.into_iter().map(|node| exec_node(node, ctx.clone()));
            for result in join_all(runs).await {
                outcomes.push(outcome_of(result));
            }
        } else {
            let mut abort = false;
            for node in nodes {
                if abort {
                    outcomes.push(ItemOutcome::NotRun);
                    continue;
                }
                let hard_exit = node.exit_after_rollback && node.rollback.is_some();
                let result = exec_node(node, ctx.clone()).await;
                if result.is_err() && (policy.exit_on_error || hard_exit) {
                    abort = true;
                }
                outcomes.push(outcome_of(result));
            }
        }
        outcomes
    })
}

fn outcome_of(result: Result<(), TaskError>) -> ItemOutcome {
    match result {
        Ok(()) => ItemOutcome::Completed,
        Err(err) => ItemOutcome::Failed(err),
    }
}

/// Runs one node to its terminal outcome, applying its directives.
async fn exec_node(node: RenderNode, ctx: SharedContext) -> Result<(), TaskError> {
    if !node.enabled {
        tracing::debug!(task = %node.title, "disabled, not running");
        return Ok(());
    }
    if node.skip {
        tracing::debug!(task = %node.title, "skipped");
        return Ok(());
    }

    let live = LiveHandle::new(Arc::new(TraceSink::new(node.title.clone())));
    let attempts = 1 + node.retry.map_or(0, |r| r.tries);
    let delay = node.retry.map_or(Duration::ZERO, |r| r.delay);

    let mut last_err = TaskError::fail("body did not run");
    for attempt in 1..=attempts {
        match (node.body)(ctx.clone(), live.clone()).await {
            Ok(NodeOutput::Done) => return Ok(()),
            Ok(NodeOutput::Subtree(sub)) => match subtree_failure(exec_tree(sub).await) {
                None => return Ok(()),
                Some(err) => last_err = err,
            },
            Err(err) => last_err = err,
        }
        if attempt < attempts {
            tracing::debug!(task = %node.title, attempt, error = %last_err, "retrying");
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
        }
    }

    if let Some(rollback) = &node.rollback {
        tracing::debug!(task = %node.title, "rolling back");
        if let Err(rb_err) = rollback.run(ctx.clone(), live.clone()).await {
            tracing::warn!(task = %node.title, error = %rb_err, "rollback failed");
        }
    }
    tracing::debug!(task = %node.title, error = %last_err, "failed");
    Err(last_err)
}

/// First failure inside a finished subtree, if any.
fn subtree_failure(outcomes: Vec<ItemOutcome>) -> Option<TaskError> {
    let mut not_run = false;
    for outcome in outcomes {
        match outcome {
            ItemOutcome::Completed => {}
            ItemOutcome::Failed(err) => return Some(err),
            ItemOutcome::NotRun => not_run = true,
        }
    }
    not_run.then(|| TaskError::Aborted {
        reason: "subtree aborted".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::ExecOptions;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn leaf(title: &str, body: RenderBodyFor) -> RenderNode {
        RenderNode {
            title: title.into(),
            body,
            skip: false,
            enabled: true,
            retry: None,
            rollback: None,
            exit_after_rollback: false,
        }
    }

    type RenderBodyFor = crate::render::contract::RenderBody;

    fn ok_body(hits: Arc<AtomicU32>) -> RenderBodyFor {
        Arc::new(move |_ctx, _live| {
            let hits = Arc::clone(&hits);
            Box::pin(async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(NodeOutput::Done)
            })
        })
    }

    fn failing_body() -> RenderBodyFor {
        Arc::new(|_ctx, _live| Box::pin(async { Err(TaskError::fail("boom")) }))
    }

    #[tokio::test]
    async fn test_sequential_exit_on_error_aborts_tail() {
        let hits = Arc::new(AtomicU32::new(0));
        let tree = RenderTree {
            ctx: SharedContext::new(),
            nodes: vec![
                leaf("a", ok_body(Arc::clone(&hits))),
                leaf("b", failing_body()),
                leaf("c", ok_body(Arc::clone(&hits))),
            ],
            policy: ExecOptions::default(),
        };
        let outcomes = SilentRenderer::new().render(tree).await;
        assert_eq!(outcomes[0], ItemOutcome::Completed);
        assert!(matches!(outcomes[1], ItemOutcome::Failed(_)));
        assert_eq!(outcomes[2], ItemOutcome::NotRun);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tolerant_policy_runs_everything() {
        let hits = Arc::new(AtomicU32::new(0));
        let tree = RenderTree {
            ctx: SharedContext::new(),
            nodes: vec![
                leaf("a", ok_body(Arc::clone(&hits))),
                leaf("b", failing_body()),
                leaf("c", ok_body(Arc::clone(&hits))),
            ],
            policy: ExecOptions::tolerant(),
        };
        let outcomes = SilentRenderer::new().render(tree).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(matches!(outcomes[1], ItemOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_skip_and_disabled_complete_without_running() {
        let hits = Arc::new(AtomicU32::new(0));
        let mut skipped = leaf("s", ok_body(Arc::clone(&hits)));
        skipped.skip = true;
        let mut disabled = leaf("d", ok_body(Arc::clone(&hits)));
        disabled.enabled = false;

        let tree = RenderTree {
            ctx: SharedContext::new(),
            nodes: vec![skipped, disabled],
            policy: ExecOptions::default(),
        };
        let outcomes = SilentRenderer::new().render(tree).await;
        assert_eq!(outcomes, vec![ItemOutcome::Completed, ItemOutcome::Completed]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let body: RenderBodyFor = Arc::new(move |_ctx, _live| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TaskError::fail("flaky"))
                } else {
                    Ok(NodeOutput::Done)
                }
            })
        });
        let mut node = leaf("flaky", body);
        node.retry = Some(crate::nodes::Retry {
            tries: 3,
            delay: Duration::from_millis(10),
        });

        let tree = RenderTree {
            ctx: SharedContext::new(),
            nodes: vec![node],
            policy: ExecOptions::default(),
        };
        let outcomes = SilentRenderer::new().render(tree).await;
        assert_eq!(outcomes, vec![ItemOutcome::Completed]);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rollback_runs_after_final_failure() {
        let rolled_back = Arc::new(AtomicU32::new(0));
        let flag = Arc::clone(&rolled_back);
        let rollback = crate::nodes::BodyFn::arc(move |_ctx, _live| {
            let flag = Arc::clone(&flag);
            async move {
                flag.fetch_add(1, Ordering::SeqCst);
                crate::nodes::done()
            }
        });
        let mut node = leaf("fragile", failing_body());
        node.rollback = Some(rollback);

        let tree = RenderTree {
            ctx: SharedContext::new(),
            nodes: vec![node],
            policy: ExecOptions::tolerant(),
        };
        let outcomes = SilentRenderer::new().render(tree).await;
        assert!(matches!(outcomes[0], ItemOutcome::Failed(_)));
        assert_eq!(rolled_back.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dynamic_subtree_failure_fails_the_node() {
        let body: RenderBodyFor = Arc::new(|ctx, _live| {
            Box::pin(async move {
                Ok(NodeOutput::Subtree(RenderTree {
                    ctx,
                    nodes: vec![RenderNode {
                        title: "inner".into(),
                        body: Arc::new(|_c, _l| {
                            Box::pin(async { Err(TaskError::fail("inner boom")) })
                        }),
                        skip: false,
                        enabled: true,
                        retry: None,
                        rollback: None,
                        exit_after_rollback: false,
                    }],
                    policy: ExecOptions::default(),
                }))
            })
        });
        let tree = RenderTree {
            ctx: SharedContext::new(),
            nodes: vec![leaf("outer", body)],
            policy: ExecOptions::tolerant(),
        };
        let outcomes = SilentRenderer::new().render(tree).await;
        assert!(matches!(outcomes[0], ItemOutcome::Failed(_)));
    }
}
