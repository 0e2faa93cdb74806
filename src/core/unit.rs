//! # Unit engine: pending buffer, debounce driver, batch dispatch.
//!
//! One [`UnitInner`] backs every root unit ([`Task`](crate::Task) and
//! [`Queue`](crate::Queue) are thin wrappers with different mode defaults).
//! It owns the pending buffer, the debounce driver task, the idle timers, the
//! lifecycle state, and the unit's completion cell.
//!
//! ## Control flow
//! ```text
//! add(spec)
//!   ├─► buffer.push(node), pending += 1, subtask observers notified
//!   ├─► auto_complete cancelled, auto_execute rearmed
//!   └─► wake driver ──► debounce window (restarts per registration)
//!                            │ elapses
//!                            ▼
//!                      drain buffer atomically
//!                            │
//!                      [Before/Wrap: unit body once, gating the batch]
//!                            │
//!                      tree builder ──► renderer.render(tree)
//!                            │
//!                      settle item cells, update counters
//!                            │
//!              ┌─ buffer gained items ─► safety delay ─► next cycle
//!              └─ buffer empty ─► Idle, idle timers may arm
//! ```
//!
//! ## Rules
//! - Batch N settles before batch N+1 submits (the batch lock serializes
//!   cycles; `complete()` awaits it before the final drain).
//! - `force_shutdown` rejects only not-yet-started work; an in-flight batch
//!   runs to its natural end and its settlements stand (first-write-wins).
//! - Neither idle timer is (re)armed once shutdown is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::config::UnitConfig;
use crate::context::SharedContext;
use crate::core::completion::SettleCell;
use crate::core::state::{StateCell, Stats, StatsSnapshot, UnitState};
use crate::core::timer::IdleTimer;
use crate::error::{SchedulerError, TaskError};
use crate::nodes::{NodeHandle, NodeSpec, RunMode, TaskNode};
use crate::observers::{ObserverSet, ObserverToken};
use crate::render::{ItemOutcome, Render, RenderTree};
use crate::tree::{build_item, Inherit};

/// Shared engine behind both unit flavors.
pub(crate) struct UnitInner {
    /// Self-handle for spawning timer callbacks from `&self` methods.
    me: Weak<UnitInner>,
    cfg: UnitConfig,
    default_mode: RunMode,
    renderer: Arc<dyn Render>,
    ctx: SharedContext,

    buffer: Mutex<Vec<Arc<TaskNode>>>,
    wake: Notify,
    shutdown: CancellationToken,
    shutdown_requested: AtomicBool,
    body_executed: AtomicBool,

    state: StateCell,
    stats: Stats,
    completion: SettleCell<Result<(), SchedulerError>>,
    batch_lock: tokio::sync::Mutex<()>,

    auto_execute: IdleTimer,
    auto_complete: IdleTimer,
    subtask_observers: ObserverSet<NodeHandle>,
}

impl UnitInner {
    /// Creates the engine and spawns its driver. Must run inside a tokio
    /// runtime.
    pub(crate) fn create(
        cfg: UnitConfig,
        default_mode: RunMode,
        renderer: Arc<dyn Render>,
    ) -> Arc<Self> {
        let inner = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            cfg,
            default_mode,
            renderer,
            ctx: SharedContext::new(),
            buffer: Mutex::new(Vec::new()),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
            shutdown_requested: AtomicBool::new(false),
            body_executed: AtomicBool::new(false),
            state: StateCell::new(),
            stats: Stats::new(),
            completion: SettleCell::new(),
            batch_lock: tokio::sync::Mutex::new(()),
            auto_execute: IdleTimer::new(),
            auto_complete: IdleTimer::new(),
            subtask_observers: ObserverSet::new(),
        });
        let driver = Arc::clone(&inner);
        tokio::spawn(async move { driver.drive().await });
        inner
    }

    pub(crate) fn title(&self) -> &str {
        self.cfg.spec().title()
    }

    pub(crate) fn context(&self) -> SharedContext {
        self.ctx.clone()
    }

    pub(crate) fn state(&self) -> UnitState {
        self.state.get()
    }

    pub(crate) fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn pending_count(&self) -> u64 {
        self.stats.pending()
    }

    pub(crate) fn on_state(
        &self,
        callback: impl Fn(&UnitState) + Send + Sync + 'static,
    ) -> ObserverToken {
        self.state.subscribe(callback)
    }

    pub(crate) fn unsubscribe_state(&self, token: ObserverToken) {
        self.state.unsubscribe(token);
    }

    pub(crate) fn on_subtask(
        &self,
        callback: impl Fn(&NodeHandle) + Send + Sync + 'static,
    ) -> ObserverToken {
        self.subtask_observers.subscribe(callback)
    }

    pub(crate) fn unsubscribe_subtask(&self, token: ObserverToken) {
        self.subtask_observers.unsubscribe(token);
    }

    /// Waits for the unit's aggregate settlement.
    pub(crate) async fn done(&self) -> Result<(), SchedulerError> {
        self.completion.wait().await
    }

    // ---- registration ----

    /// Registers one item. `None` once shutdown has begun or the unit is
    /// terminal.
    pub(crate) fn add(&self, spec: NodeSpec) -> Option<NodeHandle> {
        let node = TaskNode::new(spec);
        {
            // flag check and push share the buffer lock so a deferred
            // completion cannot slip between them
            let mut buffer = self.buffer.lock().expect("buffer lock poisoned");
            if self.shutdown_requested.load(Ordering::SeqCst) || self.state.get().is_terminal() {
                tracing::warn!(
                    unit = %self.title(),
                    item = %node.title(),
                    "add ignored: unit is shut down"
                );
                return None;
            }
            buffer.push(Arc::clone(&node));
        }
        let handle = NodeHandle::new(node);
        self.stats.registered();
        self.state.set(UnitState::Processing);
        self.subtask_observers.notify(&handle);
        self.auto_complete.cancel();
        self.rearm_auto_execute();
        self.wake.notify_one();
        Some(handle)
    }

    /// Registers several items in order; `None` on the same misuse as `add`.
    pub(crate) fn add_all(&self, specs: Vec<NodeSpec>) -> Option<Vec<NodeHandle>> {
        specs.into_iter().map(|spec| self.add(spec)).collect()
    }

    // ---- driver ----

    async fn drive(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = self.wake.notified() => {}
            }
            // debounce: the window restarts on every registration
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => return,
                    _ = self.wake.notified() => {}
                    _ = tokio::time::sleep(self.cfg.debounce()) => break,
                }
            }
            self.run_cycles().await;
            if self.shutdown.is_cancelled() || self.state.get().is_terminal() {
                return;
            }
            self.on_idle();
        }
    }

    /// Drains and runs batches until the buffer stays empty, with the
    /// inter-cycle safety delay between cycles.
    async fn run_cycles(&self) {
        loop {
            let batch = self.drain();
            if batch.is_empty() {
                return;
            }
            self.run_batch(batch).await;
            if self.shutdown.is_cancelled() || self.state.get().is_terminal() {
                return;
            }
            if self.buffer.lock().expect("buffer lock poisoned").is_empty() {
                return;
            }
            // short safety delay equal to the debounce window, so work that
            // arrived mid-batch can still coalesce
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = tokio::time::sleep(self.cfg.debounce()) => {}
            }
        }
    }

    fn drain(&self) -> Vec<Arc<TaskNode>> {
        std::mem::take(&mut *self.buffer.lock().expect("buffer lock poisoned"))
    }

    /// Runs one drained batch through the renderer and settles its items.
    async fn run_batch(&self, batch: Vec<Arc<TaskNode>>) {
        let _guard = self.batch_lock.lock().await;
        if !self.shutdown_requested.load(Ordering::SeqCst) {
            self.state.set(UnitState::Processing);
        }

        // Before/Wrap: the unit's own body gates its children
        if matches!(self.unit_mode(), RunMode::Before | RunMode::Wrap) {
            if let Err(err) = self.run_unit_body_locked().await {
                let rejection = Err(TaskError::Aborted {
                    reason: err.to_string(),
                });
                for node in &batch {
                    node.settle_all(&rejection);
                    self.stats.item_failed();
                }
                return;
            }
        }

        let inherit = self.inherit();
        let policy = self.unit_policy();
        let nodes = batch
            .iter()
            .map(|node| build_item(node, inherit, true))
            .collect();
        let tree = RenderTree {
            ctx: self.ctx.clone(),
            nodes,
            policy,
        };
        let mut outcomes = self.renderer.render(tree).await;
        if outcomes.len() != batch.len() {
            tracing::warn!(
                unit = %self.title(),
                expected = batch.len(),
                got = outcomes.len(),
                "renderer returned a short outcome list; missing items treated as not run"
            );
            outcomes.resize(batch.len(), ItemOutcome::NotRun);
        }

        let mut fatal: Option<SchedulerError> = None;
        for (node, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                ItemOutcome::Completed => {
                    node.settle_subtree(Ok(()), &Ok(()));
                    self.stats.item_processed();
                }
                ItemOutcome::Failed(err) => {
                    let rest = Err(TaskError::Aborted {
                        reason: err.to_string(),
                    });
                    node.settle_subtree(Err(err.clone()), &rest);
                    self.stats.item_failed();
                    if policy.exit_on_error && fatal.is_none() {
                        fatal = Some(SchedulerError::ItemFailed {
                            title: node.title().to_string(),
                            error: err.to_string(),
                        });
                    }
                }
                ItemOutcome::NotRun => {
                    let rejection = Err(TaskError::Aborted {
                        reason: "batch aborted".into(),
                    });
                    node.settle_all(&rejection);
                    self.stats.item_failed();
                }
            }
        }
        if let Some(err) = fatal {
            self.fail(err);
        }
    }

    /// Runs the unit's own body exactly once through the renderer, honoring
    /// the unit-level directives. Caller must hold the batch lock.
    async fn run_unit_body_locked(&self) -> Result<(), SchedulerError> {
        if self.unit_mode() == RunMode::Only || self.cfg.spec().body().is_none() {
            return Ok(());
        }
        if self.body_executed.swap(true, Ordering::SeqCst) {
            // a failed earlier run has already settled the unit
            return match self.completion.peek() {
                Some(Err(err)) => Err(err),
                _ => Ok(()),
            };
        }
        tracing::debug!(unit = %self.title(), "running unit body");
        let node = TaskNode::new(self.cfg.spec().clone());
        let tree = RenderTree {
            ctx: self.ctx.clone(),
            nodes: vec![build_item(&node, self.inherit(), true)],
            policy: self.unit_policy(),
        };
        match self.renderer.render(tree).await.into_iter().next() {
            Some(ItemOutcome::Completed) => Ok(()),
            Some(ItemOutcome::Failed(err)) => {
                let err = SchedulerError::BodyFailed {
                    error: err.to_string(),
                };
                self.fail(err.clone());
                Err(err)
            }
            Some(ItemOutcome::NotRun) | None => {
                let err = SchedulerError::BodyFailed {
                    error: "unit body did not run".into(),
                };
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    // ---- idle behaviors ----

    fn on_idle(&self) {
        if self.shutdown_requested.load(Ordering::SeqCst) || self.state.get().is_terminal() {
            return;
        }
        if !self.buffer.lock().expect("buffer lock poisoned").is_empty() {
            return; // a registration raced in; the driver wakes again
        }
        self.state.set(UnitState::Idle);
        if self.deferred_body_pending() {
            self.rearm_auto_execute();
            return; // auto_complete arms after the deferred body, not alongside
        }
        self.maybe_arm_auto_complete();
    }

    /// True while an AFTER-mode unit body still awaits its explicit drive.
    fn deferred_body_pending(&self) -> bool {
        self.unit_mode() == RunMode::After
            && self.cfg.spec().body().is_some()
            && !self.body_executed.load(Ordering::SeqCst)
    }

    fn rearm_auto_execute(&self) {
        let Some(idle) = self.cfg.auto_execute() else {
            return;
        };
        if self.shutdown_requested.load(Ordering::SeqCst) || !self.deferred_body_pending() {
            return;
        }
        let inner = self.arc();
        self.auto_execute
            .arm(idle, async move { inner.deferred_execute().await });
    }

    fn maybe_arm_auto_complete(&self) {
        let Some(idle) = self.cfg.auto_complete() else {
            return;
        };
        if self.shutdown_requested.load(Ordering::SeqCst) || self.state.get().is_terminal() {
            return;
        }
        if !self.buffer.lock().expect("buffer lock poisoned").is_empty() {
            return;
        }
        if self.deferred_body_pending() {
            return; // explicit drive required before the unit may auto-complete
        }
        let inner = self.arc();
        self.auto_complete
            .arm(idle, async move { inner.deferred_complete().await });
    }

    /// `auto_execute` expiry: drain whatever is buffered, then run the unit
    /// body once, then let `auto_complete` take over.
    async fn deferred_execute(self: Arc<Self>) {
        if self.shutdown_requested.load(Ordering::SeqCst) || self.state.get().is_terminal() {
            return;
        }
        self.run_cycles().await;
        if self.state.get().is_terminal() {
            return;
        }
        let ran = {
            let _guard = self.batch_lock.lock().await;
            self.run_unit_body_locked().await
        };
        if ran.is_ok() {
            self.maybe_arm_auto_complete();
        }
    }

    /// `auto_complete` expiry: re-validate quiescence, then settle.
    async fn deferred_complete(self: Arc<Self>) {
        if self.shutdown_requested.load(Ordering::SeqCst) || self.state.get().is_terminal() {
            return;
        }
        let _guard = self.batch_lock.lock().await; // no batch mid-flight
        {
            let buffer = self.buffer.lock().expect("buffer lock poisoned");
            if !buffer.is_empty() {
                return; // a registration landed exactly at expiry
            }
            if self.shutdown_requested.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        tracing::debug!(unit = %self.title(), "auto-completing after idle window");
        self.state.set(UnitState::Completed);
        self.completion.settle(Ok(()));
        self.shutdown.cancel();
    }

    // ---- completion protocol ----

    /// Soft shutdown: drain everything, run unexecuted body work, settle.
    /// Idempotent on terminal units.
    pub(crate) async fn complete(&self) -> Result<(), SchedulerError> {
        if let Some(settled) = self.completion.peek() {
            return settled;
        }
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.cancel_timers();
        self.shutdown.cancel();

        // wait out any batch already mid-flight
        drop(self.batch_lock.lock().await);
        if let Some(settled) = self.completion.peek() {
            return settled; // the in-flight batch failed the unit
        }
        self.state.set(UnitState::Completing);

        loop {
            let batch = self.drain();
            if batch.is_empty() {
                break;
            }
            self.run_batch(batch).await;
            if let Some(settled) = self.completion.peek() {
                return settled; // failed during the final drain
            }
        }

        {
            let _guard = self.batch_lock.lock().await;
            if let Err(err) = self.run_unit_body_locked().await {
                return self.completion.peek().unwrap_or(Err(err));
            }
        }
        if let Some(settled) = self.completion.peek() {
            return settled;
        }
        self.state.set(UnitState::Completed);
        self.completion.settle(Ok(()));
        Ok(())
    }

    /// Hard shutdown: reject all not-yet-started work and fail the unit.
    /// A batch already mid-flight is neither awaited nor cancelled.
    pub(crate) fn force_shutdown(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.state.get().is_terminal() {
            tracing::warn!(unit = %self.title(), "force_shutdown ignored: unit already terminal");
            return;
        }
        tracing::debug!(unit = %self.title(), reason = %reason, "forced shutdown");
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.cancel_timers();

        let buffered = self.drain();
        let rejection = Err(TaskError::Aborted {
            reason: reason.clone(),
        });
        for node in buffered {
            node.settle_all(&rejection);
            self.stats.item_failed();
        }
        self.completion.settle(Err(SchedulerError::Aborted { reason }));
        self.state.set(UnitState::Failed);
        self.shutdown.cancel();
    }

    // ---- helpers ----

    /// Strong self-handle. A `&self` borrow proves at least one strong
    /// reference is alive, so the upgrade cannot fail.
    fn arc(&self) -> Arc<Self> {
        self.me.upgrade().expect("unit inner alive while borrowed")
    }

    fn fail(&self, err: SchedulerError) {
        self.cancel_timers();
        // anything still buffered will never start
        let rejection = Err(TaskError::Aborted {
            reason: err.to_string(),
        });
        for node in self.drain() {
            node.settle_all(&rejection);
            self.stats.item_failed();
        }
        self.completion.settle(Err(err));
        self.state.set(UnitState::Failed);
        self.shutdown.cancel();
    }

    fn cancel_timers(&self) {
        self.auto_execute.cancel();
        self.auto_complete.cancel();
    }

    fn unit_mode(&self) -> RunMode {
        self.cfg.spec().mode().unwrap_or(self.default_mode)
    }

    fn unit_policy(&self) -> crate::nodes::ExecOptions {
        self.cfg.spec().options().unwrap_or_default()
    }

    fn inherit(&self) -> Inherit {
        Inherit {
            default_mode: self.default_mode,
            unit_options: self.unit_policy(),
            default_subtask_options: self.cfg.default_subtask_options(),
        }
    }
}
