//! # taskbatch
//!
//! **Taskbatch** is a hierarchical task scheduling engine for Rust.
//!
//! It lets a host program register units of work at arbitrary times —
//! including after execution has already begun — and guarantees they are
//! debounced into batches, dispatched, and run to settlement with
//! well-defined ordering, concurrency, and failure policies. Rendering and
//! directive mechanics (skip/retry/rollback, live output) are delegated to a
//! pluggable renderer.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   NodeSpec   │   │   NodeSpec   │   │   NodeSpec   │
//!     │ (user item)  │   │ (user item)  │   │ (user item)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ add()            ▼ add()            ▼ add()
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Unit (Task / Queue)                                              │
//! │  - pending buffer (atomic drain)                                  │
//! │  - debounce driver (window restarts per registration)             │
//! │  - idle timers (auto_execute, auto_complete)                      │
//! │  - state cell + counters, token-based observers                   │
//! │  - completion cell (one per unit, one per item)                   │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼ debounce elapses
//!                      ┌──────────────────┐
//!                      │   Tree builder   │  RunMode composition:
//!                      │ (node → tree)    │  Before / After / Only / Wrap
//!                      └────────┬─────────┘
//!                               ▼ RenderTree
//!                      ┌──────────────────┐
//!                      │  Render (trait)  │  skip / retry / rollback,
//!                      │  SilentRenderer  │  sequential or interleaved
//!                      └────────┬─────────┘
//!                               ▼ Vec<ItemOutcome>
//!                  settle item cells, update counters,
//!                  re-drain or go idle (timers may arm)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ──add()──► Processing ──(batch drained, buffer empty)──► Idle
//! Processing ──(idle timers expire, nothing pending)──► Completed
//! Idle|Processing ──complete()──► Completing ──(final drain)──► Completed
//! any non-terminal ──force_shutdown(reason)──► Failed
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                    |
//! |-----------------|----------------------------------------------------------|---------------------------------------|
//! | **Units**       | Root task/queue with batching and lifecycle.             | [`Task`], [`Queue`], [`UnitConfig`]   |
//! | **Nodes**       | Hierarchical items with bodies, modes, directives.       | [`NodeSpec`], [`NodeHandle`], [`Body`]|
//! | **Modes**       | Compose a body with its children.                        | [`RunMode`]                           |
//! | **Rendering**   | Pluggable executor of declarative trees.                 | [`Render`], [`SilentRenderer`]        |
//! | **Context**     | Shared key/value state across a subtree.                 | [`SharedContext`]                     |
//! | **Observation** | Token-based state/registration observers.                | [`ObserverToken`], [`UnitState`]      |
//! | **Errors**      | Typed errors for units and bodies.                       | [`SchedulerError`], [`TaskError`]     |
//! | **Registry**    | Explicit process-wide queue singleton.                   | [`registry`]                          |
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use taskbatch::{done, BodyFn, NodeSpec, Queue, UnitConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = Queue::create(
//!         UnitConfig::new("deploy")
//!             .with_debounce(Duration::from_millis(25))
//!             .with_auto_complete(Duration::from_millis(500)),
//!     );
//!
//!     let upload = queue
//!         .add(NodeSpec::new("upload").with_body(BodyFn::arc(|ctx, live| async move {
//!             live.set_output("uploading…");
//!             ctx.insert("uploaded", serde_json::json!(true));
//!             done()
//!         })))
//!         .expect("queue accepts work");
//!
//!     upload.done().await?;
//!     queue.complete().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod core;
mod error;
mod nodes;
mod observers;
pub mod registry;
pub mod render;
mod tree;

// ---- Public re-exports ----

pub use config::{UnitConfig, DEFAULT_DEBOUNCE};
pub use context::SharedContext;
pub use core::{Queue, StatsSnapshot, Task, UnitState};
pub use error::{SchedulerError, TaskError};
pub use nodes::{done, Body, BodyFn, BodyOutput, BodyRef, ExecOptions, NodeHandle, NodeSpec, Retry, RunMode};
pub use observers::{ObserverSet, ObserverToken};
pub use render::{ItemOutcome, LiveHandle, LiveSink, Render, RenderNode, RenderTree, SilentRenderer};
