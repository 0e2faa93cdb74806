//! # Renderer contract and embedded reference renderer.
//!
//! The scheduling core never executes directives itself: it hands a
//! [`RenderTree`] to an implementation of [`Render`], which applies
//! skip/enabled/retry/rollback, runs bodies (sequentially or interleaved), and
//! settles each top-level item with an [`ItemOutcome`].
//!
//! ## Contents
//! - [`Render`], [`RenderTree`], [`RenderNode`], [`NodeOutput`],
//!   [`ItemOutcome`] — the contract
//! - [`LiveHandle`], [`LiveSink`] — live title/output updates for running
//!   bodies
//! - [`SilentRenderer`] — embedded, non-visual reference implementation
//!   (default renderer; reports through `tracing`)

mod contract;
pub mod embedded;
mod live;

pub use contract::{BoxBodyFuture, ItemOutcome, NodeOutput, Render, RenderBody, RenderNode, RenderTree};
pub use embedded::SilentRenderer;
pub use live::{LiveHandle, LiveSink};
