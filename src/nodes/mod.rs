//! # Task node abstractions and specifications.
//!
//! This module provides the core node-related types:
//! - [`Body`] - trait for implementing async task bodies
//! - [`BodyFn`] - closure-based body implementation
//! - [`BodyRef`] - shared reference to a body (`Arc<dyn Body>`)
//! - [`BodyOutput`] - body result: plain completion or a dynamic subtree
//! - [`NodeSpec`] - specification bundling title, body, mode, and directives
//! - [`RunMode`] - execution-order mode composing body vs. children
//! - [`ExecOptions`] / [`Retry`] - concurrency policy and retry directive
//! - [`TaskNode`] / [`NodeHandle`] - live node and its host-facing handle

mod body;
mod mode;
mod node;
mod spec;

pub use body::{done, Body, BodyFn, BodyOutput, BodyRef};
pub use mode::RunMode;
pub use node::NodeHandle;
pub use spec::{ExecOptions, NodeSpec, Retry};

pub(crate) use node::TaskNode;
