//! # Execution-order modes.
//!
//! [`RunMode`] resolves how a node's own body composes with its children.
//! Dispatch is a closed enum match — one composition function per variant in
//! the tree builder, never string comparison.
//!
//! ## Choosing a mode
//! ```text
//! RunMode::Before   → body runs, then children; body error cancels children
//! RunMode::After    → body first; a dynamic subtree from the body replaces
//!                     the static children, otherwise static children follow
//! RunMode::Only     → body ignored; only children run
//! RunMode::Wrap     → same composition as After at the node level
//! ```
//!
//! Unresolved (`None`) modes fall back to the owning unit's default:
//! `Before` for a standalone [`Task`](crate::Task), `After` for a
//! [`Queue`](crate::Queue) and queue-submitted items.

/// Composition of a node's own body with its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Children execute only after the body completes; a body error means the
    /// children do not run.
    Before,
    /// Body executes first; if it returns a dynamic subtree, that subtree is
    /// honored in place of the static children, otherwise the static children
    /// run after the body resolves.
    ///
    /// At the **unit** level, an `After`-mode body is driven explicitly: it
    /// runs via `auto_execute` expiry or `complete()`, never implicitly. A
    /// unit whose host never invokes either will keep completing children
    /// without ever running its own body.
    After,
    /// Body is ignored (a no-op is substituted when absent); only children run.
    Only,
    /// Body wraps the children; node-level composition is identical to
    /// [`RunMode::After`].
    Wrap,
}

impl RunMode {
    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunMode::Before => "before",
            RunMode::After => "after",
            RunMode::Only => "only",
            RunMode::Wrap => "wrap",
        }
    }
}
