//! # Live updates from running bodies.
//!
//! Each running body receives a [`LiveHandle`] through which it can mutate the
//! displayed title and emit transient output. The handle forwards to a
//! [`LiveSink`] supplied by the renderer; the scheduling core never interprets
//! these updates.

use std::sync::Arc;

/// Receiver for live title/output updates, supplied by the renderer.
pub trait LiveSink: Send + Sync {
    /// Replaces the displayed title of the running node.
    fn set_title(&self, title: String);

    /// Emits transient output for the running node.
    fn set_output(&self, output: String);
}

/// Handle handed to a body for live updates.
///
/// Cheap to clone; all clones forward to the same sink.
#[derive(Clone)]
pub struct LiveHandle {
    sink: Arc<dyn LiveSink>,
}

impl LiveHandle {
    /// Wraps a renderer-supplied sink.
    pub fn new(sink: Arc<dyn LiveSink>) -> Self {
        Self { sink }
    }

    /// A handle that discards every update.
    pub fn noop() -> Self {
        struct Noop;
        impl LiveSink for Noop {
            fn set_title(&self, _title: String) {}
            fn set_output(&self, _output: String) {}
        }
        Self::new(Arc::new(Noop))
    }

    /// Replaces the displayed title of the running node.
    pub fn set_title(&self, title: impl Into<String>) {
        self.sink.set_title(title.into());
    }

    /// Emits transient output for the running node.
    pub fn set_output(&self, output: impl Into<String>) {
        self.sink.set_output(output.into());
    }
}

impl std::fmt::Debug for LiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHandle").finish_non_exhaustive()
    }
}
