//! # Shared key/value context for one unit run.
//!
//! [`SharedContext`] is a mutable map every body in a unit's subtree can read
//! and write. One instance exists per root unit; child bodies observe all
//! mutations made by ancestors that ran strictly before them in the resolved
//! order.
//!
//! ## Rules
//! - Values are [`serde_json::Value`] — bodies exchange arbitrary JSON data.
//! - The lock is held only for the duration of a single `get`/`insert`; it is
//!   never held across an await point.
//! - Bodies must **not** assume atomicity across their own await points:
//!   sibling bodies interleave at suspension points when running concurrently.
//!
//! ## Example
//! ```rust
//! use taskbatch::SharedContext;
//!
//! let ctx = SharedContext::new();
//! ctx.insert("count", serde_json::json!(3));
//! assert_eq!(ctx.get("count"), Some(serde_json::json!(3)));
//! assert!(ctx.get("missing").is_none());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

/// Mutable key/value container shared across a unit's subtree.
///
/// Cloning is cheap (internally `Arc`-backed); all clones observe the same map.
#[derive(Clone, Debug, Default)]
pub struct SharedContext {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl SharedContext {
    /// Creates a new, empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().expect("context lock poisoned").get(key).cloned()
    }

    /// Stores `value` under `key`, returning the previous value if present.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner
            .write()
            .expect("context lock poisoned")
            .insert(key.into(), value)
    }

    /// Removes `key`, returning the stored value if present.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().expect("context lock poisoned").remove(key)
    }

    /// True if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().expect("context lock poisoned").contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.read().expect("context lock poisoned").len()
    }

    /// True if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a point-in-time copy of the whole map.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.read().expect("context lock poisoned").clone()
    }
}
