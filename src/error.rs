//! Error types used by the scheduling engine and task bodies.
//!
//! This module defines two main error enums:
//!
//! - [`SchedulerError`] — errors surfaced through a unit's own completion handle.
//! - [`TaskError`] — errors raised by individual task bodies (or forced aborts).
//!
//! Both types are cheap to clone: a settled completion cell hands the same
//! outcome to every awaiter, so the payload must be `Clone`.
//!
//! Misuse after shutdown (adding to a completed unit, adding a child to an
//! executed node) is **not** represented here; those paths are non-fatal,
//! logged at `warn`, and return `None` from `add`.

use thiserror::Error;

/// # Errors surfaced through a unit's completion handle.
///
/// These reflect the aggregate outcome of a `Task` or `Queue` rather than any
/// single item: a batch-fatal failure under `exit_on_error`, or a forced abort.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The unit was shut down via `force_shutdown`.
    #[error("unit aborted: {reason}")]
    Aborted {
        /// Reason supplied by the caller of `force_shutdown`.
        reason: String,
    },

    /// An item failed while `exit_on_error` was in effect; the unit is failed.
    #[error("item '{title}' failed: {error}")]
    ItemFailed {
        /// Title of the failing item.
        title: String,
        /// The underlying body error message.
        error: String,
    },

    /// The unit's own body failed.
    #[error("unit body failed: {error}")]
    BodyFailed {
        /// The underlying body error message.
        error: String,
    },
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::Aborted { .. } => "unit_aborted",
            SchedulerError::ItemFailed { .. } => "unit_item_failed",
            SchedulerError::BodyFailed { .. } => "unit_body_failed",
        }
    }
}

/// # Errors produced by task bodies and per-item settlement.
///
/// A body returns `Err(TaskError::Fail { .. })` (or any variant) to mark the
/// attempt failed; the renderer applies the retry/rollback directives and the
/// final outcome lands in the item's completion handle.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Body execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The item never started: `force_shutdown` was called, or an earlier
    /// failure aborted the batch under `exit_on_error`.
    #[error("aborted before start: {reason}")]
    Aborted {
        /// Why the item was rejected without running.
        reason: String,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`] from any displayable error.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Aborted { .. } => "task_aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let err = TaskError::fail("boom");
        assert_eq!(err.as_label(), "task_failed");
        let err = SchedulerError::Aborted { reason: "x".into() };
        assert_eq!(err.as_label(), "unit_aborted");
    }

    #[test]
    fn test_fail_captures_message() {
        let err = TaskError::fail("disk full");
        assert_eq!(err.to_string(), "execution failed: disk full");
    }
}
