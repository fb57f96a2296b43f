//! FILENAME: core/pivot-engine/src/guard.rs
//! PURPOSE: Cancellation and deadline observation for pivot execution.
//! CONTEXT: The planner is a pure in-memory computation, but requests can
//! be cancelled (client disconnect) and must respect a soft/hard deadline
//! pair. The guard is checked between passes and at placeholder-evaluation
//! boundaries; it never suspends.

use crate::definition::PivotError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Soft deadline: exceeding it appends a warning to the result.
pub const SOFT_DEADLINE: Duration = Duration::from_secs(30);
/// Hard deadline: exceeding it aborts the query with `Timeout`.
pub const HARD_DEADLINE: Duration = Duration::from_secs(60);

/// Handle the request layer keeps to signal cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        CancelHandle::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Per-query execution guard.
#[derive(Debug, Clone)]
pub struct ExecutionGuard {
    started: Instant,
    cancel: CancelHandle,
    soft_limit: Duration,
    hard_limit: Duration,
}

impl Default for ExecutionGuard {
    fn default() -> Self {
        ExecutionGuard::new(CancelHandle::new())
    }
}

impl ExecutionGuard {
    pub fn new(cancel: CancelHandle) -> Self {
        ExecutionGuard {
            started: Instant::now(),
            cancel,
            soft_limit: SOFT_DEADLINE,
            hard_limit: HARD_DEADLINE,
        }
    }

    /// Test hook: a guard with custom limits.
    pub fn with_limits(cancel: CancelHandle, soft_limit: Duration, hard_limit: Duration) -> Self {
        ExecutionGuard {
            started: Instant::now(),
            cancel,
            soft_limit,
            hard_limit,
        }
    }

    /// Observation point between passes. Cancellation wins over timeout so
    /// a disconnected client never receives a timeout body.
    pub fn checkpoint(&self) -> Result<(), PivotError> {
        if self.cancel.is_cancelled() {
            return Err(PivotError::Cancelled);
        }
        if self.started.elapsed() >= self.hard_limit {
            return Err(PivotError::Timeout);
        }
        Ok(())
    }

    pub fn soft_exceeded(&self) -> bool {
        self.started.elapsed() >= self.soft_limit
    }
}
