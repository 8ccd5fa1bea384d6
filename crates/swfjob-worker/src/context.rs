//! Per-activity-execution context (§4.6), handed to a role closure.
//!
//! Grounded in `durable::activity::context::ActivityContext` /
//! `CancellationHandle`, trimmed to what a role actually needs: which
//! workflow and activity it's running for, and a way to notice
//! cancellation. Retry bookkeeping lives entirely in the decider — a role
//! never sees its own attempt count.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ActivityContext {
    pub workflow_id: String,
    pub activity_id: String,
    cancelled: Arc<AtomicBool>,
}

impl ActivityContext {
    pub fn new(workflow_id: impl Into<String>, activity_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            activity_id: activity_id.into(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle { cancelled: Arc::clone(&self.cancelled) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Handle to request cancellation of a running activity from outside its thread.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}
