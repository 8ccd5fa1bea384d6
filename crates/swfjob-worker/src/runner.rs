//! Thread-based isolated task runner (§4.6, §9 "isolated task runner"
//! redesign note).
//!
//! `std::thread::spawn` runs the registered role closure; an atomic
//! cancellation flag plus a `tokio::sync::oneshot` result channel stand in
//! for the source's `multiprocessing.Process` + pipe — this target is
//! thread-safe and non-fork, so a thread is the idiomatic isolation unit.

use tokio::sync::oneshot;

use crate::context::{ActivityContext, CancellationHandle};
use crate::role::{RoleFn, RoleFailure, RoleResult};

/// A role invocation running on its own OS thread.
pub struct RunningTask {
    pub cancellation: CancellationHandle,
    pub(crate) result: oneshot::Receiver<RoleResult>,
}

impl RunningTask {
    /// Waits for the thread to finish, without heartbeating in the meantime.
    pub async fn join(mut self) -> RoleResult {
        match (&mut self.result).await {
            Ok(result) => result,
            Err(_) => Err(RoleFailure::new("worker thread panicked", "")),
        }
    }
}

pub fn spawn(role: RoleFn, ctx: ActivityContext, input: serde_json::Value) -> RunningTask {
    let cancellation = ctx.cancellation_handle();
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let result = role(&ctx, input);
        let _ = tx.send(result);
    });
    RunningTask { cancellation, result: rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn spawned_role_result_is_observed_on_join() {
        let role: RoleFn = Arc::new(|_ctx, input| Ok(input));
        let ctx = ActivityContext::new("wf-1", "0");
        let task = spawn(role, ctx, serde_json::json!({"ok": true}));
        assert_eq!(task.join().await.unwrap(), serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn a_role_sees_its_own_cancellation_flag() {
        let role: RoleFn = Arc::new(|ctx, _input| {
            if ctx.is_cancelled() {
                Err(RoleFailure::new("cancelled", ""))
            } else {
                Ok(serde_json::Value::Null)
            }
        });
        let ctx = ActivityContext::new("wf-1", "0");
        let handle = ctx.cancellation_handle();
        handle.cancel();
        let task = spawn(role, ctx, serde_json::Value::Null);
        assert!(task.join().await.is_err());
    }
}
