//! Supervisor: spawns one decider loop task plus `farm[role]` worker loop
//! tasks, shutting down on SIGTERM/SIGHUP/SIGINT (§4.9,
//! `original_source/mass/scheduler/swf/__init__.py::SWFWorker.start`).
//!
//! Tokio tasks stand in for the source's OS processes — the idiomatic
//! concurrency unit here is the task, not the process, matching
//! `durable::worker::pool::WorkerPool`'s task-per-slot model. Each loop
//! polls, does at most one unit of work, and sleeps 5s when there's nothing
//! to do.

use std::sync::Arc;
use std::time::Duration;

use swfjob_client::WorkflowServiceClient;
use swfjob_core::prelude::{Decider, DeciderOutcome, Decision, HistoryEvent, HistoryParser, SchedulerConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::context::ActivityContext;
use crate::farm::Farm;
use crate::role::{RoleFailure, RoleRegistry};

const IDLE_SLEEP: Duration = Duration::from_secs(5);

pub struct Supervisor<C: WorkflowServiceClient> {
    client: Arc<C>,
    config: SchedulerConfig,
    registry: Arc<RoleRegistry>,
    farm: Farm,
}

impl<C: WorkflowServiceClient> Supervisor<C> {
    pub fn new(client: Arc<C>, config: SchedulerConfig, registry: RoleRegistry, farm: Farm) -> Self {
        Self { client, config, registry: Arc::new(registry), farm }
    }

    /// Spawns the decider loop and every farm worker loop, returning their
    /// join handles. Each loop exits once `shutdown` carries `true`.
    pub fn start(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = vec![tokio::spawn(decider_loop(Arc::clone(&self.client), self.config.clone(), shutdown.clone()))];

        for (role, count) in self.farm.roles() {
            for _ in 0..count {
                handles.push(tokio::spawn(worker_loop(
                    Arc::clone(&self.client),
                    self.config.clone(),
                    Arc::clone(&self.registry),
                    role.to_string(),
                    shutdown.clone(),
                )));
            }
        }

        handles
    }

    /// Runs until a SIGTERM/SIGHUP/SIGINT is received, then waits for every
    /// loop to notice and exit.
    pub async fn run_until_shutdown(&self) {
        let (tx, rx) = watch::channel(false);
        let handles = self.start(rx);

        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received, draining worker loops");
        let _ = tx.send(true);

        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(IDLE_SLEEP) => false,
        _ = shutdown.changed() => true,
    }
}

async fn decider_loop<C: WorkflowServiceClient>(client: Arc<C>, cfg: SchedulerConfig, mut shutdown: watch::Receiver<bool>) {
    let parser = HistoryParser::new(cfg.activity_max_retry, cfg.workflow_max_retry);
    while !*shutdown.borrow() {
        match client.poll_for_decision_task(&cfg.decision_task_list).await {
            Ok(Some(task)) => {
                let decisions = decide(&parser, &cfg, &task.events);
                if let Err(err) = client.respond_decision_task_completed(&task.task_token, &decisions).await {
                    tracing::error!(%err, workflow_id = %task.workflow_id, "failed to respond to decision task");
                }
            }
            Ok(None) => {
                if sleep_or_shutdown(&mut shutdown).await {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(%err, "decision task poll failed");
                if sleep_or_shutdown(&mut shutdown).await {
                    return;
                }
            }
        }
    }
}

fn decide(parser: &HistoryParser, cfg: &SchedulerConfig, raw_events: &[swfjob_client::RawHistoryEvent]) -> Vec<Decision> {
    let events: Vec<HistoryEvent> = raw_events.iter().filter_map(|e| HistoryEvent::parse(&e.0).ok()).collect();
    let mut ctx = match parser.parse(&events) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(%err, "failed to parse workflow history");
            return Vec::new();
        }
    };

    match Decider::decide(&mut ctx, cfg) {
        DeciderOutcome::Suspend(batch) => batch.as_slice().to_vec(),
        DeciderOutcome::Complete(result) => vec![Decision::CompleteWorkflowExecution { result: result.map(|v| v.to_string()) }],
        DeciderOutcome::Fail { reason, details } => vec![Decision::FailWorkflowExecution { reason, details }],
    }
}

async fn worker_loop<C: WorkflowServiceClient>(
    client: Arc<C>,
    cfg: SchedulerConfig,
    registry: Arc<RoleRegistry>,
    role: String,
    mut shutdown: watch::Receiver<bool>,
) {
    while !*shutdown.borrow() {
        match client.poll_for_activity_task(&role).await {
            Ok(Some(task)) => run_activity(&client, &cfg, &registry, &role, task).await,
            Ok(None) => {
                if sleep_or_shutdown(&mut shutdown).await {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(%err, role = %role, "activity task poll failed");
                if sleep_or_shutdown(&mut shutdown).await {
                    return;
                }
            }
        }
    }
}

async fn run_activity<C: WorkflowServiceClient>(
    client: &Arc<C>,
    cfg: &SchedulerConfig,
    registry: &RoleRegistry,
    role: &str,
    task: swfjob_client::ActivityTask,
) {
    let Some(role_fn) = registry.get(role) else {
        tracing::warn!(role, "no handler registered for role");
        let _ = client.respond_activity_task_failed(&task.task_token, "no handler", &format!("no role registered for `{role}`")).await;
        return;
    };

    let input: serde_json::Value = serde_json::from_str(&task.input).unwrap_or(serde_json::Value::Null);
    let ctx = ActivityContext::new(task.workflow_id.clone(), task.activity_id.clone());
    let mut running = crate::runner::spawn(role_fn, ctx, input);

    let heartbeat_every = Duration::from_secs(cfg.activity_heartbeat_interval_secs.max(1));
    let mut ticker = tokio::time::interval(heartbeat_every);
    ticker.tick().await; // first tick fires immediately; skip it

    let mut cancelled = false;
    let outcome = loop {
        tokio::select! {
            result = &mut running.result => {
                break result.unwrap_or_else(|_| Err(RoleFailure::new("worker thread panicked", "")));
            }
            _ = ticker.tick() => {
                match client.record_activity_task_heartbeat(&task.task_token, None).await {
                    Ok(resp) if resp.cancel_requested => {
                        cancelled = true;
                        running.cancellation.cancel();
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(%err, "heartbeat failed"),
                }
            }
        }
    };

    if cancelled {
        let details = match &outcome {
            Ok(value) => value.to_string(),
            Err(failure) => cfg.truncate_details(&failure.details),
        };
        let _ = client.respond_activity_task_cancelled(&task.task_token, &details).await;
        return;
    }

    match outcome {
        Ok(value) => {
            let _ = client.respond_activity_task_completed(&task.task_token, &value.to_string()).await;
        }
        Err(failure) => {
            let _ = client
                .respond_activity_task_failed(&task.task_token, &cfg.truncate_reason(&failure.reason), &cfg.truncate_details(&failure.details))
                .await;
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to register SIGHUP handler");
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sighup.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
