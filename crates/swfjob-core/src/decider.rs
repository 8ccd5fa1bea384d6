//! Decider (spec §4.4 / component D).
//!
//! One call walks the current node's children in source order, emits at
//! most one new scheduling decision per tick in the serial case (parallel
//! parents emit for every child up front, then wait on each in turn),
//! handles retries, and on an exhausted failure falls back to the
//! error-handler pass before failing the workflow. Grounded in
//! `original_source/mass/scheduler/swf/__init__.py::SWFDecider`.

use serde_json::Value;

use crate::config::SchedulerConfig;
use crate::decision::{ActivityType, Decision, DecisionBatch, TaskList, WorkflowType};
use crate::error::{Signal, TaskError};
use crate::history::ReplayContext;
use crate::node::Node;
use crate::priority::child_priority;
use crate::step::{StepKind, StepStatus};

const ACTIVITY_TYPE_NAME: &str = "Action";
const ACTIVITY_TYPE_VERSION: &str = "1.0";
const WORKFLOW_TYPE_NAME: &str = "Task";
const WORKFLOW_TYPE_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq)]
pub enum DeciderOutcome {
    Suspend(DecisionBatch),
    Complete(Option<Value>),
    Fail { reason: String, details: String },
}

pub struct Decider;

impl Decider {
    /// Runs exactly one decision tick against an already-parsed replay
    /// context, returning exactly one of `Suspend`/`Complete`/`Fail`.
    #[tracing::instrument(skip(ctx, cfg))]
    pub fn decide(ctx: &mut ReplayContext, cfg: &SchedulerConfig) -> DeciderOutcome {
        let root = ctx.root.clone();
        let tags = ctx.tag_list.clone();
        let priority = ctx.priority;
        let mut batch = DecisionBatch::new();

        match walk(ctx, &root, &tags, priority, cfg, &mut batch, Pass::Normal) {
            Ok(value) => {
                debug_assert!(batch.is_empty(), "a completed walk never leaves decisions queued");
                tracing::info!("workflow complete");
                DeciderOutcome::Complete(value)
            }
            Err(Signal::Waiting) => {
                tracing::debug!(decisions = batch.as_slice().len(), "suspending");
                DeciderOutcome::Suspend(batch)
            }
            Err(Signal::Failed(err)) => {
                tracing::warn!(reason = %err.reason, "primary walk failed, running error handlers");
                match walk(ctx, &root, &tags, priority, cfg, &mut batch, Pass::ErrorHandlers) {
                    Err(Signal::Waiting) => DeciderOutcome::Suspend(batch),
                    Err(Signal::Failed(handler_err)) => DeciderOutcome::Fail {
                        reason: cfg.truncate_reason(&handler_err.reason),
                        details: cfg.truncate_details(&handler_err.details),
                    },
                    Ok(_) => DeciderOutcome::Fail {
                        reason: cfg.truncate_reason(&err.reason),
                        details: cfg.truncate_details(&err.details),
                    },
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pass {
    Normal,
    ErrorHandlers,
}

fn is_error_handler(node: &Node) -> bool {
    node.as_action().map(|a| a.when_error).unwrap_or(false)
}

/// The bits of tick state that stay fixed across one `walk` call, bundled
/// so `maybe_emit` doesn't need a handful of loose parameters.
struct Tick<'a> {
    tags: &'a [String],
    priority: i32,
    cfg: &'a SchedulerConfig,
}

fn walk(
    ctx: &mut ReplayContext,
    node: &Node,
    tags: &[String],
    priority: i32,
    cfg: &SchedulerConfig,
    batch: &mut DecisionBatch,
    pass: Pass,
) -> Result<Option<Value>, Signal> {
    let children: Vec<(usize, &Node)> = node
        .children()
        .iter()
        .enumerate()
        .filter(|(_, c)| match pass {
            Pass::Normal => !is_error_handler(c),
            Pass::ErrorHandlers => is_error_handler(c),
        })
        .collect();

    let parallel = pass == Pass::Normal && node.parallel();
    let tick = Tick { tags, priority, cfg };

    if parallel {
        for (i, child) in &children {
            maybe_emit(ctx, node, *i, child, &tick, batch);
        }
        let mut last = None;
        for _ in &children {
            last = wait(ctx, cfg, batch)?;
        }
        Ok(last)
    } else {
        let mut last = None;
        for (i, child) in &children {
            maybe_emit(ctx, node, *i, child, &tick, batch);
            last = wait(ctx, cfg, batch)?;
        }
        Ok(last)
    }
}

/// Emits a scheduling decision for `child` unless a step for it (or an
/// earlier sibling still pending) already exists in the replay — detected,
/// per §4.4, by the presence of any unchecked step at all.
fn maybe_emit(ctx: &mut ReplayContext, parent: &Node, index: usize, child: &Node, tick: &Tick, batch: &mut DecisionBatch) {
    if ctx.is_scheduled() {
        return;
    }

    let Tick { tags, priority: parent_priority, cfg } = *tick;
    let priority = child_priority(parent, parent_priority, index);

    match child {
        Node::Task(branch) => {
            let mut child_tags = tags.to_vec();
            child_tags.push(branch.title.clone());
            let workflow_id = ctx.next_workflow_id(&tags.join("."));
            let input = envelope(child);
            let decision = Decision::StartChildWorkflowExecution {
                workflow_id,
                workflow_type: WorkflowType {
                    name: WORKFLOW_TYPE_NAME.to_string(),
                    version: WORKFLOW_TYPE_VERSION.to_string(),
                },
                task_list: TaskList { name: cfg.decision_task_list.clone() },
                task_priority: priority.to_string(),
                tag_list: child_tags,
                child_policy: child_policy_name(cfg),
                execution_start_to_close_timeout: cfg.workflow_execution_timeout_secs.to_string(),
                task_start_to_close_timeout: cfg.decision_task_timeout_secs.to_string(),
                input,
            };
            let _ = batch.push(decision);
        }
        Node::Action(action) => {
            let activity_id = ctx.next_activity_id();
            let task_list = action.role.clone().unwrap_or_else(|| cfg.activity_task_list.clone());
            let input = envelope(child);
            let decision = Decision::ScheduleActivityTask {
                activity_id,
                activity_type: ActivityType {
                    name: ACTIVITY_TYPE_NAME.to_string(),
                    version: ACTIVITY_TYPE_VERSION.to_string(),
                },
                task_list: TaskList { name: task_list },
                task_priority: priority.to_string(),
                input,
                heartbeat_timeout: cfg.activity_heartbeat_timeout_secs.to_string(),
                schedule_to_close_timeout: cfg.activity_task_timeout_secs.to_string(),
                schedule_to_start_timeout: cfg.activity_task_timeout_secs.to_string(),
                start_to_close_timeout: cfg.activity_task_timeout_secs.to_string(),
            };
            let _ = batch.push(decision);
        }
        Node::Job(_) => unreachable!("a Job may only appear at tree root"),
    }
}

fn envelope(node: &Node) -> String {
    serde_json::to_string(&serde_json::json!({"protocol": Value::Null, "body": node})).unwrap_or_else(|_| "{}".to_string())
}

fn child_policy_name(cfg: &SchedulerConfig) -> String {
    match cfg.workflow_child_policy {
        crate::config::ChildPolicy::Terminate => "TERMINATE".to_string(),
        crate::config::ChildPolicy::RequestCancel => "REQUEST_CANCEL".to_string(),
        crate::config::ChildPolicy::Abandon => "ABANDON".to_string(),
    }
}

fn wait(ctx: &mut ReplayContext, cfg: &SchedulerConfig, batch: &mut DecisionBatch) -> Result<Option<Value>, Signal> {
    if !batch.is_empty() {
        return Err(Signal::Waiting);
    }

    let Some(step) = ctx.next_unchecked() else {
        return Ok(None);
    };
    step.checked = true;
    let status = step.status();

    match status {
        StepStatus::Scheduled | StepStatus::Started => Err(Signal::Waiting),
        StepStatus::Failed | StepStatus::TimedOut => {
            let should_retry = step.should_retry();
            let kind = step.kind;
            let retry_name = step.retry_name().ok();
            let input = step.input().unwrap_or("{}").to_string();
            let task_list = step.task_list().unwrap_or_default().to_string();
            let priority = step.priority().unwrap_or(1);
            let tag_list = step.tag_list();
            let (reason, details) = step.error().map(|(r, d)| (r.to_string(), d.to_string())).unwrap_or_default();

            if should_retry {
                if let Some(retry_name) = retry_name {
                    let decision = match kind {
                        StepKind::ActivityTask => Decision::ScheduleActivityTask {
                            activity_id: retry_name,
                            activity_type: ActivityType {
                                name: ACTIVITY_TYPE_NAME.to_string(),
                                version: ACTIVITY_TYPE_VERSION.to_string(),
                            },
                            task_list: TaskList { name: task_list },
                            task_priority: priority.to_string(),
                            input,
                            heartbeat_timeout: cfg.activity_heartbeat_timeout_secs.to_string(),
                            schedule_to_close_timeout: cfg.activity_task_timeout_secs.to_string(),
                            schedule_to_start_timeout: cfg.activity_task_timeout_secs.to_string(),
                            start_to_close_timeout: cfg.activity_task_timeout_secs.to_string(),
                        },
                        StepKind::ChildWorkflowExecution => Decision::StartChildWorkflowExecution {
                            workflow_id: retry_name,
                            workflow_type: WorkflowType {
                                name: WORKFLOW_TYPE_NAME.to_string(),
                                version: WORKFLOW_TYPE_VERSION.to_string(),
                            },
                            task_list: TaskList { name: cfg.decision_task_list.clone() },
                            task_priority: priority.to_string(),
                            tag_list,
                            child_policy: child_policy_name(cfg),
                            execution_start_to_close_timeout: cfg.workflow_execution_timeout_secs.to_string(),
                            task_start_to_close_timeout: cfg.decision_task_timeout_secs.to_string(),
                            input,
                        },
                    };
                    let _ = batch.push(decision);
                }
                Err(Signal::Waiting)
            } else {
                Err(Signal::Failed(TaskError::new(
                    cfg.truncate_reason(&reason),
                    cfg.truncate_details(&details),
                )))
            }
        }
        StepStatus::ScheduleFailed | StepStatus::InitiateFailed => Err(Signal::Failed(TaskError::new(
            "schedule failed",
            "the workflow service rejected the scheduling attempt",
        ))),
        StepStatus::Cancelled => Err(Signal::Failed(TaskError::new("cancelled", ""))),
        StepStatus::Completed => {
            let result = step
                .result()
                .map(|r| serde_json::from_str::<Value>(r).unwrap_or(Value::Null));
            Ok(result)
        }
    }
}
