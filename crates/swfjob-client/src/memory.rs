//! In-memory [`WorkflowServiceClient`] for testing.
//!
//! Models enough of the AWS SWF wire protocol (§6) to drive `swfjob-core`
//! end-to-end: scheduling an activity enqueues it for polling, starting a
//! child workflow spawns a nested workflow record and wires its completion
//! back onto the parent's history, exactly mirroring the real service's
//! "decisions become new history events" contract. Grounded in
//! `durable::persistence::memory::InMemoryWorkflowEventStore`.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{json, Value};
use swfjob_core::prelude::Decision;
use uuid::Uuid;

use crate::{ActivityTask, ClientError, DecisionTask, HeartbeatResponse, RawHistoryEvent, StartWorkflowExecution, WorkflowServiceClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkflowStatus {
    Open,
    Completed,
    Failed,
}

impl WorkflowStatus {
    fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Open => "open",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
        }
    }
}

struct WorkflowRecord {
    decision_task_list: String,
    events: Vec<Value>,
    status: WorkflowStatus,
    /// `(parent workflow id, this workflow's StartChildWorkflowExecutionInitiated event id in the parent)`.
    parent: Option<(String, i64)>,
}

impl WorkflowRecord {
    fn push_event(&mut self, event_type: &str, attrs: Value) -> i64 {
        let event_id = self.events.len() as i64 + 1;
        let key = format!("{}{}EventAttributes", event_type[..1].to_ascii_lowercase(), &event_type[1..]);
        self.events.push(json!({
            "eventId": event_id,
            "eventTimestamp": Utc::now().to_rfc3339(),
            "eventType": event_type,
            key: attrs,
        }));
        event_id
    }
}

struct PendingActivity {
    workflow_id: String,
    activity_id: String,
    scheduled_event_id: i64,
    input: String,
}

enum TaskToken {
    Decision { workflow_id: String },
    Activity { workflow_id: String, scheduled_event_id: i64 },
}

#[derive(Default)]
struct Inner {
    workflows: HashMap<String, WorkflowRecord>,
    decision_queue: HashMap<String, VecDeque<String>>,
    activity_queue: HashMap<String, VecDeque<PendingActivity>>,
    tokens: HashMap<String, TaskToken>,
    cancel_requested: std::collections::HashSet<String>,
}

/// An in-memory stand-in for a live AWS SWF domain.
pub struct InMemoryWorkflowService {
    inner: RwLock<Inner>,
}

impl Default for InMemoryWorkflowService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorkflowService {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    /// Snapshot of a workflow's raw history, for assertions in tests.
    pub fn history(&self, workflow_id: &str) -> Option<Vec<Value>> {
        self.inner.read().workflows.get(workflow_id).map(|w| w.events.clone())
    }

    pub fn is_completed(&self, workflow_id: &str) -> Option<bool> {
        self.inner.read().workflows.get(workflow_id).map(|w| w.status == WorkflowStatus::Completed)
    }

    /// Marks an in-flight activity task's token for cancellation — the next
    /// `record_activity_task_heartbeat` call against it reports
    /// `cancel_requested: true`.
    pub fn request_activity_cancellation(&self, task_token: &str) {
        self.inner.write().cancel_requested.insert(task_token.to_string());
    }

    /// `(workflow id, status, event count)` for every workflow known to this
    /// service, for the monitor status page.
    pub fn statuses(&self) -> Vec<(String, &'static str, usize)> {
        self.inner
            .read()
            .workflows
            .iter()
            .map(|(id, w)| (id.clone(), w.status.as_str(), w.events.len()))
            .collect()
    }

    fn new_task_token() -> String {
        Uuid::now_v7().to_string()
    }
}

#[async_trait]
impl WorkflowServiceClient for InMemoryWorkflowService {
    async fn poll_for_decision_task(&self, task_list: &str) -> Result<Option<DecisionTask>, ClientError> {
        let mut inner = self.inner.write();
        let Some(workflow_id) = inner.decision_queue.get_mut(task_list).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        let events = inner
            .workflows
            .get(&workflow_id)
            .ok_or_else(|| ClientError::WorkflowNotFound(workflow_id.clone()))?
            .events
            .iter()
            .cloned()
            .map(RawHistoryEvent)
            .collect();

        let task_token = Self::new_task_token();
        inner.tokens.insert(task_token.clone(), TaskToken::Decision { workflow_id: workflow_id.clone() });
        Ok(Some(DecisionTask { task_token, workflow_id, events }))
    }

    async fn respond_decision_task_completed(&self, task_token: &str, decisions: &[Decision]) -> Result<(), ClientError> {
        let mut inner = self.inner.write();
        let Some(TaskToken::Decision { workflow_id }) = inner.tokens.remove(task_token) else {
            return Err(ClientError::UnknownTaskToken(task_token.to_string()));
        };

        for decision in decisions {
            apply_decision(&mut inner, &workflow_id, decision)?;
        }
        Ok(())
    }

    async fn poll_for_activity_task(&self, task_list: &str) -> Result<Option<ActivityTask>, ClientError> {
        let mut inner = self.inner.write();
        let Some(pending) = inner.activity_queue.get_mut(task_list).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        let task_token = Self::new_task_token();
        inner.tokens.insert(
            task_token.clone(),
            TaskToken::Activity { workflow_id: pending.workflow_id.clone(), scheduled_event_id: pending.scheduled_event_id },
        );
        Ok(Some(ActivityTask {
            task_token,
            workflow_id: pending.workflow_id,
            activity_id: pending.activity_id,
            input: pending.input,
        }))
    }

    async fn respond_activity_task_completed(&self, task_token: &str, result: &str) -> Result<(), ClientError> {
        let mut inner = self.inner.write();
        let Some(TaskToken::Activity { workflow_id, scheduled_event_id }) = inner.tokens.remove(task_token) else {
            return Err(ClientError::UnknownTaskToken(task_token.to_string()));
        };
        let workflow = inner
            .workflows
            .get_mut(&workflow_id)
            .ok_or_else(|| ClientError::WorkflowNotFound(workflow_id.clone()))?;
        workflow.push_event("ActivityTaskCompleted", json!({"result": result, "scheduledEventId": scheduled_event_id}));
        enqueue_decision(&mut inner, &workflow_id);
        Ok(())
    }

    async fn respond_activity_task_failed(&self, task_token: &str, reason: &str, details: &str) -> Result<(), ClientError> {
        let mut inner = self.inner.write();
        let Some(TaskToken::Activity { workflow_id, scheduled_event_id }) = inner.tokens.remove(task_token) else {
            return Err(ClientError::UnknownTaskToken(task_token.to_string()));
        };
        let workflow = inner
            .workflows
            .get_mut(&workflow_id)
            .ok_or_else(|| ClientError::WorkflowNotFound(workflow_id.clone()))?;
        workflow.push_event(
            "ActivityTaskFailed",
            json!({"reason": reason, "details": details, "scheduledEventId": scheduled_event_id}),
        );
        enqueue_decision(&mut inner, &workflow_id);
        Ok(())
    }

    async fn respond_activity_task_cancelled(&self, task_token: &str, details: &str) -> Result<(), ClientError> {
        let mut inner = self.inner.write();
        let Some(TaskToken::Activity { workflow_id, scheduled_event_id }) = inner.tokens.remove(task_token) else {
            return Err(ClientError::UnknownTaskToken(task_token.to_string()));
        };
        inner.cancel_requested.remove(task_token);
        let workflow = inner
            .workflows
            .get_mut(&workflow_id)
            .ok_or_else(|| ClientError::WorkflowNotFound(workflow_id.clone()))?;
        workflow.push_event("ActivityTaskCanceled", json!({"details": details, "scheduledEventId": scheduled_event_id}));
        enqueue_decision(&mut inner, &workflow_id);
        Ok(())
    }

    async fn record_activity_task_heartbeat(&self, task_token: &str, _details: Option<&str>) -> Result<HeartbeatResponse, ClientError> {
        let inner = self.inner.read();
        if !inner.tokens.contains_key(task_token) {
            return Err(ClientError::UnknownTaskToken(task_token.to_string()));
        }
        Ok(HeartbeatResponse { cancel_requested: inner.cancel_requested.contains(task_token) })
    }

    async fn start_workflow_execution(&self, params: StartWorkflowExecution) -> Result<(), ClientError> {
        let mut inner = self.inner.write();
        if inner.workflows.contains_key(&params.workflow_id) {
            return Err(ClientError::WorkflowAlreadyExists(params.workflow_id));
        }
        let mut workflow = WorkflowRecord {
            decision_task_list: params.task_list.clone(),
            events: Vec::new(),
            status: WorkflowStatus::Open,
            parent: None,
        };
        workflow.push_event(
            "WorkflowExecutionStarted",
            json!({"input": params.input, "tagList": params.tag_list, "taskPriority": params.task_priority}),
        );
        inner.workflows.insert(params.workflow_id.clone(), workflow);
        enqueue_decision(&mut inner, &params.workflow_id);
        Ok(())
    }
}

fn enqueue_decision(inner: &mut Inner, workflow_id: &str) {
    let task_list = inner.workflows[workflow_id].decision_task_list.clone();
    inner.decision_queue.entry(task_list).or_default().push_back(workflow_id.to_string());
}

fn apply_decision(inner: &mut Inner, workflow_id: &str, decision: &Decision) -> Result<(), ClientError> {
    match decision {
        Decision::ScheduleActivityTask { activity_id, activity_type, task_list, task_priority, input, .. } => {
            let scheduled_event_id = {
                let workflow = inner
                    .workflows
                    .get_mut(workflow_id)
                    .ok_or_else(|| ClientError::WorkflowNotFound(workflow_id.to_string()))?;
                workflow.push_event(
                    "ActivityTaskScheduled",
                    json!({
                        "activityId": activity_id,
                        "activityType": {"name": activity_type.name, "version": activity_type.version},
                        "taskList": {"name": task_list.name},
                        "taskPriority": task_priority,
                        "input": input,
                    }),
                )
            };
            inner.activity_queue.entry(task_list.name.clone()).or_default().push_back(PendingActivity {
                workflow_id: workflow_id.to_string(),
                activity_id: activity_id.clone(),
                scheduled_event_id,
                input: input.clone(),
            });
            Ok(())
        }
        Decision::StartChildWorkflowExecution {
            workflow_id: child_id,
            workflow_type,
            task_list,
            task_priority,
            tag_list,
            child_policy,
            input,
            ..
        } => {
            let initiated_event_id = {
                let workflow = inner
                    .workflows
                    .get_mut(workflow_id)
                    .ok_or_else(|| ClientError::WorkflowNotFound(workflow_id.to_string()))?;
                workflow.push_event(
                    "StartChildWorkflowExecutionInitiated",
                    json!({
                        "workflowId": child_id,
                        "workflowType": {"name": workflow_type.name, "version": workflow_type.version},
                        "taskList": {"name": task_list.name},
                        "taskPriority": task_priority,
                        "tagList": tag_list,
                        "childPolicy": child_policy,
                        "input": input,
                    }),
                )
            };

            let mut child = WorkflowRecord {
                decision_task_list: task_list.name.clone(),
                events: Vec::new(),
                status: WorkflowStatus::Open,
                parent: Some((workflow_id.to_string(), initiated_event_id)),
            };
            child.push_event(
                "WorkflowExecutionStarted",
                json!({"input": input, "tagList": tag_list, "taskPriority": task_priority}),
            );
            inner.workflows.insert(child_id.clone(), child);
            enqueue_decision(inner, child_id);
            Ok(())
        }
        Decision::CompleteWorkflowExecution { result } => {
            finish_workflow(inner, workflow_id, WorkflowStatus::Completed, |initiated_event_id| {
                json!({"result": result, "workflowExecution": {"workflowId": workflow_id}, "initiatedEventId": initiated_event_id})
            })
        }
        Decision::FailWorkflowExecution { reason, details } => {
            finish_workflow(inner, workflow_id, WorkflowStatus::Failed, |initiated_event_id| {
                json!({"reason": reason, "details": details, "workflowExecution": {"workflowId": workflow_id}, "initiatedEventId": initiated_event_id})
            })
        }
    }
}

fn finish_workflow(
    inner: &mut Inner,
    workflow_id: &str,
    status: WorkflowStatus,
    attrs_for_parent: impl FnOnce(i64) -> Value,
) -> Result<(), ClientError> {
    let parent = {
        let workflow = inner
            .workflows
            .get_mut(workflow_id)
            .ok_or_else(|| ClientError::WorkflowNotFound(workflow_id.to_string()))?;
        workflow.status = status;
        workflow.parent.clone()
    };

    let Some((parent_id, initiated_event_id)) = parent else {
        return Ok(());
    };
    let event_type = match status {
        WorkflowStatus::Completed => "ChildWorkflowExecutionCompleted",
        WorkflowStatus::Failed => "ChildWorkflowExecutionFailed",
        WorkflowStatus::Open => unreachable!("finish_workflow always sets a terminal status"),
    };
    let parent_record = inner
        .workflows
        .get_mut(&parent_id)
        .ok_or_else(|| ClientError::WorkflowNotFound(parent_id.clone()))?;
    parent_record.push_event(event_type, attrs_for_parent(initiated_event_id));
    enqueue_decision(inner, &parent_id);
    Ok(())
}

impl Clone for WorkflowRecord {
    fn clone(&self) -> Self {
        Self {
            decision_task_list: self.decision_task_list.clone(),
            events: self.events.clone(),
            status: self.status,
            parent: self.parent.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swfjob_core::prelude::{ActivityType, TaskList, WorkflowType};

    fn start_params(id: &str, input: &str) -> StartWorkflowExecution {
        StartWorkflowExecution {
            workflow_id: id.to_string(),
            domain: "mass".to_string(),
            task_list: "decision-tasks".to_string(),
            task_priority: "1".to_string(),
            tag_list: vec![],
            input: input.to_string(),
        }
    }

    #[tokio::test]
    async fn statuses_reports_open_until_completed() {
        let svc = InMemoryWorkflowService::new();
        svc.start_workflow_execution(start_params("wf-status", "{}")).await.unwrap();
        assert_eq!(svc.statuses(), vec![("wf-status".to_string(), "open", 1)]);

        let task = svc.poll_for_decision_task("decision-tasks").await.unwrap().unwrap();
        svc.respond_decision_task_completed(&task.task_token, &[Decision::CompleteWorkflowExecution { result: None }])
            .await
            .unwrap();
        assert_eq!(svc.statuses(), vec![("wf-status".to_string(), "completed", 1)]);
    }

    #[tokio::test]
    async fn start_then_poll_decision_task_returns_started_event() {
        let svc = InMemoryWorkflowService::new();
        svc.start_workflow_execution(start_params("wf-1", "{}")).await.unwrap();
        let task = svc.poll_for_decision_task("decision-tasks").await.unwrap().unwrap();
        assert_eq!(task.workflow_id, "wf-1");
        assert_eq!(task.events.len(), 1);
    }

    #[tokio::test]
    async fn schedule_activity_then_complete_closes_the_loop() {
        let svc = InMemoryWorkflowService::new();
        svc.start_workflow_execution(start_params("wf-2", "{}")).await.unwrap();
        let task = svc.poll_for_decision_task("decision-tasks").await.unwrap().unwrap();

        let schedule = Decision::ScheduleActivityTask {
            activity_id: "0".to_string(),
            activity_type: ActivityType { name: "Action".to_string(), version: "1.0".to_string() },
            task_list: TaskList { name: "activity-tasks".to_string() },
            task_priority: "1".to_string(),
            input: "{}".to_string(),
            heartbeat_timeout: "3600".to_string(),
            schedule_to_close_timeout: "604800".to_string(),
            schedule_to_start_timeout: "604800".to_string(),
            start_to_close_timeout: "604800".to_string(),
        };
        svc.respond_decision_task_completed(&task.task_token, &[schedule]).await.unwrap();

        let activity = svc.poll_for_activity_task("activity-tasks").await.unwrap().unwrap();
        assert_eq!(activity.activity_id, "0");
        svc.respond_activity_task_completed(&activity.task_token, "\"done\"").await.unwrap();

        let task = svc.poll_for_decision_task("decision-tasks").await.unwrap().unwrap();
        assert_eq!(task.events.len(), 3); // Started, Scheduled, Completed
        assert_eq!(task.events[2].0["eventType"], "ActivityTaskCompleted");
    }

    #[tokio::test]
    async fn heartbeat_reports_cancel_requested_after_request_activity_cancellation() {
        let svc = InMemoryWorkflowService::new();
        svc.start_workflow_execution(start_params("wf-cancel", "{}")).await.unwrap();
        let task = svc.poll_for_decision_task("decision-tasks").await.unwrap().unwrap();

        let schedule = Decision::ScheduleActivityTask {
            activity_id: "0".to_string(),
            activity_type: ActivityType { name: "Action".to_string(), version: "1.0".to_string() },
            task_list: TaskList { name: "activity-tasks".to_string() },
            task_priority: "1".to_string(),
            input: "{}".to_string(),
            heartbeat_timeout: "3600".to_string(),
            schedule_to_close_timeout: "604800".to_string(),
            schedule_to_start_timeout: "604800".to_string(),
            start_to_close_timeout: "604800".to_string(),
        };
        svc.respond_decision_task_completed(&task.task_token, &[schedule]).await.unwrap();
        let activity = svc.poll_for_activity_task("activity-tasks").await.unwrap().unwrap();

        let before = svc.record_activity_task_heartbeat(&activity.task_token, None).await.unwrap();
        assert!(!before.cancel_requested);

        svc.request_activity_cancellation(&activity.task_token);
        let after = svc.record_activity_task_heartbeat(&activity.task_token, None).await.unwrap();
        assert!(after.cancel_requested);

        svc.respond_activity_task_cancelled(&activity.task_token, "stopped on request").await.unwrap();
        let task = svc.poll_for_decision_task("decision-tasks").await.unwrap().unwrap();
        assert_eq!(task.events.len(), 3); // Started, Scheduled, Canceled
        assert_eq!(task.events[2].0["eventType"], "ActivityTaskCanceled");
    }

    #[tokio::test]
    async fn child_workflow_completion_is_reported_to_the_parent() {
        let svc = InMemoryWorkflowService::new();
        svc.start_workflow_execution(start_params("wf-3", "{}")).await.unwrap();
        let task = svc.poll_for_decision_task("decision-tasks").await.unwrap().unwrap();

        let start_child = Decision::StartChildWorkflowExecution {
            workflow_id: "wf-3-child-0".to_string(),
            workflow_type: WorkflowType { name: "Task".to_string(), version: "1.0".to_string() },
            task_list: TaskList { name: "decision-tasks".to_string() },
            task_priority: "2".to_string(),
            tag_list: vec!["J".to_string(), "T0".to_string()],
            child_policy: "TERMINATE".to_string(),
            execution_start_to_close_timeout: "604800".to_string(),
            task_start_to_close_timeout: "60".to_string(),
            input: "{}".to_string(),
        };
        svc.respond_decision_task_completed(&task.task_token, &[start_child]).await.unwrap();

        let child_task = svc.poll_for_decision_task("decision-tasks").await.unwrap().unwrap();
        assert_eq!(child_task.workflow_id, "wf-3-child-0");
        svc.respond_decision_task_completed(&child_task.task_token, &[Decision::CompleteWorkflowExecution { result: None }])
            .await
            .unwrap();

        assert_eq!(svc.is_completed("wf-3-child-0"), Some(true));
        let parent_task = svc.poll_for_decision_task("decision-tasks").await.unwrap().unwrap();
        assert_eq!(parent_task.events.len(), 3); // Started, Initiated, ChildWorkflowExecutionCompleted
        assert_eq!(parent_task.events[2].0["eventType"], "ChildWorkflowExecutionCompleted");
    }
}
