//! Workflow-service client trait (spec §6 / §4.8) and an in-memory test
//! double.
//!
//! `swfjob-core` is pure data-in/decisions-out and holds no I/O. Whatever
//! drives it — a worker farm, a CLI, a test — talks to the workflow service
//! through [`WorkflowServiceClient`], grounded in
//! `durable::persistence::store::WorkflowEventStore`'s trait-boundary style.
//! No real AWS SWF wire client is implemented; this crate is the contract a
//! real implementation would satisfy, plus [`memory::InMemoryWorkflowService`]
//! so the rest of the stack can be exercised without AWS.

pub mod memory;

use async_trait::async_trait;
use swfjob_core::prelude::Decision;

/// Error type for workflow-service operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("unknown task token: {0}")]
    UnknownTaskToken(String),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("workflow already exists: {0}")]
    WorkflowAlreadyExists(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// One history event as delivered by a decision-task poll (§6).
#[derive(Debug, Clone)]
pub struct RawHistoryEvent(pub serde_json::Value);

/// `{taskToken, events[]}` (§6, poll decision task).
#[derive(Debug, Clone)]
pub struct DecisionTask {
    pub task_token: String,
    pub workflow_id: String,
    pub events: Vec<RawHistoryEvent>,
}

/// `{taskToken, input}` (§6, poll activity task).
#[derive(Debug, Clone)]
pub struct ActivityTask {
    pub task_token: String,
    pub workflow_id: String,
    pub activity_id: String,
    pub input: String,
}

/// `{cancelRequested}` (§6, record activity heartbeat).
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatResponse {
    pub cancel_requested: bool,
}

/// Parameters to start a new workflow execution (§4.7 submission).
#[derive(Debug, Clone)]
pub struct StartWorkflowExecution {
    pub workflow_id: String,
    pub domain: String,
    pub task_list: String,
    pub task_priority: String,
    pub tag_list: Vec<String>,
    pub input: String,
}

/// The seven RPCs of §6, as a trait boundary a real AWS SWF client, or any
/// other workflow service, would implement.
#[async_trait]
pub trait WorkflowServiceClient: Send + Sync + 'static {
    /// Long-polls for the next decision task on `task_list`.
    async fn poll_for_decision_task(&self, task_list: &str) -> Result<Option<DecisionTask>, ClientError>;

    /// Responds to a decision task with a batch of decisions.
    async fn respond_decision_task_completed(&self, task_token: &str, decisions: &[Decision]) -> Result<(), ClientError>;

    /// Long-polls for the next activity task on `task_list`.
    async fn poll_for_activity_task(&self, task_list: &str) -> Result<Option<ActivityTask>, ClientError>;

    /// Reports an activity task as completed with `result`.
    async fn respond_activity_task_completed(&self, task_token: &str, result: &str) -> Result<(), ClientError>;

    /// Reports an activity task as failed with `reason`/`details`.
    async fn respond_activity_task_failed(&self, task_token: &str, reason: &str, details: &str) -> Result<(), ClientError>;

    /// Reports an activity task as cancelled: a `cancelRequested` heartbeat
    /// response terminates the in-flight work and reports it cancelled, not
    /// failed (§4.6 step 4, §5).
    async fn respond_activity_task_cancelled(&self, task_token: &str, details: &str) -> Result<(), ClientError>;

    /// Records a liveness heartbeat for an in-flight activity task.
    async fn record_activity_task_heartbeat(&self, task_token: &str, details: Option<&str>) -> Result<HeartbeatResponse, ClientError>;

    /// Starts a new workflow execution (§4.7).
    async fn start_workflow_execution(&self, params: StartWorkflowExecution) -> Result<(), ClientError>;
}
