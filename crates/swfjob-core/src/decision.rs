//! Decision batch (spec §3 / §6).
//!
//! Decisions returned by one decision tick, matching the workflow service's
//! wire shape field-for-field (§6) so a real client can forward them
//! unmodified.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityType {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowType {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decisionType")]
pub enum Decision {
    ScheduleActivityTask {
        #[serde(rename = "activityId")]
        activity_id: String,
        #[serde(rename = "activityType")]
        activity_type: ActivityType,
        #[serde(rename = "taskList")]
        task_list: TaskList,
        #[serde(rename = "taskPriority")]
        task_priority: String,
        input: String,
        #[serde(rename = "heartbeatTimeout")]
        heartbeat_timeout: String,
        #[serde(rename = "scheduleToCloseTimeout")]
        schedule_to_close_timeout: String,
        #[serde(rename = "scheduleToStartTimeout")]
        schedule_to_start_timeout: String,
        #[serde(rename = "startToCloseTimeout")]
        start_to_close_timeout: String,
    },
    StartChildWorkflowExecution {
        #[serde(rename = "workflowId")]
        workflow_id: String,
        #[serde(rename = "workflowType")]
        workflow_type: WorkflowType,
        #[serde(rename = "taskList")]
        task_list: TaskList,
        #[serde(rename = "taskPriority")]
        task_priority: String,
        #[serde(rename = "tagList")]
        tag_list: Vec<String>,
        #[serde(rename = "childPolicy")]
        child_policy: String,
        #[serde(rename = "executionStartToCloseTimeout")]
        execution_start_to_close_timeout: String,
        #[serde(rename = "taskStartToCloseTimeout")]
        task_start_to_close_timeout: String,
        input: String,
    },
    CompleteWorkflowExecution {
        result: Option<String>,
    },
    FailWorkflowExecution {
        reason: String,
        details: String,
    },
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Decision::CompleteWorkflowExecution { .. } | Decision::FailWorkflowExecution { .. })
    }
}

/// Ordered, appendable list of decisions for the current tick.
///
/// Invariant (spec §3): at most one terminal decision, and only if no
/// scheduling decision is also present.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionBatch {
    decisions: Vec<Decision>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DecisionBatchError {
    #[error("cannot mix a terminal decision with a scheduling decision")]
    TerminalWithScheduling,
    #[error("at most one terminal decision may appear in a batch")]
    MultipleTerminal,
}

impl DecisionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decision: Decision) -> Result<(), DecisionBatchError> {
        if decision.is_terminal() {
            if self.decisions.iter().any(Decision::is_terminal) {
                return Err(DecisionBatchError::MultipleTerminal);
            }
            if !self.decisions.is_empty() {
                return Err(DecisionBatchError::TerminalWithScheduling);
            }
        } else if self.decisions.iter().any(Decision::is_terminal) {
            return Err(DecisionBatchError::TerminalWithScheduling);
        }
        self.decisions.push(decision);
        Ok(())
    }

    pub fn as_slice(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}
