//! Step aggregator (spec §4.2 / component B).
//!
//! Collapses the flat event history into one [`Step`] per logical unit of
//! work (one scheduled activity or child workflow, plus its retries).
//! Grounded in
//! `original_source/mass/scheduler/swf/step.py::StepHandler.classify_events`:
//! `Decision*`/`Workflow*` events are dropped, and every remaining event is
//! bucketed by the canonicalized numeric suffix of its activity/workflow id.
//! Because ids for a step's retries are allocated in a contiguous block of
//! `max_retry + 1` slots (§4.3), integer-dividing the id by that block size
//! collapses every attempt of one logical step into the same bucket.

use serde::{Deserialize, Serialize};

use crate::error::StepError;
use crate::event::HistoryEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    ActivityTask,
    ChildWorkflowExecution,
}

impl StepKind {
    fn matches(&self, event_type: &str) -> bool {
        match self {
            StepKind::ActivityTask => event_type.contains("ActivityTask"),
            StepKind::ChildWorkflowExecution => event_type.contains("ChildWorkflowExecution"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Scheduled,
    Started,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
    ScheduleFailed,
    InitiateFailed,
}

/// One logical step: every event sharing the same retry bucket, in the
/// order the history delivered them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub max_retry: u32,
    events: Vec<HistoryEvent>,
    /// Transient per-tick flag (spec §3 Step invariants): set once the
    /// decider's stepper has popped this step.
    pub checked: bool,
}

impl Step {
    fn new(kind: StepKind, max_retry: u32) -> Self {
        Self {
            kind,
            max_retry,
            events: Vec::new(),
            checked: false,
        }
    }

    /// First `Scheduled`/`Initiated` event, or its failure-to-schedule
    /// counterpart if the step never got that far.
    pub fn init_event(&self) -> Option<&HistoryEvent> {
        self.events
            .iter()
            .find(|e| e.event_type.ends_with("Scheduled") || e.event_type.ends_with("Initiated"))
            .or_else(|| {
                self.events
                    .iter()
                    .find(|e| e.event_type == "ScheduleActivityTaskFailed" || e.event_type == "StartChildWorkflowExecutionFailed")
            })
    }

    pub fn created_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.init_event().map(|e| e.event_timestamp)
    }

    /// The literal wire id (`activityId`/`workflowId`) of the step's first
    /// scheduling attempt.
    pub fn name(&self) -> Result<&str, StepError> {
        let init = self.init_event().ok_or(StepError::DanglingReference(-1))?;
        match self.kind {
            StepKind::ActivityTask => Ok(init.activity_id()?),
            StepKind::ChildWorkflowExecution => init
                .workflow_id()
                .ok_or_else(|| crate::error::AttributeMissing("workflowId".into()).into()),
        }
    }

    /// `current_id + retry_count + 1`, keeping the retry inside this step's
    /// `max_retry + 1` block (`step.py::Step.retry_name`).
    pub fn retry_name(&self) -> Result<String, StepError> {
        let name = self.name()?;
        let (prefix, current_id) = match name.rsplit_once('-') {
            Some((p, s)) => (Some(p), s.parse::<i64>().map_err(|_| StepError::DanglingReference(-1))?),
            None => (None, name.parse::<i64>().map_err(|_| StepError::DanglingReference(-1))?),
        };
        let retry_id = current_id + self.retry_count() as i64 + 1;
        Ok(match prefix {
            Some(p) => format!("{p}-{retry_id}"),
            None => retry_id.to_string(),
        })
    }

    pub fn retry_count(&self) -> u32 {
        let init_kind_count = self
            .events
            .iter()
            .filter(|e| e.event_type.ends_with("Scheduled") || e.event_type.ends_with("Initiated"))
            .count();
        init_kind_count.saturating_sub(1) as u32
    }

    pub fn should_retry(&self) -> bool {
        self.retry_count() < self.max_retry
    }

    pub fn status(&self) -> StepStatus {
        let last = self.events.last().map(|e| e.event_type.as_str()).unwrap_or("");
        match last {
            "ActivityTaskScheduled" | "StartChildWorkflowExecutionInitiated" => StepStatus::Scheduled,
            "ActivityTaskStarted" | "ChildWorkflowExecutionStarted" => StepStatus::Started,
            "ActivityTaskCompleted" | "ChildWorkflowExecutionCompleted" => StepStatus::Completed,
            "ActivityTaskFailed" | "ChildWorkflowExecutionFailed" => StepStatus::Failed,
            "ActivityTaskTimedOut" | "ChildWorkflowExecutionTimedOut" => StepStatus::TimedOut,
            "ActivityTaskCanceled" | "ChildWorkflowExecutionCanceled" | "ChildWorkflowExecutionTerminated" => StepStatus::Cancelled,
            "ScheduleActivityTaskFailed" => StepStatus::ScheduleFailed,
            "StartChildWorkflowExecutionFailed" => StepStatus::InitiateFailed,
            _ => StepStatus::Scheduled,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.status(), StepStatus::Scheduled | StepStatus::Started)
    }

    pub fn priority(&self) -> Option<i32> {
        self.init_event().and_then(|e| e.task_priority()).and_then(|p| p.parse().ok())
    }

    pub fn input(&self) -> Option<&str> {
        self.init_event().and_then(|e| e.input())
    }

    pub fn task_list(&self) -> Option<&str> {
        self.init_event().and_then(|e| e.task_list_name())
    }

    pub fn tag_list(&self) -> Vec<String> {
        self.init_event().and_then(|e| e.field_list("tagList")).unwrap_or_default()
    }

    /// `result` of the `Completed` event, or `None` if the step hasn't
    /// completed.
    pub fn result(&self) -> Option<&str> {
        self.events
            .iter()
            .find(|e| e.event_type.ends_with("Completed"))
            .and_then(|e| e.result())
    }

    /// `(reason, details)` of the first `Failed` event, if any.
    pub fn error(&self) -> Option<(&str, &str)> {
        self.events.iter().find(|e| e.event_type.ends_with("Failed")).map(|e| {
            (e.reason().unwrap_or_default(), e.details().unwrap_or_default())
        })
    }
}

/// Parses the canonicalized numeric bucket out of a wire id like `"0"` or
/// `"T-<uuid>-3"`: the integer after the last `-`, or the whole string if
/// there is no `-`.
fn trailing_suffix(id: &str) -> Option<u32> {
    match id.rsplit_once('-') {
        Some((_, suffix)) => suffix.parse().ok(),
        None => id.parse().ok(),
    }
}

pub struct StepAggregator {
    pub activity_max_retry: u32,
    pub workflow_max_retry: u32,
}

impl StepAggregator {
    pub fn new(activity_max_retry: u32, workflow_max_retry: u32) -> Self {
        Self {
            activity_max_retry,
            workflow_max_retry,
        }
    }

    #[tracing::instrument(skip(self, events))]
    pub fn aggregate(&self, events: &[HistoryEvent]) -> Result<Vec<Step>, StepError> {
        let relevant: Vec<&HistoryEvent> = events
            .iter()
            .filter(|e| !e.event_type.starts_with("Decision") && !e.event_type.starts_with("Workflow"))
            .collect();

        let mut buckets: Vec<(String, StepKind, u32)> = Vec::new();
        let mut steps: Vec<Step> = Vec::new();

        for event in &relevant {
            let (kind, raw_id, max_retry) = if StepKind::ActivityTask.matches(&event.event_type) {
                let raw_id = if event.event_type.ends_with("Scheduled") {
                    event.activity_id()?.to_string()
                } else {
                    let init_id = event.scheduled_event_id()?;
                    let init_event = events
                        .iter()
                        .find(|e| e.event_id == init_id)
                        .ok_or(StepError::DanglingReference(init_id))?;
                    init_event.activity_id()?.to_string()
                };
                (StepKind::ActivityTask, raw_id, self.activity_max_retry)
            } else if StepKind::ChildWorkflowExecution.matches(&event.event_type) {
                let raw_id = event
                    .workflow_id()
                    .ok_or_else(|| crate::error::AttributeMissing("workflowId".into()))?
                    .to_string();
                (StepKind::ChildWorkflowExecution, raw_id, self.workflow_max_retry)
            } else {
                continue;
            };

            let n = trailing_suffix(&raw_id).ok_or(StepError::DanglingReference(event.event_id))?;
            let b = n - (n % (max_retry + 1));
            let bucket_name = match kind {
                StepKind::ActivityTask => format!("activity-{b}"),
                StepKind::ChildWorkflowExecution => format!("workflow-{b}"),
            };

            let idx = match buckets.iter().position(|(name, _, _)| *name == bucket_name) {
                Some(i) => i,
                None => {
                    buckets.push((bucket_name, kind, max_retry));
                    steps.push(Step::new(kind, max_retry));
                    buckets.len() - 1
                }
            };
            steps[idx].events.push((*event).clone());
        }

        steps.sort_by_key(|s| s.created_time());
        Ok(steps)
    }
}
