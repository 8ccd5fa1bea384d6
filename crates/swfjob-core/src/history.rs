//! History parser / replay context (spec §4.3 / component C).
//!
//! Produces the per-decision-tick state the decider walks against: the
//! submitted subtree, its tag list and priority, the aggregated steps
//! sorted by creation time, and the id generators the decider consults when
//! it needs to schedule a new child. Grounded in
//! `original_source/mass/scheduler/swf/step.py::StepHandler.__init__` /
//! `get_next_activity_name` / `get_next_workflow_name`.

use uuid::Uuid;

use crate::error::HistoryParseError;
use crate::event::HistoryEvent;
use crate::node::Node;
use crate::step::{Step, StepAggregator, StepKind};

/// Input may be wrapped as `{"protocol": <name-or-null>, "body": <value>}`
/// to support externalized payloads (§6). With no protocol, `body` is the
/// subtree itself.
#[derive(Debug, serde::Deserialize)]
struct Envelope {
    protocol: Option<String>,
    body: serde_json::Value,
}

#[derive(Debug)]
pub struct ReplayContext {
    pub tag_list: Vec<String>,
    pub priority: i32,
    pub root: Node,
    steps: Vec<Step>,
    activity_newborn_count: u32,
    workflow_newborn_count: u32,
    activity_max_retry: u32,
    workflow_max_retry: u32,
}

impl ReplayContext {
    /// Steps in creation-time order, each carrying a transient `checked`
    /// flag the decider mutates as it consumes them.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    /// First unchecked step, if any (`StepHandler.pop`/`is_scheduled`).
    pub fn next_unchecked(&mut self) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| !s.checked)
    }

    pub fn is_scheduled(&self) -> bool {
        self.steps.iter().any(|s| !s.checked)
    }

    /// Any checked step still in `Scheduled`/`Started` (`StepHandler.is_waiting`).
    pub fn is_waiting(&self) -> bool {
        self.steps.iter().any(|s| s.checked && s.is_waiting())
    }

    /// `(count_of_existing_activity_steps + newborns) * (max_retry + 1)`,
    /// bumping the newborn counter (§4.3).
    pub fn next_activity_id(&mut self) -> String {
        let count = self.steps.iter().filter(|s| s.kind == StepKind::ActivityTask).count() as u32;
        let next_id = (count + self.activity_newborn_count) * (self.activity_max_retry + 1);
        self.activity_newborn_count += 1;
        next_id.to_string()
    }

    /// `"<prefix>-<uuid>-<(count + newborns) * (max_retry + 1)>"` (§4.3).
    pub fn next_workflow_id(&mut self, prefix: &str) -> String {
        let count = self
            .steps
            .iter()
            .filter(|s| s.kind == StepKind::ChildWorkflowExecution)
            .count() as u32;
        let next_id = (count + self.workflow_newborn_count) * (self.workflow_max_retry + 1);
        self.workflow_newborn_count += 1;
        format!("{prefix}-{}-{next_id}", Uuid::now_v7())
    }
}

pub struct HistoryParser {
    pub activity_max_retry: u32,
    pub workflow_max_retry: u32,
}

impl HistoryParser {
    pub fn new(activity_max_retry: u32, workflow_max_retry: u32) -> Self {
        Self {
            activity_max_retry,
            workflow_max_retry,
        }
    }

    #[tracing::instrument(skip(self, events))]
    pub fn parse(&self, events: &[HistoryEvent]) -> Result<ReplayContext, HistoryParseError> {
        let start = events
            .iter()
            .find(|e| !e.event_type.starts_with("Decision"))
            .ok_or(HistoryParseError::EmptyHistory)?;
        if !start.is_kind("WorkflowExecutionStarted") {
            return Err(HistoryParseError::MissingStartEvent);
        }

        let raw_input = start.input().ok_or(HistoryParseError::MissingStartEvent)?;
        let envelope: Envelope =
            serde_json::from_str(raw_input).map_err(|e| HistoryParseError::InvalidInput(e.to_string()))?;
        let body = match envelope.protocol {
            None => envelope.body,
            Some(protocol) => {
                return Err(HistoryParseError::InvalidInput(format!(
                    "no input-handler protocol registered for `{protocol}`"
                )))
            }
        };
        let root: Node = serde_json::from_value(body).map_err(|e| HistoryParseError::InvalidInput(e.to_string()))?;

        let tag_list = start.field_list("tagList").unwrap_or_default();
        let priority = start
            .task_priority()
            .and_then(|p| p.parse().ok())
            .ok_or(HistoryParseError::MissingStartEvent)?;

        let aggregator = StepAggregator::new(self.activity_max_retry, self.workflow_max_retry);
        let steps = aggregator.aggregate(events)?;

        Ok(ReplayContext {
            tag_list,
            priority,
            root,
            steps,
            activity_newborn_count: 0,
            workflow_newborn_count: 0,
            activity_max_retry: self.activity_max_retry,
            workflow_max_retry: self.workflow_max_retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn start_event(body: &serde_json::Value) -> HistoryEvent {
        let input = serde_json::to_string(&json!({"protocol": null, "body": body})).unwrap();
        let raw = json!({
            "eventId": 1,
            "eventTimestamp": "2026-01-01T00:00:00Z",
            "eventType": "WorkflowExecutionStarted",
            "workflowExecutionStartedEventAttributes": {
                "input": input,
                "tagList": ["J"],
                "taskPriority": "1"
            }
        });
        HistoryEvent::parse(&raw).unwrap()
    }

    #[test]
    fn parses_root_tree_and_metadata_through_the_null_protocol_envelope() {
        let action = crate::node::ActionBuilder::new().role("noop").build();
        let action_json = serde_json::to_value(&action).unwrap();
        let events = vec![start_event(&action_json)];
        let parser = HistoryParser::new(2, 0);
        let ctx = parser.parse(&events).unwrap();
        assert_eq!(ctx.tag_list, vec!["J".to_string()]);
        assert_eq!(ctx.priority, 1);
        assert!(ctx.root.is_action());
    }

    #[test]
    fn rejects_empty_history() {
        let parser = HistoryParser::new(2, 0);
        assert!(matches!(parser.parse(&[]).unwrap_err(), HistoryParseError::EmptyHistory));
    }

    #[test]
    fn next_activity_id_counts_existing_steps_and_newborns() {
        let action = crate::node::ActionBuilder::new().role("noop").build();
        let action_json = serde_json::to_value(&action).unwrap();
        let mut events = vec![start_event(&action_json)];
        events.push(
            HistoryEvent::parse(&json!({
                "eventId": 2,
                "eventTimestamp": "2026-01-01T00:00:01Z",
                "eventType": "ActivityTaskScheduled",
                "activityTaskScheduledEventAttributes": {"activityId": "0", "activityType": {"name": "Action", "version": "1.0"}}
            }))
            .unwrap(),
        );
        let parser = HistoryParser::new(2, 0);
        let mut ctx = parser.parse(&events).unwrap();
        assert_eq!(ctx.next_activity_id(), "3"); // (1 existing + 0 newborn) * 3
        assert_eq!(ctx.next_activity_id(), "6"); // (1 existing + 1 newborn) * 3
    }
}
