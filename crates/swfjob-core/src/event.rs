//! Event view (spec §4.1 / component A).
//!
//! The workflow service hands back history as a flat list of JSON records,
//! each carrying its payload in a type-specific `<kind>EventAttributes`
//! object. Earlier generations of this parser walked that shape reflectively
//! (snake_case field name → camelCase lookup, searched across the event root
//! and any nested `EventAttributes`/`workflowExecution` object). That is
//! deliberately not reproduced here: the attributes object is unwrapped once,
//! at parse time, into a flat field map, and lookups are explicit accessor
//! methods rather than a generic field walker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AttributeMissing;

/// A parsed history event: the one `*EventAttributes` object a raw record
/// carries has already been unwrapped into `attrs` by [`HistoryEvent::parse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub event_id: i64,
    pub event_timestamp: DateTime<Utc>,
    pub event_type: String,
    pub attrs: Map<String, Value>,
}

impl HistoryEvent {
    /// Parse one raw history record, unwrapping its single
    /// `<eventType in camelCase>EventAttributes` object into a flat map.
    pub fn parse(raw: &Value) -> Result<Self, AttributeMissing> {
        let event_id = raw
            .get("eventId")
            .and_then(Value::as_i64)
            .ok_or_else(|| AttributeMissing("eventId".into()))?;
        let event_timestamp = raw
            .get("eventTimestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| AttributeMissing("eventTimestamp".into()))?;
        let event_type = raw
            .get("eventType")
            .and_then(Value::as_str)
            .ok_or_else(|| AttributeMissing("eventType".into()))?
            .to_string();

        let attrs_key = format!("{}{}", lower_first(&event_type), "EventAttributes");
        let attrs = raw
            .get(&attrs_key)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            event_id,
            event_timestamp,
            event_type,
            attrs,
        })
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.event_type == kind
    }

    pub(crate) fn field(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub(crate) fn field_list(&self, name: &str) -> Option<Vec<String>> {
        self.field(name).and_then(Value::as_array).map(|arr| {
            arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
        })
    }

    fn string_field(&self, name: &str) -> Result<&str, AttributeMissing> {
        self.field(name)
            .and_then(Value::as_str)
            .ok_or_else(|| AttributeMissing(name.to_string()))
    }

    pub fn activity_id(&self) -> Result<&str, AttributeMissing> {
        self.string_field("activityId")
    }

    pub fn scheduled_event_id(&self) -> Result<i64, AttributeMissing> {
        self.field("scheduledEventId")
            .or_else(|| self.field("initiatedEventId"))
            .and_then(Value::as_i64)
            .ok_or_else(|| AttributeMissing("scheduledEventId".into()))
    }

    pub fn started_event_id(&self) -> Result<i64, AttributeMissing> {
        self.field("startedEventId")
            .and_then(Value::as_i64)
            .ok_or_else(|| AttributeMissing("startedEventId".into()))
    }

    pub fn input(&self) -> Option<&str> {
        self.field("input").and_then(Value::as_str)
    }

    pub fn result(&self) -> Option<&str> {
        self.field("result").and_then(Value::as_str)
    }

    pub fn reason(&self) -> Option<&str> {
        self.field("reason").and_then(Value::as_str)
    }

    pub fn details(&self) -> Option<&str> {
        self.field("details").and_then(Value::as_str)
    }

    pub fn task_priority(&self) -> Option<&str> {
        self.field("taskPriority").and_then(Value::as_str)
    }

    pub fn task_list_name(&self) -> Option<&str> {
        self.field("taskList")
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str)
    }

    /// `workflowId` sits at event root on a `workflowExecution` nested object
    /// for child-workflow events, or directly in `attrs` for workflow-start.
    pub fn workflow_id(&self) -> Option<&str> {
        self.field("workflowId")
            .and_then(Value::as_str)
            .or_else(|| {
                self.field("workflowExecution")
                    .and_then(|v| v.get("workflowId"))
                    .and_then(Value::as_str)
            })
    }

    pub fn activity_type_name(&self) -> Option<&str> {
        self.field("activityType").and_then(|v| v.get("name")).and_then(Value::as_str)
    }

    pub fn workflow_type_name(&self) -> Option<&str> {
        self.field("workflowType").and_then(|v| v.get("name")).and_then(Value::as_str)
    }

    pub fn timeout_type(&self) -> Option<&str> {
        self.field("timeoutType").and_then(Value::as_str)
    }

    /// `ScheduleActivityTaskFailed`/`StartChildWorkflowExecutionFailed` carry
    /// the id under `activityId` or `workflowId` depending on kind.
    pub fn field_activity_or_workflow_id(&self) -> Option<String> {
        self.field("activityId")
            .or_else(|| self.field("workflowId"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn field_cause(&self) -> Option<String> {
        self.field("cause").and_then(Value::as_str).map(str::to_string)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.event_type.as_str(),
            "ActivityTaskCompleted"
                | "ActivityTaskFailed"
                | "ActivityTaskTimedOut"
                | "ActivityTaskCanceled"
                | "ChildWorkflowExecutionCompleted"
                | "ChildWorkflowExecutionFailed"
                | "ChildWorkflowExecutionTimedOut"
                | "ChildWorkflowExecutionCanceled"
                | "ChildWorkflowExecutionTerminated"
                | "ScheduleActivityTaskFailed"
                | "StartChildWorkflowExecutionFailed"
        )
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scheduled() -> Value {
        json!({
            "eventId": 5,
            "eventTimestamp": "2026-01-01T00:00:00Z",
            "eventType": "ActivityTaskScheduled",
            "activityTaskScheduledEventAttributes": {
                "activityId": "action-0",
                "activityType": {"name": "Action", "version": "1.0"},
                "input": "{}",
                "taskPriority": "3",
                "taskList": {"name": "activity-tasks"}
            }
        })
    }

    #[test]
    fn parses_and_unwraps_attributes_once() {
        let event = HistoryEvent::parse(&scheduled()).unwrap();
        assert_eq!(event.event_id, 5);
        assert_eq!(event.activity_id().unwrap(), "action-0");
        assert_eq!(event.task_priority(), Some("3"));
        assert_eq!(event.task_list_name(), Some("activity-tasks"));
        assert_eq!(event.activity_type_name(), Some("Action"));
    }

    #[test]
    fn missing_field_is_a_typed_error() {
        let event = HistoryEvent::parse(&scheduled()).unwrap();
        let err = event.started_event_id().unwrap_err();
        assert_eq!(err, AttributeMissing("startedEventId".into()));
    }

    #[test]
    fn workflow_id_falls_back_to_nested_execution_object() {
        let raw = json!({
            "eventId": 9,
            "eventTimestamp": "2026-01-01T00:00:00Z",
            "eventType": "ChildWorkflowExecutionStarted",
            "childWorkflowExecutionStartedEventAttributes": {
                "workflowExecution": {"workflowId": "job-42", "runId": "r1"},
                "initiatedEventId": 3
            }
        });
        let event = HistoryEvent::parse(&raw).unwrap();
        assert_eq!(event.workflow_id(), Some("job-42"));
        assert_eq!(event.scheduled_event_id().unwrap(), 3);
    }

    #[test]
    fn terminal_classification_matches_known_kinds() {
        let mut raw = scheduled();
        raw["eventType"] = json!("ActivityTaskCompleted");
        raw["activityTaskCompletedEventAttributes"] = raw["activityTaskScheduledEventAttributes"].clone();
        let event = HistoryEvent::parse(&raw).unwrap();
        assert!(event.is_terminal());
    }
}
