//! End-to-end decider scenarios, driving `HistoryParser`/`Decider` directly
//! against hand-built history — no workflow-service double needed since
//! this crate has no I/O of its own. Covers the scenarios named in spec §8
//! that are observable at the decider level (bad-kwargs-to-role and
//! parallel-start-timing are worker/supervisor concerns and are covered in
//! `swfjob-worker`'s integration tests instead).

use serde_json::{json, Value};
use swfjob_core::prelude::*;

fn raw_event(event_id: i64, event_type: &str, attrs: Value) -> Value {
    let key = format!("{}{}EventAttributes", &event_type[..1].to_ascii_lowercase(), &event_type[1..]);
    json!({
        "eventId": event_id,
        "eventTimestamp": "2026-01-01T00:00:00Z",
        "eventType": event_type,
        key: attrs,
    })
}

fn started(root: &Node, priority: i32, tags: &[&str]) -> Value {
    let input = serde_json::to_string(&json!({"protocol": null, "body": root})).unwrap();
    raw_event(
        1,
        "WorkflowExecutionStarted",
        json!({"input": input, "tagList": tags, "taskPriority": priority.to_string()}),
    )
}

fn parse(raw: &[Value], cfg: &SchedulerConfig) -> ReplayContext {
    let events: Vec<HistoryEvent> = raw.iter().map(|v| HistoryEvent::parse(v).unwrap()).collect();
    HistoryParser::new(cfg.activity_max_retry, cfg.workflow_max_retry).parse(&events).unwrap()
}

/// Scenario 1: `Job("J"){ Task("T"){ Action(role="echo", msg="hi") } }`
/// completes with one child workflow and one activity, both ids `0`.
#[test]
fn single_action_succeeds() {
    let cfg = SchedulerConfig::default();
    let job = BranchBuilder::job("J")
        .add_task(BranchBuilder::task("T").add_action(ActionBuilder::new().role("echo").param("msg", "hi").build()).build())
        .build();

    let mut raw = vec![started(&job, 1, &["J"])];
    let mut ctx = parse(&raw, &cfg);
    let batch = match Decider::decide(&mut ctx, &cfg) {
        DeciderOutcome::Suspend(batch) => batch,
        other => panic!("expected a child-workflow scheduling decision, got {other:?}"),
    };
    let Decision::StartChildWorkflowExecution { workflow_id, .. } = &batch.as_slice()[0] else {
        panic!("expected StartChildWorkflowExecution");
    };
    assert!(workflow_id.starts_with("J-"));
    assert!(workflow_id.ends_with("-0"));

    raw.push(raw_event(2, "StartChildWorkflowExecutionInitiated", json!({"workflowId": workflow_id})));
    raw.push(raw_event(3, "ChildWorkflowExecutionStarted", json!({"workflowId": workflow_id, "initiatedEventId": 2})));

    // The child's own history: Task("T") suspends on its Action, same idea
    // one level down.
    let task = BranchBuilder::task("T").add_action(ActionBuilder::new().role("echo").param("msg", "hi").build()).build();
    let mut child_raw = vec![started(&task, 2, &["J", "T"])];
    let mut child_ctx = parse(&child_raw, &cfg);
    let child_batch = match Decider::decide(&mut child_ctx, &cfg) {
        DeciderOutcome::Suspend(batch) => batch,
        other => panic!("expected an activity scheduling decision, got {other:?}"),
    };
    let Decision::ScheduleActivityTask { activity_id, .. } = &child_batch.as_slice()[0] else {
        panic!("expected ScheduleActivityTask");
    };
    assert_eq!(activity_id, "0");

    child_raw.push(raw_event(2, "ActivityTaskScheduled", json!({"activityId": "0", "activityType": {"name": "Action", "version": "1.0"}})));
    child_raw.push(raw_event(3, "ActivityTaskCompleted", json!({"result": "null", "scheduledEventId": 2})));
    let mut child_ctx = parse(&child_raw, &cfg);
    assert_eq!(Decider::decide(&mut child_ctx, &cfg), DeciderOutcome::Complete(Some(Value::Null)));

    raw.push(raw_event(
        4,
        "ChildWorkflowExecutionCompleted",
        json!({"result": Value::Null, "workflowExecution": {"workflowId": workflow_id}, "initiatedEventId": 2}),
    ));
    let mut ctx = parse(&raw, &cfg);
    assert_eq!(Decider::decide(&mut ctx, &cfg), DeciderOutcome::Complete(None));
}

/// Scenario 3: a parallel `Job` schedules every child `Task` in the same
/// decision batch, not one-at-a-time — the timing guarantee the worker
/// layer relies on to start children within a few seconds of each other.
#[test]
fn parallel_children_are_scheduled_in_a_single_batch() {
    let cfg = SchedulerConfig::default();
    let job = BranchBuilder::job("J")
        .parallel(true)
        .add_task(BranchBuilder::task("T1").add_action(ActionBuilder::new().role("shell").param("cmd", "sleep 10").build()).build())
        .add_task(BranchBuilder::task("T2").add_action(ActionBuilder::new().role("shell").param("cmd", "sleep 8").build()).build())
        .build();

    let raw = vec![started(&job, 1, &["J"])];
    let mut ctx = parse(&raw, &cfg);
    let batch = match Decider::decide(&mut ctx, &cfg) {
        DeciderOutcome::Suspend(batch) => batch,
        other => panic!("expected scheduling decisions for both children, got {other:?}"),
    };
    let decisions = batch.as_slice();
    assert_eq!(decisions.len(), 2);
    assert!(decisions.iter().all(|d| matches!(d, Decision::StartChildWorkflowExecution { .. })));
}

/// Scenario 4: an activity fails once, then succeeds on retry with
/// `activity_max_retry=2` — the decider schedules id `N+1` in the same
/// retry bucket right after the first `Failed`.
#[test]
fn retry_then_success() {
    let cfg = SchedulerConfig::default().activity_max_retry(2);
    let action = ActionBuilder::new().role("flaky").build();
    let task = BranchBuilder::task("T").add_action(action).build();

    let mut raw = vec![started(&task, 1, &["J", "T"])];
    raw.push(raw_event(2, "ActivityTaskScheduled", json!({"activityId": "0", "activityType": {"name": "Action", "version": "1.0"}})));
    raw.push(raw_event(3, "ActivityTaskFailed", json!({"reason": "boom", "details": "", "scheduledEventId": 2})));

    let mut ctx = parse(&raw, &cfg);
    let batch = match Decider::decide(&mut ctx, &cfg) {
        DeciderOutcome::Suspend(batch) => batch,
        other => panic!("expected a retry schedule, got {other:?}"),
    };
    let Decision::ScheduleActivityTask { activity_id, .. } = &batch.as_slice()[0] else {
        panic!("expected ScheduleActivityTask retry");
    };
    assert_eq!(activity_id, "1");

    raw.push(raw_event(4, "ActivityTaskScheduled", json!({"activityId": "1", "activityType": {"name": "Action", "version": "1.0"}})));
    raw.push(raw_event(5, "ActivityTaskCompleted", json!({"result": "\"ok\"", "scheduledEventId": 4})));
    let mut ctx = parse(&raw, &cfg);
    assert_eq!(Decider::decide(&mut ctx, &cfg), DeciderOutcome::Complete(Some(Value::String("ok".to_string()))));
}

/// Scenario 5: retries exhausted (`activity_max_retry=0`, so a single
/// Failed is already terminal) runs the error-handler action, then fails
/// the workflow with the primary action's reason.
#[test]
fn retries_exhausted_then_error_handler_then_fail() {
    let cfg = SchedulerConfig::default().activity_max_retry(0);
    let task = BranchBuilder::task("T")
        .add_action(ActionBuilder::new().role("shell").param("cmd", "fakecmd").build())
        .add_action(ActionBuilder::new().role("shell").param("cmd", "echo oops").when_error(true).build())
        .build();

    let mut raw = vec![started(&task, 1, &["J", "T"])];
    raw.push(raw_event(2, "ActivityTaskScheduled", json!({"activityId": "0", "activityType": {"name": "Action", "version": "1.0"}})));
    raw.push(raw_event(3, "ActivityTaskFailed", json!({"reason": "command not found", "details": "fakecmd", "scheduledEventId": 2})));

    let mut ctx = parse(&raw, &cfg);
    let batch = match Decider::decide(&mut ctx, &cfg) {
        DeciderOutcome::Suspend(batch) => batch,
        other => panic!("expected the error-handler action to be scheduled, got {other:?}"),
    };
    let Decision::ScheduleActivityTask { activity_id, .. } = &batch.as_slice()[0] else {
        panic!("expected ScheduleActivityTask for the error handler");
    };
    assert_eq!(activity_id, "1"); // next_activity_id counts only the non-error-handler step so far

    raw.push(raw_event(4, "ActivityTaskScheduled", json!({"activityId": "1", "activityType": {"name": "Action", "version": "1.0"}})));
    raw.push(raw_event(5, "ActivityTaskCompleted", json!({"result": "null", "scheduledEventId": 4})));

    let mut ctx = parse(&raw, &cfg);
    match Decider::decide(&mut ctx, &cfg) {
        DeciderOutcome::Fail { reason, .. } => assert_eq!(reason, "command not found"),
        other => panic!("expected the workflow to fail after the error handler ran, got {other:?}"),
    }
}

/// Scenario 6: 3 serial Tasks, each a single Action, get priorities
/// 2, 3, 4 under a root priority of 1.
#[test]
fn serial_priority_matches_the_worked_example() {
    let cfg = SchedulerConfig::default();
    let job = BranchBuilder::job("J")
        .add_task(BranchBuilder::task("T0").add_action(ActionBuilder::new().role("r").build()).build())
        .add_task(BranchBuilder::task("T1").add_action(ActionBuilder::new().role("r").build()).build())
        .add_task(BranchBuilder::task("T2").add_action(ActionBuilder::new().role("r").build()).build())
        .build();

    let mut raw = vec![started(&job, 1, &["J"])];
    let mut priorities = Vec::new();
    for expected in [2, 3, 4] {
        let mut ctx = parse(&raw, &cfg);
        let batch = match Decider::decide(&mut ctx, &cfg) {
            DeciderOutcome::Suspend(batch) => batch,
            other => panic!("expected a child-workflow schedule, got {other:?}"),
        };
        let Decision::StartChildWorkflowExecution { task_priority, workflow_id, .. } = &batch.as_slice()[0] else {
            panic!("expected StartChildWorkflowExecution");
        };
        priorities.push(task_priority.parse::<i32>().unwrap());
        assert_eq!(priorities.last(), Some(&expected));

        let next_id = raw.len() as i64 + 1;
        raw.push(raw_event(next_id, "StartChildWorkflowExecutionInitiated", json!({"workflowId": workflow_id})));
        raw.push(raw_event(
            next_id + 1,
            "ChildWorkflowExecutionCompleted",
            json!({"result": Value::Null, "workflowExecution": {"workflowId": workflow_id}, "initiatedEventId": next_id}),
        ));
    }
    assert_eq!(priorities, vec![2, 3, 4]);
}
