//! Error taxonomy for the decision engine
//!
//! Mirrors the kinds from spec §7: `Wait` never escapes the decider (it is
//! the internal replay-suspend signal), `TaskError` carries a failed step's
//! reason/details toward the workflow-service, and the others cover
//! submission-time misuse and unexpected panics.

use thiserror::Error;

/// A field expected on a history event was not present for its kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("attribute `{0}` not found on event")]
pub struct AttributeMissing(pub String);

/// Errors raised while aggregating history events into steps.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("event references unknown scheduled_event_id {0}")]
    DanglingReference(i64),
    #[error(transparent)]
    Attribute(#[from] AttributeMissing),
}

/// Errors raised while parsing history into a replay context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryParseError {
    #[error("history is empty")]
    EmptyHistory,
    #[error("first event must be a workflow-start event")]
    MissingStartEvent,
    #[error("failed to decode input payload: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Attribute(#[from] AttributeMissing),
}

/// The reason/details pair a failed step (or the decider itself) reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    pub reason: String,
    pub details: String,
}

impl TaskError {
    pub fn new(reason: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            details: details.into(),
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for TaskError {}

/// Internal control-flow signal used while walking the tree.
///
/// `Waiting` is never returned to callers of
/// [`crate::decider::Decider::decide`] — it is caught inside the walk and
/// converted into a `Suspend` outcome. `Failed` escapes the normal walk and
/// triggers the error-handler pass (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Signal {
    Waiting,
    Failed(TaskError),
}

/// Errors that can surface from submission-time validation (spec §4.7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("submitted tree root must be a Job node")]
    NotAJob,
    #[error("no input-handler protocol registered for `{0}`")]
    UnknownProtocol(String),
}
