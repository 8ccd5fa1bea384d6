//! Event-sourced decision engine for hierarchical Job/Task/Action workflows.
//!
//! Holds no I/O of its own: history in, a decision batch out, so replay
//! determinism can be tested without a live workflow service.
//!
//! - [`node`] — the Job/Task/Action tree and its builders.
//! - [`event`] — normalized accessors over raw history records.
//! - [`step`] — groups history events into logical, retry-aware steps.
//! - [`history`] — the per-tick replay context built from a step list.
//! - [`decider`] — walks the tree and emits the next decision.
//! - [`priority`] — serial-priority computation.
//! - [`decision`] — the wire-shaped decision/batch types.
//! - [`config`] — `SchedulerConfig` and its defaults.

pub mod config;
pub mod decider;
pub mod decision;
pub mod error;
pub mod event;
pub mod history;
pub mod node;
pub mod priority;
pub mod step;

pub mod prelude {
    pub use crate::config::SchedulerConfig;
    pub use crate::decider::{Decider, DeciderOutcome};
    pub use crate::decision::{ActivityType, Decision, DecisionBatch, TaskList, WorkflowType};
    pub use crate::error::{HistoryParseError, StepError, SubmissionError, TaskError};
    pub use crate::event::HistoryEvent;
    pub use crate::history::{HistoryParser, ReplayContext};
    pub use crate::node::{ActionBuilder, BranchBuilder, Node};
    pub use crate::step::{Step, StepKind, StepStatus};
}
