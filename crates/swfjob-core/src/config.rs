//! `SchedulerConfig` (spec §6 Configuration table).
//!
//! Builder-method style follows `durable::worker::WorkerPoolConfig`: a
//! `Default` impl carrying the source's defaults, with chained setters for
//! whichever options a caller overrides, plus env-var loading for
//! deployment-time configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub domain: String,
    pub region: String,
    pub workflow_execution_timeout_secs: u64,
    pub decision_task_timeout_secs: u64,
    pub activity_task_timeout_secs: u64,
    pub activity_heartbeat_timeout_secs: u64,
    pub activity_heartbeat_interval_secs: u64,
    pub activity_heartbeat_max_retry: u32,
    pub activity_max_retry: u32,
    pub workflow_max_retry: u32,
    pub decision_task_list: String,
    pub activity_task_list: String,
    pub workflow_child_policy: ChildPolicy,
    pub max_reason_size: usize,
    pub max_detail_size: usize,
    pub max_result_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChildPolicy {
    Terminate,
    RequestCancel,
    Abandon,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            domain: "mass".to_string(),
            region: "us-east-1".to_string(),
            workflow_execution_timeout_secs: 7 * 24 * 3600,
            decision_task_timeout_secs: 60,
            activity_task_timeout_secs: 7 * 24 * 3600,
            activity_heartbeat_timeout_secs: 3600,
            activity_heartbeat_interval_secs: 15 * 60,
            activity_heartbeat_max_retry: 2,
            activity_max_retry: 2,
            workflow_max_retry: 0,
            decision_task_list: "decision-tasks".to_string(),
            activity_task_list: "activity-tasks".to_string(),
            workflow_child_policy: ChildPolicy::Terminate,
            max_reason_size: 256,
            max_detail_size: 32_000,
            max_result_size: 32_000,
        }
    }
}

impl SchedulerConfig {
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn activity_max_retry(mut self, n: u32) -> Self {
        self.activity_max_retry = n;
        self
    }

    pub fn workflow_max_retry(mut self, n: u32) -> Self {
        self.workflow_max_retry = n;
        self
    }

    pub fn workflow_child_policy(mut self, policy: ChildPolicy) -> Self {
        self.workflow_child_policy = policy;
        self
    }

    /// Overrides recognized fields from environment variables (e.g.
    /// `MASS_DOMAIN`, `MASS_ACTIVITY_MAX_RETRY`), leaving unset ones at
    /// their current value.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("MASS_DOMAIN") {
            self.domain = v;
        }
        if let Ok(v) = std::env::var("MASS_REGION") {
            self.region = v;
        }
        if let Some(v) = std::env::var("MASS_ACTIVITY_MAX_RETRY").ok().and_then(|v| v.parse().ok()) {
            self.activity_max_retry = v;
        }
        if let Some(v) = std::env::var("MASS_WORKFLOW_MAX_RETRY").ok().and_then(|v| v.parse().ok()) {
            self.workflow_max_retry = v;
        }
        self
    }

    pub fn truncate_reason(&self, reason: &str) -> String {
        truncate(reason, self.max_reason_size)
    }

    pub fn truncate_details(&self, details: &str) -> String {
        truncate(details, self.max_detail_size)
    }

    pub fn truncate_result(&self, result: &str) -> String {
        truncate(result, self.max_result_size)
    }
}

fn truncate(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
