//! Role registry (§6 "Role/handler registration").
//!
//! A role names the activity task-list a closure binds to, scoped to a
//! single worker process instance — per §9's "Registries" guidance this is
//! an owned, per-instance map, never a process-global one.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::context::ActivityContext;

/// Outcome of running a role: the activity result, or a typed failure
/// carrying the reason/details an `ActivityTaskFailed` response reports.
pub type RoleResult = Result<Value, RoleFailure>;

#[derive(Debug, Clone)]
pub struct RoleFailure {
    pub reason: String,
    pub details: String,
}

impl RoleFailure {
    pub fn new(reason: impl Into<String>, details: impl Into<String>) -> Self {
        Self { reason: reason.into(), details: details.into() }
    }
}

pub type RoleFn = Arc<dyn Fn(&ActivityContext, Value) -> RoleResult + Send + Sync>;

#[derive(Default, Clone)]
pub struct RoleRegistry {
    roles: HashMap<String, RoleFn>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&ActivityContext, Value) -> RoleResult + Send + Sync + 'static,
    {
        self.roles.insert(name.into(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<RoleFn> {
        self.roles.get(name).cloned()
    }
}
