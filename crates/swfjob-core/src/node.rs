//! The Job → Task → Action tree (spec §3.1).
//!
//! `Node` is a plain, immutable value once built — both builders below only
//! exist to make constructing one pleasant; nothing about `Node` itself
//! depends on them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node in the hierarchical job tree.
///
/// Serializes with an outer tag matching the wire shape the workflow
/// service's `input`/`result` payloads use: `{"Job": {...}}`, `{"Task":
/// {...}}`, `{"Action": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Job(Branch),
    Task(Branch),
    Action(ActionBody),
}

/// Shared body of `Job` and `Task`: a title, a parallel/serial flag, and
/// children. Only `Job` may appear at tree root; that invariant is checked
/// at submission time (§4.7), not encoded in the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub title: String,
    #[serde(default)]
    pub parallel: bool,
    pub children: Vec<Node>,
}

/// Leaf node: dispatches to a single role. `role` is `None` for a no-op
/// placeholder action; `when_error` marks this action as an error handler,
/// which only ever runs after its parent task's normal children fail.
/// `params` is an open, string-keyed bag of role arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionBody {
    #[serde(rename = "_role", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "_whenerror", default)]
    pub when_error: bool,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Node {
    pub fn title(&self) -> Option<&str> {
        match self {
            Node::Job(b) | Node::Task(b) => Some(&b.title),
            Node::Action(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Job(b) | Node::Task(b) => &b.children,
            Node::Action(_) => &[],
        }
    }

    pub fn parallel(&self) -> bool {
        match self {
            Node::Job(b) | Node::Task(b) => b.parallel,
            Node::Action(_) => false,
        }
    }

    pub fn is_job(&self) -> bool {
        matches!(self, Node::Job(_))
    }

    pub fn is_action(&self) -> bool {
        matches!(self, Node::Action(_))
    }

    pub fn as_action(&self) -> Option<&ActionBody> {
        match self {
            Node::Action(a) => Some(a),
            _ => None,
        }
    }
}

/// Explicit, non-scoped builder for a `Job` or `Task` branch.
///
/// ```
/// use swfjob_core::node::{BranchBuilder, ActionBuilder, Node};
///
/// let job = BranchBuilder::job("deploy")
///     .add_child(ActionBuilder::new().role("notify").build())
///     .build();
/// assert!(job.is_job());
/// ```
pub struct BranchBuilder {
    is_job: bool,
    title: String,
    parallel: bool,
    children: Vec<Node>,
}

impl BranchBuilder {
    pub fn job(title: impl Into<String>) -> Self {
        Self {
            is_job: true,
            title: title.into(),
            parallel: false,
            children: Vec::new(),
        }
    }

    pub fn task(title: impl Into<String>) -> Self {
        Self {
            is_job: false,
            title: title.into(),
            parallel: false,
            children: Vec::new(),
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn add_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_task(self, task: Node) -> Self {
        debug_assert!(matches!(task, Node::Task(_)));
        self.add_child(task)
    }

    pub fn add_action(self, action: Node) -> Self {
        debug_assert!(matches!(action, Node::Action(_)));
        self.add_child(action)
    }

    pub fn build(self) -> Node {
        let branch = Branch {
            title: self.title,
            parallel: self.parallel,
            children: self.children,
        };
        if self.is_job {
            Node::Job(branch)
        } else {
            Node::Task(branch)
        }
    }
}

/// Explicit builder for a single `Action` leaf.
#[derive(Default)]
pub struct ActionBuilder {
    role: Option<String>,
    when_error: bool,
    params: Map<String, Value>,
}

impl ActionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn when_error(mut self, when_error: bool) -> Self {
        self.when_error = when_error;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Node {
        Node::Action(ActionBody {
            role: self.role,
            when_error: self.when_error,
            params: self.params,
        })
    }
}

/// Scoped tree builder: the closure-based analogue of the original's
/// `with Task(...): ...` context manager. No global or thread-local state —
/// the "stack" is just the Rust call stack, confined to the closures passed
/// in (per §9's guidance that any builder-local state must be confined and
/// reset, this confines it to nothing at all).
///
/// ```
/// use swfjob_core::node::scoped;
///
/// let job = scoped::job("deploy", false, |job| {
///     job.task("build", false, |task| {
///         task.action(|a| a.role("compile"));
///     });
/// });
/// assert_eq!(job.title(), Some("deploy"));
/// ```
pub mod scoped {
    use super::*;

    pub struct ChildrenScope {
        children: Vec<Node>,
    }

    impl ChildrenScope {
        fn new() -> Self {
            Self {
                children: Vec::new(),
            }
        }

        pub fn task(&mut self, title: impl Into<String>, parallel: bool, build: impl FnOnce(&mut ChildrenScope)) {
            let mut scope = ChildrenScope::new();
            build(&mut scope);
            self.children.push(Node::Task(Branch {
                title: title.into(),
                parallel,
                children: scope.children,
            }));
        }

        pub fn action(&mut self, build: impl FnOnce(ActionBuilder) -> ActionBuilder) {
            self.children.push(build(ActionBuilder::new()).build());
        }
    }

    pub fn job(title: impl Into<String>, parallel: bool, build: impl FnOnce(&mut ChildrenScope)) -> Node {
        let mut scope = ChildrenScope::new();
        build(&mut scope);
        Node::Job(Branch {
            title: title.into(),
            parallel,
            children: scope.children,
        })
    }
}
