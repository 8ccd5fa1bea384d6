//! Role registry, thread-isolated task runner, and worker farm/supervisor
//! (§4.6, §4.9).
//!
//! `swfjob-core` has no I/O; this crate is what actually drives it: a
//! [`RoleRegistry`] maps activity task-lists to role closures, [`runner`]
//! spawns each invocation on its own OS thread, and [`Supervisor`] runs the
//! decider loop plus one worker loop per [`Farm`] slot.

pub mod context;
pub mod farm;
pub mod role;
pub mod runner;
pub mod supervisor;

pub use context::{ActivityContext, CancellationHandle};
pub use farm::Farm;
pub use role::{RoleFailure, RoleRegistry, RoleResult};
pub use supervisor::Supervisor;
