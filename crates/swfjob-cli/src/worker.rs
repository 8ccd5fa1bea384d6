//! `mass worker start` (§4.9, `original_source/mass/scheduler/swf/__init__.py::SWFWorker.start`).
//!
//! There's no dynamic role loading in a compiled binary, so every `--role`
//! named on the command line is bound to a pass-through demo handler that
//! echoes its params back as the result. A real deployment links in its own
//! role closures and builds a [`RoleRegistry`] the same way.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use swfjob_client::memory::InMemoryWorkflowService;
use swfjob_core::prelude::SchedulerConfig;
use swfjob_worker::{Farm, RoleRegistry, Supervisor};

#[derive(Subcommand)]
pub enum WorkerCommand {
    /// Start a worker farm and block until SIGTERM/SIGHUP/SIGINT.
    Start(StartArgs),
}

#[derive(Args)]
pub struct StartArgs {
    /// `name=count` worker slots to run, e.g. `--role activity-tasks=4`.
    /// May be repeated.
    #[arg(long = "role", value_name = "NAME=COUNT")]
    roles: Vec<String>,

    #[arg(long, default_value_t = 2)]
    activity_max_retry: u32,

    #[arg(long, default_value_t = 0)]
    workflow_max_retry: u32,
}

pub async fn run(command: WorkerCommand) -> Result<()> {
    let WorkerCommand::Start(args) = command;

    let cfg = SchedulerConfig::default().activity_max_retry(args.activity_max_retry).workflow_max_retry(args.workflow_max_retry).with_env_overrides();

    let mut farm = Farm::new();
    let mut registry = RoleRegistry::new();
    for spec in &args.roles {
        let (name, count) = parse_role_spec(spec)?;
        farm = farm.role(name.clone(), count);
        registry.register(name, |_ctx, input| Ok(input));
    }
    if args.roles.is_empty() {
        farm = farm.role(cfg.activity_task_list.clone(), 1);
        registry.register(cfg.activity_task_list.clone(), |_ctx, input| Ok(input));
    }

    let client = Arc::new(InMemoryWorkflowService::new());
    let supervisor = Supervisor::new(client, cfg, registry, farm);

    tracing::info!("worker farm starting");
    supervisor.run_until_shutdown().await;
    tracing::info!("worker farm stopped");
    Ok(())
}

fn parse_role_spec(spec: &str) -> Result<(String, usize)> {
    let Some((name, count)) = spec.split_once('=') else {
        bail!("expected NAME=COUNT, got `{spec}`");
    };
    let count: usize = count.parse().map_err(|_| anyhow::anyhow!("invalid worker count in `{spec}`"))?;
    Ok((name.to_string(), count))
}
