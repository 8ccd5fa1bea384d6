//! `mass job submit` (§4.7, `original_source/mass/cli.py::job submit` +
//! `mass/utils.py::start`).
//!
//! Reads a `Node` tree as JSON (from `--json` inline or `--file` on disk),
//! wraps it in the `{"protocol": null, "body": ...}` envelope, and starts a
//! workflow execution. Since there's no live workflow-service client, this
//! runs against a fresh, local [`InMemoryWorkflowService`] and prints the
//! resulting start event rather than talking to a shared backend.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use swfjob_client::memory::InMemoryWorkflowService;
use swfjob_client::{StartWorkflowExecution, WorkflowServiceClient};
use swfjob_core::prelude::{Node, SchedulerConfig};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum JobCommand {
    /// Submit a job tree.
    Submit(SubmitArgs),
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Inline JSON for the job's `Node` tree, e.g. `{"Job": {...}}`.
    #[arg(short = 'j', long, conflicts_with = "file")]
    json: Option<String>,

    /// Path to a file containing the job's `Node` tree as JSON.
    #[arg(short = 'f', long, conflicts_with = "json")]
    file: Option<PathBuf>,

    /// Workflow id; a fresh v7 UUID is used if omitted.
    #[arg(long)]
    workflow_id: Option<String>,

    /// Tag to attach to the workflow execution. May be repeated.
    #[arg(long = "tag")]
    tags: Vec<String>,
}

pub async fn run(command: JobCommand) -> Result<()> {
    let JobCommand::Submit(args) = command;

    let raw = match (args.json, args.file) {
        (Some(json), None) => json,
        (None, Some(path)) => std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?,
        _ => anyhow::bail!("exactly one of --json or --file is required"),
    };
    let node: Node = serde_json::from_str(&raw).context("job tree is not a valid Node")?;
    if !node.is_job() {
        anyhow::bail!("submitted tree's root must be a Job");
    }

    let cfg = SchedulerConfig::default();
    let workflow_id = args.workflow_id.unwrap_or_else(|| Uuid::now_v7().to_string());
    let envelope = serde_json::json!({"protocol": null, "body": node});

    let client = InMemoryWorkflowService::new();
    client
        .start_workflow_execution(StartWorkflowExecution {
            workflow_id: workflow_id.clone(),
            domain: cfg.domain.clone(),
            task_list: cfg.decision_task_list.clone(),
            task_priority: "1".to_string(),
            tag_list: args.tags,
            input: envelope.to_string(),
        })
        .await?;

    println!("submitted workflow {workflow_id}");
    for event in client.history(&workflow_id).unwrap_or_default() {
        println!("{event}");
    }
    println!("(submitted against a local, process-private store — a live deployment shares one workflow service across `worker start` and `job submit`)");
    Ok(())
}
