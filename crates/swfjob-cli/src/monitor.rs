//! `mass monitor start` (§4.10, `original_source/mass/cli.py::monitor` +
//! `everruns-api`'s axum routing idiom).
//!
//! A minimal read-only status page: there is no live workflow-service
//! client to poll, so this lists workflows known to a local
//! [`InMemoryWorkflowService`], optionally seeded with one demo job at
//! startup via `--seed`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use clap::{Args, Subcommand};
use serde::Serialize;
use swfjob_client::memory::InMemoryWorkflowService;
use swfjob_client::{StartWorkflowExecution, WorkflowServiceClient};
use swfjob_core::prelude::{Node, SchedulerConfig};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum MonitorCommand {
    /// Serve the status page.
    Start(StartArgs),
}

#[derive(Args)]
pub struct StartArgs {
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Path to a `Node` JSON file to submit as a demo workflow at startup.
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    client: Arc<InMemoryWorkflowService>,
}

#[derive(Serialize)]
struct WorkflowSummary {
    workflow_id: String,
    status: &'static str,
    event_count: usize,
}

#[derive(Serialize)]
struct StatusResponse {
    workflows: Vec<WorkflowSummary>,
}

async fn list_workflows(State(state): State<AppState>) -> Json<StatusResponse> {
    let workflows = state
        .client
        .statuses()
        .into_iter()
        .map(|(workflow_id, status, event_count)| WorkflowSummary { workflow_id, status, event_count })
        .collect();
    Json(StatusResponse { workflows })
}

async fn health() -> &'static str {
    "ok"
}

fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/workflows", get(list_workflows))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(command: MonitorCommand) -> Result<()> {
    let MonitorCommand::Start(args) = command;
    let client = Arc::new(InMemoryWorkflowService::new());

    if let Some(path) = args.seed {
        seed_demo_workflow(&client, &path).await?;
    }

    let app = routes(AppState { client });
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "monitor listening");
    axum::serve(listener, app).await.context("monitor server exited")
}

async fn seed_demo_workflow(client: &InMemoryWorkflowService, path: &PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let node: Node = serde_json::from_str(&raw).context("seed file is not a valid Node")?;
    let cfg = SchedulerConfig::default();
    let envelope = serde_json::json!({"protocol": null, "body": node});
    client
        .start_workflow_execution(StartWorkflowExecution {
            workflow_id: Uuid::now_v7().to_string(),
            domain: cfg.domain,
            task_list: cfg.decision_task_list,
            task_priority: "1".to_string(),
            tag_list: vec![],
            input: envelope.to_string(),
        })
        .await
        .context("seeding demo workflow")
}
