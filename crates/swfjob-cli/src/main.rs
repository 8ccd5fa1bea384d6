//! CLI entrypoint (§4.10): `init`, `worker start`, `job submit`, `monitor
//! start`, grounded in `original_source/mass/cli.py`'s click groups and the
//! teacher's `crates/cli` derive-macro style.

mod init;
mod monitor;
mod submit;
mod worker;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "mass")]
#[command(about = "Hierarchical job orchestration over a workflow service")]
#[command(version)]
struct Cli {
    /// Workflow domain.
    #[arg(long, env = "MASS_DOMAIN", default_value = "mass")]
    domain: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the domain and workflow/activity types with the workflow
    /// service (no-op against the in-memory test double; a real client
    /// would issue the corresponding SWF register calls here).
    Init,

    /// Run a worker farm: one decider loop plus one worker loop per
    /// registered role.
    Worker {
        #[command(subcommand)]
        command: worker::WorkerCommand,
    },

    /// Submit a job.
    Job {
        #[command(subcommand)]
        command: submit::JobCommand,
    },

    /// Serve the read-only monitor status page.
    Monitor {
        #[command(subcommand)]
        command: monitor::MonitorCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "mass=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init => init::run(&cli.domain),
        Commands::Worker { command } => worker::run(command).await,
        Commands::Job { command } => submit::run(command).await,
        Commands::Monitor { command } => monitor::run(command).await,
    }
}
