//! aptflow command-line service
//!
//! Builds an orchestrator over the reference workers and the default catalog,
//! runs one request and prints the result as pretty JSON:
//! - Catalog and registry listings, health probes
//! - Template runs, ad-hoc step lists and routed requests
//! - Collaboration and direct single-worker dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use aptflow_agents::HeuristicBackend;
use aptflow_core::OrchestratorConfig;
use aptflow_workflows::{Orchestrator, WorkflowStep};

mod input;

#[derive(Parser, Debug)]
#[command(name = "aptflow")]
#[command(about = "Multi-agent workflow orchestrator")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Orchestrator config file (TOML); defaults plus APTFLOW_* env vars otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List workflow templates
    Workflows,
    /// List registered workers
    Workers,
    /// Probe every worker
    Health,
    /// Run a catalog template
    Run {
        template: String,
        /// Input record (JSON or @file)
        #[arg(long)]
        input: Option<String>,
    },
    /// Run an ad-hoc list of steps
    Custom {
        /// Step list (JSON array or @file)
        #[arg(long)]
        steps: String,
        #[arg(long)]
        input: Option<String>,
    },
    /// Route a request by type
    Route {
        request_type: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Run several workers on shared data
    Collaborate {
        /// Comma-separated worker names
        workers: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// Invoke one worker directly
    Dispatch {
        worker: String,
        action: String,
        #[arg(long)]
        data: Option<String>,
    },
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("aptflow=info".parse()?)
        .add_directive("aptflow_workflows=info".parse()?)
        .add_directive("aptflow_agents=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from /etc/aptflow/environment (if exists)
    aptflow_core::config::load_environment();

    let args = Args::parse();
    init_tracing(args.json)?;

    let config = match &args.config {
        Some(path) => OrchestratorConfig::load(path)?,
        None => OrchestratorConfig::from_env()?,
    };
    let orchestrator = Orchestrator::with_builtin_workers(config, Arc::new(HeuristicBackend))?;
    info!(command = ?args.command, "Orchestrator initialized");

    match args.command {
        Commands::Workflows => print(&orchestrator.list_workflows())?,
        Commands::Workers => print(&orchestrator.list_workers())?,
        Commands::Health => print(&orchestrator.health_check().await)?,
        Commands::Run { template, input } => {
            let input = input::record(input.as_deref())?;
            print(&orchestrator.run_template(&template, input).await?)?;
        }
        Commands::Custom { steps, input } => {
            let steps: Vec<WorkflowStep> = input::parse(&steps)?;
            let input = input::record(input.as_deref())?;
            print(&orchestrator.run_custom_steps(&steps, input).await)?;
        }
        Commands::Route {
            request_type,
            context,
        } => {
            let context = input::record(context.as_deref())?;
            print(&orchestrator.route(&request_type, context).await?)?;
        }
        Commands::Collaborate { workers, data } => {
            let workers = input::names(&workers);
            let data = input::record(data.as_deref())?;
            print(&orchestrator.run_collaboration(&workers, data).await?)?;
        }
        Commands::Dispatch {
            worker,
            action,
            data,
        } => {
            let data = input::record(data.as_deref())?;
            print(&orchestrator.dispatch_single(&worker, &action, data).await)?;
        }
    }

    Ok(())
}
