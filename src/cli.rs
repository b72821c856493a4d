//! Command line interface for the dispatcher processes.
//!
//! The subcommand logic lives here so embedding applications can wire their
//! own binary: build a registry, bind tasks, pick a backend, then hand
//! control to [`run`]. The reference binary does exactly that with the
//! in-process backend.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::backend::TaskBackend;
use crate::error::DispatchResult;
use crate::reconciler::reconcile;
use crate::registry::TaskRegistry;
use crate::settings::Settings;
use crate::task::TaskKind;

/// Entry point for running producer, consumer and scheduler processes along
/// with some other utilities
#[derive(Debug, Parser)]
#[command(
    name = "task-dispatcher",
    version,
    about = "Run producer, consumer and scheduler processes and inspect registered tasks"
)]
pub struct Cli {
    /// Settings file; defaults to the TASK_DISPATCHER_SETTINGS environment
    /// variable
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a consumer worker
    Consumer(WorkerArgs),
    /// Run a producer worker
    Producer(WorkerArgs),
    /// Run the task scheduler
    Scheduler,
    /// Show registered tasks
    Show(ShowArgs),
}

/// Arguments forwarded to the backend worker
#[derive(Debug, Default, Args)]
pub struct WorkerArgs {
    /// Queues to consume from; defaults to the subcommand's own queue
    #[arg(short, long)]
    pub queues: Vec<String>,

    /// Worker hostname; defaults to `<kind>@<host>`
    #[arg(long)]
    pub hostname: Option<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub format: ShowFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    Json,
    Yaml,
}

/// Load settings, then dispatch the selected subcommand.
///
/// Returns the process exit code. Missing settings surface as
/// [`crate::DispatchError::ImproperlyConfigured`] before any subcommand
/// logic runs.
pub async fn run(
    cli: Cli,
    registry: &TaskRegistry,
    backend: &dyn TaskBackend,
) -> DispatchResult<i32> {
    let settings = Settings::load(cli.settings.as_deref())?;
    execute(cli.command, &settings, registry, backend).await
}

/// Dispatch a subcommand against already-loaded settings
pub async fn execute(
    command: Command,
    settings: &Settings,
    registry: &TaskRegistry,
    backend: &dyn TaskBackend,
) -> DispatchResult<i32> {
    match command {
        Command::Consumer(args) => run_worker(backend, TaskKind::Consumer, args).await,
        Command::Producer(args) => run_worker(backend, TaskKind::Producer, args).await,
        Command::Scheduler => {
            reconcile(backend, registry, &settings.run_at_startup).await?;
            backend.start_beat().await?;
            Ok(0)
        }
        Command::Show(args) => {
            let report = match args.format {
                ShowFormat::Json => registry.to_json()?,
                ShowFormat::Yaml => registry.to_yaml()?,
            };
            println!("{report}");
            Ok(0)
        }
    }
}

async fn run_worker(
    backend: &dyn TaskBackend,
    kind: TaskKind,
    args: WorkerArgs,
) -> DispatchResult<i32> {
    let queues = if args.queues.is_empty() {
        vec![kind.default_queue().to_string()]
    } else {
        args.queues
    };
    let hostname = args
        .hostname
        .unwrap_or_else(|| format!("{kind}@{}", default_host()));
    info!(%hostname, queues = ?queues, "starting {kind} worker");
    backend.start_worker(&queues, &hostname).await
}

fn default_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}
