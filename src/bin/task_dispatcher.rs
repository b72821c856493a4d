//! Reference binary wiring the CLI to the in-process backend.
//!
//! Embedding applications usually write their own binary: build a registry,
//! bind their tasks, pick a backend, then call [`task_dispatcher::cli::run`].
//! This one ships with an empty registry and the local backend, which is
//! enough for `show` and for exercising the scheduler against settings.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use task_dispatcher::cli::{self, Cli};
use task_dispatcher::{LocalBackend, TaskRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let registry = TaskRegistry::new();
    let backend = LocalBackend::new();

    let exit_code = cli::run(cli, &registry, &backend).await?;
    std::process::exit(exit_code);
}
