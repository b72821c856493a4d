//! # Task Dispatcher
//!
//! A thin registration and dispatch layer over a pluggable task execution
//! backend: mark handlers as producer or consumer tasks, collect them in a
//! process-wide directory, and run worker/scheduler processes bound to the
//! `"producer"` and `"consumer"` queues.
//!
//! ## Features
//!
//! - Producer/consumer task binding with duplicate-name protection
//! - Canonical task names derived from handler paths
//! - Directory export as JSON or YAML
//! - Startup reconciliation for scheduler restarts
//! - Narrow backend trait with an in-process implementation for development
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use task_dispatcher::{FnHandler, LocalBackend, TaskBinder, TaskRegistry};
//!
//! fn main() -> task_dispatcher::DispatchResult<()> {
//!     let mut registry = TaskRegistry::new();
//!     let backend = LocalBackend::new();
//!
//!     let generate = TaskBinder::producer()
//!         .description("Emit a batch of work items")
//!         .bind(
//!             Arc::new(FnHandler::new("app::generate", |_args, _kwargs| {
//!                 Box::pin(async move { Ok(serde_json::json!({ "items": 3 })) })
//!             })),
//!             &backend,
//!             &mut registry,
//!         )?;
//!
//!     println!("registered {}", generate.name());
//!     println!("{}", registry.to_yaml()?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod descriptor;
pub mod error;
pub mod local;
pub mod reconciler;
pub mod registry;
pub mod settings;
pub mod task;

#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use backend::{BackendTask, TaskBackend, TaskInstance, WorkerSnapshot};
pub use descriptor::{TaskBinder, TaskDescriptor};
pub use error::{DispatchError, DispatchResult};
pub use local::LocalBackend;
pub use reconciler::reconcile;
pub use registry::{DirectoryReport, Partition, TaskRegistry, TaskReport};
pub use settings::{Settings, StartupTask, SETTINGS_ENV_VAR};
pub use task::{
    FnHandler, HandlerFuture, TaskArgs, TaskHandler, TaskKind, TaskKwargs, TaskMeta, TaskOptions,
};

/// Version of the task dispatcher library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
