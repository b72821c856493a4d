//! Trait-based abstraction over the task execution backend.
//!
//! The dispatcher never talks to a broker directly. Everything it needs from
//! the underlying task-queue system goes through [`TaskBackend`], so
//! different implementations can be swapped per deployment:
//!
//! - **Development / tests**: [`crate::LocalBackend`] runs handlers in
//!   process with no external infrastructure.
//! - **Production**: implement [`TaskBackend`] against the broker client of
//!   your deployment.
//!
//! The surface is intentionally narrow: create a named task, submit by name,
//! inspect scheduled/active/reserved invocations per worker, revoke by id,
//! and run the blocking worker/beat loops.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchResult;
use crate::task::{TaskArgs, TaskHandler, TaskKwargs, TaskOptions};

/// A single task invocation known to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInstance {
    /// Backend-assigned invocation id
    pub id: String,
    /// Canonical name of the task being invoked
    pub name: String,
}

impl TaskInstance {
    pub fn new<S: Into<String>>(id: S, name: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Per-worker view of task invocations, keyed by worker hostname
pub type WorkerSnapshot = HashMap<String, Vec<TaskInstance>>;

/// A task object created by the backend and owned by a descriptor.
///
/// This is the explicit capability interface a bound descriptor forwards to;
/// backend-specific extras belong here, not behind reflection.
#[async_trait]
pub trait BackendTask: Send + Sync {
    /// Canonical task name the backend knows this task by
    fn name(&self) -> &str;

    /// Queue the task is routed to
    fn queue(&self) -> &str;

    /// Execute the task in place and return its result
    async fn invoke(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<Value>;

    /// Enqueue the task for asynchronous execution, returning the
    /// invocation id
    async fn enqueue(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<String>;
}

/// The external task execution backend collaborator.
///
/// Implementations are expected to be cheap to share (`Arc`) and safe to
/// call from multiple tasks. Fatal transport errors should be surfaced as
/// [`crate::DispatchError::Backend`]; the dispatcher does not retry.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Create a backend task for the given options and handler.
    ///
    /// Called once per descriptor, at the bind transition. `options.queue`
    /// is always populated by the binder before this call.
    fn create_task(
        &self,
        options: &TaskOptions,
        handler: Arc<dyn TaskHandler>,
    ) -> DispatchResult<Arc<dyn BackendTask>>;

    /// Fire-and-forget submission of a task by name
    async fn submit(&self, name: &str, args: TaskArgs, kwargs: TaskKwargs)
        -> DispatchResult<String>;

    /// Invocations scheduled for a future time, per worker
    async fn scheduled(&self) -> DispatchResult<WorkerSnapshot>;

    /// Invocations currently executing, per worker
    async fn active(&self) -> DispatchResult<WorkerSnapshot>;

    /// Invocations delivered to a worker but not yet started, per worker
    async fn reserved(&self) -> DispatchResult<WorkerSnapshot>;

    /// Revoke the given invocation ids. Revoking an id that is no longer
    /// pending is a no-op; an empty id list is valid.
    async fn revoke(&self, ids: &[String]) -> DispatchResult<()>;

    /// Run a blocking worker loop over the given queues.
    ///
    /// Returns the worker's exit code once it shuts down.
    async fn start_worker(&self, queues: &[String], hostname: &str) -> DispatchResult<i32>;

    /// Run the blocking beat/scheduler loop
    async fn start_beat(&self) -> DispatchResult<()>;
}
