//! In-process task execution backend.
//!
//! `LocalBackend` runs handlers directly in the current process: one pending
//! queue with queue-name routing, snapshot inspection and revocation by id.
//! It exists so the CLI, demos and tests work without external
//! infrastructure.
//!
//! Use it for a single process in development or tests. It is not a broker:
//! nothing is persisted, there is no retry or periodic schedule, and work is
//! lost on restart. Production deployments implement
//! [`TaskBackend`](crate::backend::TaskBackend) against their broker client.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::{BackendTask, TaskBackend, TaskInstance, WorkerSnapshot};
use crate::error::{DispatchError, DispatchResult};
use crate::task::{TaskArgs, TaskHandler, TaskKwargs, TaskOptions};

/// Worker key used in inspection snapshots
const LOCAL_WORKER: &str = "local";

/// Polling interval of the worker and beat loops in milliseconds
const POLL_INTERVAL_MS: u64 = 50;

/// One invocation waiting for a worker
struct QueuedInvocation {
    id: String,
    name: String,
    queue: String,
    args: TaskArgs,
    kwargs: TaskKwargs,
    enqueued_at: DateTime<Utc>,
}

/// State shared between the backend and the tasks it creates
#[derive(Default)]
struct Shared {
    pending: Mutex<VecDeque<QueuedInvocation>>,
    running: Mutex<HashMap<String, String>>,
    revoked: Mutex<HashSet<String>>,
    shutdown: AtomicBool,
}

impl Shared {
    fn enqueue(&self, name: &str, queue: &str, args: TaskArgs, kwargs: TaskKwargs) -> String {
        let id = Uuid::new_v4().to_string();
        let invocation = QueuedInvocation {
            id: id.clone(),
            name: name.to_string(),
            queue: queue.to_string(),
            args,
            kwargs,
            enqueued_at: Utc::now(),
        };
        self.pending
            .lock()
            .expect("pending lock poisoned")
            .push_back(invocation);
        debug!(task = name, id = %id, queue = queue, "queued invocation");
        id
    }
}

/// In-process backend task: invoking it runs the handler directly
struct LocalTask {
    name: String,
    queue: String,
    handler: Arc<dyn TaskHandler>,
    shared: Arc<Shared>,
}

#[async_trait]
impl BackendTask for LocalTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn queue(&self) -> &str {
        &self.queue
    }

    async fn invoke(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<Value> {
        self.handler.run(args, kwargs).await
    }

    async fn enqueue(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<String> {
        Ok(self.shared.enqueue(&self.name, &self.queue, args, kwargs))
    }
}

/// In-memory [`TaskBackend`] for development, demos and tests
#[derive(Default)]
pub struct LocalBackend {
    tasks: RwLock<HashMap<String, Arc<LocalTask>>>,
    shared: Arc<Shared>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask running worker and beat loops to stop
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
    }

    /// Process every queued invocation routed to the given queues.
    ///
    /// Returns the number of invocations executed. The worker loop drives
    /// this repeatedly; tests and demos can call it directly to run queued
    /// work to completion.
    pub async fn drain(&self, queues: &[String]) -> usize {
        let mut processed = 0;
        loop {
            let next = {
                let mut pending = self.shared.pending.lock().expect("pending lock poisoned");
                let index = pending
                    .iter()
                    .position(|invocation| queues.iter().any(|q| q == &invocation.queue));
                index.and_then(|index| pending.remove(index))
            };
            let Some(invocation) = next else { break };

            if self
                .shared
                .revoked
                .lock()
                .expect("revoked lock poisoned")
                .remove(&invocation.id)
            {
                debug!(id = %invocation.id, task = %invocation.name, "skipping revoked invocation");
                continue;
            }

            let task = self
                .tasks
                .read()
                .expect("tasks lock poisoned")
                .get(&invocation.name)
                .cloned();
            let Some(task) = task else {
                warn!(task = %invocation.name, "no task registered for queued invocation");
                continue;
            };

            let (id, name) = (invocation.id.clone(), invocation.name.clone());
            debug!(task = %name, id = %id, enqueued_at = %invocation.enqueued_at, "running invocation");
            self.shared
                .running
                .lock()
                .expect("running lock poisoned")
                .insert(id.clone(), name.clone());

            match task.handler.run(invocation.args, invocation.kwargs).await {
                Ok(_) => debug!(task = %name, id = %id, "invocation finished"),
                Err(e) => error!(task = %name, id = %id, "invocation failed: {e}"),
            }

            self.shared
                .running
                .lock()
                .expect("running lock poisoned")
                .remove(&id);
            processed += 1;
        }
        processed
    }
}

#[async_trait]
impl TaskBackend for LocalBackend {
    fn create_task(
        &self,
        options: &TaskOptions,
        handler: Arc<dyn TaskHandler>,
    ) -> DispatchResult<Arc<dyn BackendTask>> {
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| handler.path().to_string());
        let queue = options
            .queue
            .clone()
            .unwrap_or_else(|| "default".to_string());
        let task = Arc::new(LocalTask {
            name: name.clone(),
            queue,
            handler,
            shared: self.shared.clone(),
        });
        self.tasks
            .write()
            .expect("tasks lock poisoned")
            .insert(name, task.clone());
        Ok(task)
    }

    async fn submit(
        &self,
        name: &str,
        args: TaskArgs,
        kwargs: TaskKwargs,
    ) -> DispatchResult<String> {
        let task = self
            .tasks
            .read()
            .expect("tasks lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::unknown_task(name))?;
        task.enqueue(args, kwargs).await
    }

    /// The local backend has no deferred execution; nothing is ever
    /// scheduled for a future time.
    async fn scheduled(&self) -> DispatchResult<WorkerSnapshot> {
        Ok(WorkerSnapshot::new())
    }

    async fn active(&self) -> DispatchResult<WorkerSnapshot> {
        let running = self.shared.running.lock().expect("running lock poisoned");
        let instances = running
            .iter()
            .map(|(id, name)| TaskInstance::new(id.clone(), name.clone()))
            .collect();
        Ok(WorkerSnapshot::from([(LOCAL_WORKER.to_string(), instances)]))
    }

    async fn reserved(&self) -> DispatchResult<WorkerSnapshot> {
        let pending = self.shared.pending.lock().expect("pending lock poisoned");
        let instances = pending
            .iter()
            .map(|invocation| TaskInstance::new(invocation.id.clone(), invocation.name.clone()))
            .collect();
        Ok(WorkerSnapshot::from([(LOCAL_WORKER.to_string(), instances)]))
    }

    async fn revoke(&self, ids: &[String]) -> DispatchResult<()> {
        let mut pending = self.shared.pending.lock().expect("pending lock poisoned");
        let before = pending.len();
        pending.retain(|invocation| !ids.contains(&invocation.id));
        let dropped = before - pending.len();
        drop(pending);

        self.shared
            .revoked
            .lock()
            .expect("revoked lock poisoned")
            .extend(ids.iter().cloned());
        debug!(requested = ids.len(), dropped, "revoked invocations");
        Ok(())
    }

    async fn start_worker(&self, queues: &[String], hostname: &str) -> DispatchResult<i32> {
        info!(%hostname, queues = ?queues, "starting local worker");
        loop {
            if self.shared.shutdown.load(Ordering::SeqCst) {
                break;
            }
            self.drain(queues).await;
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
        info!(%hostname, "local worker stopped");
        Ok(0)
    }

    async fn start_beat(&self) -> DispatchResult<()> {
        info!("local beat running; it idles until shutdown");
        loop {
            if self.shared.shutdown.load(Ordering::SeqCst) {
                break;
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
        Ok(())
    }
}
