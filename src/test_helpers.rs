//! Recording doubles shared by the in-crate tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{BackendTask, TaskBackend, WorkerSnapshot};
use crate::error::DispatchResult;
use crate::task::{TaskArgs, TaskHandler, TaskKwargs, TaskOptions};

/// Everything the recording backend has observed
#[derive(Default)]
pub(crate) struct RecordingState {
    /// Options of every `create_task` call, in order
    pub created: Mutex<Vec<TaskOptions>>,
    /// `(task name, args, kwargs)` of every in-place invocation
    pub invocations: Mutex<Vec<(String, TaskArgs, TaskKwargs)>>,
    /// `(task name, args, kwargs)` of every enqueue/submit
    pub enqueued: Mutex<Vec<(String, TaskArgs, TaskKwargs)>>,
    /// Id batches passed to `revoke`
    pub revoked: Mutex<Vec<Vec<String>>>,
    /// `(queues, hostname)` of every worker start
    pub workers: Mutex<Vec<(Vec<String>, String)>>,
    /// Number of beat loop starts
    pub beats: Mutex<usize>,
    /// Scripted inspection snapshots
    pub scheduled: Mutex<WorkerSnapshot>,
    pub active: Mutex<WorkerSnapshot>,
    pub reserved: Mutex<WorkerSnapshot>,
}

/// Task execution backend double that records every call
#[derive(Default)]
pub(crate) struct RecordingBackend {
    pub state: Arc<RecordingState>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scheduled(&self, snapshot: WorkerSnapshot) {
        *self.state.scheduled.lock().unwrap() = snapshot;
    }

    pub fn set_active(&self, snapshot: WorkerSnapshot) {
        *self.state.active.lock().unwrap() = snapshot;
    }

    pub fn set_reserved(&self, snapshot: WorkerSnapshot) {
        *self.state.reserved.lock().unwrap() = snapshot;
    }
}

struct RecordingTask {
    name: String,
    queue: String,
    handler: Arc<dyn TaskHandler>,
    state: Arc<RecordingState>,
}

#[async_trait]
impl BackendTask for RecordingTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn queue(&self) -> &str {
        &self.queue
    }

    async fn invoke(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<Value> {
        self.state
            .invocations
            .lock()
            .unwrap()
            .push((self.name.clone(), args.clone(), kwargs.clone()));
        self.handler.run(args, kwargs).await
    }

    async fn enqueue(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<String> {
        let mut enqueued = self.state.enqueued.lock().unwrap();
        enqueued.push((self.name.clone(), args, kwargs));
        Ok(format!("inv-{}", enqueued.len()))
    }
}

#[async_trait]
impl TaskBackend for RecordingBackend {
    fn create_task(
        &self,
        options: &TaskOptions,
        handler: Arc<dyn TaskHandler>,
    ) -> DispatchResult<Arc<dyn BackendTask>> {
        self.state.created.lock().unwrap().push(options.clone());
        Ok(Arc::new(RecordingTask {
            name: options
                .name
                .clone()
                .unwrap_or_else(|| handler.path().to_string()),
            queue: options.queue.clone().unwrap_or_else(|| "default".to_string()),
            handler,
            state: self.state.clone(),
        }))
    }

    async fn submit(
        &self,
        name: &str,
        args: TaskArgs,
        kwargs: TaskKwargs,
    ) -> DispatchResult<String> {
        let mut enqueued = self.state.enqueued.lock().unwrap();
        enqueued.push((name.to_string(), args, kwargs));
        Ok(format!("inv-{}", enqueued.len()))
    }

    async fn scheduled(&self) -> DispatchResult<WorkerSnapshot> {
        Ok(self.state.scheduled.lock().unwrap().clone())
    }

    async fn active(&self) -> DispatchResult<WorkerSnapshot> {
        Ok(self.state.active.lock().unwrap().clone())
    }

    async fn reserved(&self) -> DispatchResult<WorkerSnapshot> {
        Ok(self.state.reserved.lock().unwrap().clone())
    }

    async fn revoke(&self, ids: &[String]) -> DispatchResult<()> {
        self.state.revoked.lock().unwrap().push(ids.to_vec());
        Ok(())
    }

    async fn start_worker(&self, queues: &[String], hostname: &str) -> DispatchResult<i32> {
        self.state
            .workers
            .lock()
            .unwrap()
            .push((queues.to_vec(), hostname.to_string()));
        Ok(0)
    }

    async fn start_beat(&self) -> DispatchResult<()> {
        *self.state.beats.lock().unwrap() += 1;
        Ok(())
    }
}

/// Handler double that records its payloads and returns a fixed value
pub(crate) struct RecordingHandler {
    path: &'static str,
    doc: Option<&'static str>,
    pub calls: Mutex<Vec<(TaskArgs, TaskKwargs)>>,
}

impl RecordingHandler {
    pub fn arc(path: &'static str) -> Arc<Self> {
        Arc::new(Self {
            path,
            doc: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn arc_with_doc(path: &'static str, doc: &'static str) -> Arc<Self> {
        Arc::new(Self {
            path,
            doc: Some(doc),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    async fn run(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<Value> {
        self.calls.lock().unwrap().push((args, kwargs));
        Ok(Value::Null)
    }

    fn path(&self) -> &str {
        self.path
    }

    fn doc(&self) -> Option<&str> {
        self.doc
    }
}
