//! Task descriptors and the two-phase binder.
//!
//! A [`TaskBinder`] starts out *unbound*: it only carries a kind, an optional
//! description and backend task options. Binding a handler is the single
//! state transition; it derives the canonical task name, injects the kind's
//! default queue, asks the backend to create the task object, and registers
//! the resulting [`TaskDescriptor`] in the directory. The bound descriptor
//! forwards invocations to the backend task through the explicit
//! [`BackendTask`](crate::backend::BackendTask) interface.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tracing::debug;

use crate::backend::{BackendTask, TaskBackend};
use crate::error::{DispatchError, DispatchResult};
use crate::registry::TaskRegistry;
use crate::task::{split_path, TaskArgs, TaskHandler, TaskKind, TaskKwargs, TaskMeta, TaskOptions};

/// A registered task: handler metadata plus the backend task it forwards to.
///
/// Descriptors are created by [`TaskBinder::bind`] and live in the task
/// directory for the rest of the process.
pub struct TaskDescriptor {
    kind: TaskKind,
    meta: TaskMeta,
    backend_task: Arc<dyn BackendTask>,
    owner: Mutex<Option<Weak<Value>>>,
}

impl TaskDescriptor {
    /// Directory partition this descriptor belongs to
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Canonical task name (the directory key)
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Module path of the wrapped handler
    pub fn module(&self) -> &str {
        &self.meta.module
    }

    /// Qualified name of the wrapped handler
    pub fn qualname(&self) -> &str {
        &self.meta.qualname
    }

    /// Explicit description, or the handler's doc string
    pub fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    /// Queue the task is routed to
    pub fn queue(&self) -> &str {
        self.backend_task.queue()
    }

    /// The backend task this descriptor forwards to
    pub fn backend_task(&self) -> &Arc<dyn BackendTask> {
        &self.backend_task
    }

    /// Attach the instance this task is a method of.
    ///
    /// The instance's value is prepended as the leading positional argument
    /// on every subsequent invocation. Only a weak reference is held, so the
    /// descriptor never extends the instance's lifetime. Attaching is
    /// idempotent; attaching a different instance replaces the previous one.
    pub fn attach_instance(&self, instance: &Arc<Value>) {
        let mut owner = self.owner.lock().expect("owner lock poisoned");
        *owner = Some(Arc::downgrade(instance));
    }

    /// The currently attached instance, if it is still alive
    pub fn owning_instance(&self) -> Option<Arc<Value>> {
        self.owner
            .lock()
            .expect("owner lock poisoned")
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn payload_args(&self, args: TaskArgs) -> TaskArgs {
        match self.owning_instance() {
            Some(instance) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push((*instance).clone());
                full.extend(args);
                full
            }
            None => args,
        }
    }

    /// Execute the backend task in place with the given payload
    pub async fn call(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<Value> {
        self.backend_task.invoke(self.payload_args(args), kwargs).await
    }

    /// Enqueue the backend task for asynchronous execution
    pub async fn enqueue(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<String> {
        self.backend_task.enqueue(self.payload_args(args), kwargs).await
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("kind", &self.kind)
            .field("name", &self.meta.name)
            .field("queue", &self.backend_task.queue())
            .finish()
    }
}

enum BinderState {
    Unbound { options: TaskOptions },
    Bound { descriptor: Arc<TaskDescriptor> },
}

/// Two-phase constructor for registered tasks.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use task_dispatcher::{FnHandler, LocalBackend, TaskBinder, TaskRegistry};
///
/// # fn main() -> task_dispatcher::DispatchResult<()> {
/// let mut registry = TaskRegistry::new();
/// let backend = LocalBackend::new();
///
/// // One-phase: handler known up front.
/// let charge = TaskBinder::consumer()
///     .description("Charge one customer")
///     .bind(
///         Arc::new(FnHandler::new("billing::charge", |_args, _kwargs| {
///             Box::pin(async move { Ok(serde_json::json!("charged")) })
///         })),
///         &backend,
///         &mut registry,
///     )?;
///
/// // Two-phase: collect options first, bind later.
/// let mut binder = TaskBinder::producer().queue("billing");
/// let emit = binder.bind(
///     Arc::new(FnHandler::new("billing::emit", |_args, _kwargs| {
///         Box::pin(async move { Ok(serde_json::json!(["invoice-1"])) })
///     })),
///     &backend,
///     &mut registry,
/// )?;
/// # let _ = (charge, emit);
/// # Ok(()) }
/// ```
pub struct TaskBinder {
    kind: TaskKind,
    description: Option<String>,
    state: BinderState,
}

impl TaskBinder {
    /// Create an unbound binder of the given kind
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            description: None,
            state: BinderState::Unbound {
                options: TaskOptions::default(),
            },
        }
    }

    /// Unbound binder for a producer task
    pub fn producer() -> Self {
        Self::new(TaskKind::Producer)
    }

    /// Unbound binder for a consumer task
    pub fn consumer() -> Self {
        Self::new(TaskKind::Consumer)
    }

    /// Set the task description
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Override the canonical task name. No effect once bound.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        if let BinderState::Unbound { options } = &mut self.state {
            options.name = Some(name.into());
        }
        self
    }

    /// Override the queue the task is routed to. No effect once bound.
    pub fn queue<S: Into<String>>(mut self, queue: S) -> Self {
        if let BinderState::Unbound { options } = &mut self.state {
            options.queue = Some(queue.into());
        }
        self
    }

    /// Set a backend-specific option, forwarded verbatim at task creation.
    /// No effect once bound.
    pub fn option<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        if let BinderState::Unbound { options } = &mut self.state {
            options.extra.insert(key.into(), value);
        }
        self
    }

    /// Whether the binder has been bound to a handler
    pub fn is_bound(&self) -> bool {
        matches!(self.state, BinderState::Bound { .. })
    }

    /// Bind the handler: the single transition from unbound to bound.
    ///
    /// Derives the canonical name (`<module>::<qualified name>` of the
    /// handler unless overridden), injects the kind's default queue when no
    /// queue option was given, creates the backend task, copies the
    /// handler's metadata onto the descriptor, and registers it in the
    /// directory. Registration happens here exactly once; a name collision
    /// surfaces as [`DispatchError::DuplicateTask`] and leaves the binder
    /// unbound.
    pub fn bind(
        &mut self,
        handler: Arc<dyn TaskHandler>,
        backend: &dyn TaskBackend,
        registry: &mut TaskRegistry,
    ) -> DispatchResult<Arc<TaskDescriptor>> {
        let mut options = match &self.state {
            BinderState::Bound { .. } => {
                return Err(DispatchError::not_initialized("binder is already bound"));
            }
            BinderState::Unbound { options } => options.clone(),
        };

        let name = options
            .name
            .clone()
            .unwrap_or_else(|| handler.path().to_string());
        options.name = Some(name.clone());
        if options.queue.is_none() {
            options.queue = Some(self.kind.default_queue().to_string());
        }

        let (module, qualname) = split_path(handler.path());
        let meta = TaskMeta {
            name: name.clone(),
            module: module.to_string(),
            qualname: qualname.to_string(),
            description: self
                .description
                .clone()
                .or_else(|| handler.doc().map(str::to_string)),
        };

        let backend_task = backend.create_task(&options, handler)?;
        let descriptor = Arc::new(TaskDescriptor {
            kind: self.kind,
            meta,
            backend_task,
            owner: Mutex::new(None),
        });

        registry.register(descriptor.clone())?;
        debug!(task = %name, kind = %self.kind, "bound and registered task");

        self.state = BinderState::Bound {
            descriptor: descriptor.clone(),
        };
        Ok(descriptor)
    }

    /// The bound descriptor; an error while unbound
    pub fn descriptor(&self) -> DispatchResult<&Arc<TaskDescriptor>> {
        match &self.state {
            BinderState::Bound { descriptor } => Ok(descriptor),
            BinderState::Unbound { .. } => Err(DispatchError::unbound("descriptor")),
        }
    }

    /// Invoke the bound task in place, forwarding the payload unchanged
    pub async fn call(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<Value> {
        match &self.state {
            BinderState::Bound { descriptor } => descriptor.call(args, kwargs).await,
            BinderState::Unbound { .. } => Err(DispatchError::not_initialized(
                "cannot invoke before a handler is bound",
            )),
        }
    }

    /// Enqueue the bound task for asynchronous execution
    pub async fn enqueue(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<String> {
        match &self.state {
            BinderState::Bound { descriptor } => descriptor.enqueue(args, kwargs).await,
            BinderState::Unbound { .. } => Err(DispatchError::not_initialized(
                "cannot enqueue before a handler is bound",
            )),
        }
    }
}

impl fmt::Debug for TaskBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            BinderState::Unbound { .. } => "unbound",
            BinderState::Bound { .. } => "bound",
        };
        f.debug_struct("TaskBinder")
            .field("kind", &self.kind)
            .field("state", &state)
            .finish()
    }
}
