//! Task vocabulary: kinds, options, metadata and the handler trait

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchResult;

/// Positional arguments of a task invocation
pub type TaskArgs = Vec<Value>;

/// Keyword arguments of a task invocation
pub type TaskKwargs = serde_json::Map<String, Value>;

/// The two disjoint kinds of task, distinguished only by default queue
/// and directory partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Tasks that emit work, bound to the `"producer"` queue by default
    Producer,
    /// Tasks that process work, bound to the `"consumer"` queue by default
    Consumer,
}

impl TaskKind {
    /// Default queue name for tasks of this kind
    pub fn default_queue(&self) -> &'static str {
        match self {
            TaskKind::Producer => "producer",
            TaskKind::Consumer => "consumer",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_queue())
    }
}

/// Options forwarded to the backend's task-creation call.
///
/// `name` and `queue` are interpreted by the binder (canonical name override
/// and queue routing); everything in `extra` is passed through verbatim for
/// the backend to interpret.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Explicit task name, overriding the handler-derived canonical name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Queue the task is routed to; the kind's default queue when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    /// Backend-specific options, forwarded untouched
    #[serde(default, flatten)]
    pub extra: TaskKwargs,
}

/// Introspection metadata copied from a handler onto its descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMeta {
    /// Canonical task name (directory key)
    pub name: String,
    /// Module path of the handler
    pub module: String,
    /// Qualified name of the handler within its module
    pub qualname: String,
    /// Human description; falls back to the handler's doc string
    pub description: Option<String>,
}

/// Split a handler path into its module and qualified name parts
pub(crate) fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once("::") {
        Some((module, qualname)) => (module, qualname),
        None => ("", path),
    }
}

/// A callable that can be bound to a backend task.
///
/// The canonical name of a task is derived from `path()`, which defaults to
/// the implementing type's own path. Implementors that wrap closures must
/// override it with something meaningful.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Execute the handler with the given payload
    async fn run(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<Value>;

    /// Full path of the handler, `<module>::<qualified name>`
    fn path(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Documentation string, used as the description fallback
    fn doc(&self) -> Option<&str> {
        None
    }
}

/// Future type returned by closure-backed handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = DispatchResult<Value>> + Send>>;

/// Adapter turning a plain async closure into a [`TaskHandler`].
///
/// ```rust,no_run
/// use task_dispatcher::FnHandler;
///
/// let handler = FnHandler::new("billing::charge", |args, _kwargs| {
///     Box::pin(async move { Ok(serde_json::json!(args.len())) })
/// })
/// .with_doc("Charge a customer");
/// ```
pub struct FnHandler {
    path: &'static str,
    doc: Option<&'static str>,
    func: Box<dyn Fn(TaskArgs, TaskKwargs) -> HandlerFuture + Send + Sync>,
}

impl FnHandler {
    /// Wrap a closure under an explicit handler path
    pub fn new<F>(path: &'static str, func: F) -> Self
    where
        F: Fn(TaskArgs, TaskKwargs) -> HandlerFuture + Send + Sync + 'static,
    {
        Self {
            path,
            doc: None,
            func: Box::new(func),
        }
    }

    /// Attach a documentation string
    pub fn with_doc(mut self, doc: &'static str) -> Self {
        self.doc = Some(doc);
        self
    }
}

#[async_trait]
impl TaskHandler for FnHandler {
    async fn run(&self, args: TaskArgs, kwargs: TaskKwargs) -> DispatchResult<Value> {
        (self.func)(args, kwargs).await
    }

    fn path(&self) -> &str {
        self.path
    }

    fn doc(&self) -> Option<&str> {
        self.doc
    }
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_queue_per_kind() {
        assert_eq!(TaskKind::Producer.default_queue(), "producer");
        assert_eq!(TaskKind::Consumer.default_queue(), "consumer");
    }

    #[test]
    fn split_path_on_last_separator() {
        assert_eq!(split_path("app::jobs::Charge"), ("app::jobs", "Charge"));
        assert_eq!(split_path("bare"), ("", "bare"));
    }

    #[test]
    fn fn_handler_runs_and_reports_metadata() {
        let handler = FnHandler::new("billing::charge", |args, kwargs| {
            Box::pin(async move { Ok(json!({ "args": args.len(), "kwargs": kwargs.len() })) })
        })
        .with_doc("Charge a customer");

        assert_eq!(handler.path(), "billing::charge");
        assert_eq!(handler.doc(), Some("Charge a customer"));

        let result = tokio_test::block_on(handler.run(vec![json!(1), json!(2)], TaskKwargs::new()))
            .expect("handler run");
        assert_eq!(result, json!({ "args": 2, "kwargs": 0 }));
    }

    #[test]
    fn struct_handlers_derive_their_path() {
        struct Noop;

        #[async_trait]
        impl TaskHandler for Noop {
            async fn run(&self, _args: TaskArgs, _kwargs: TaskKwargs) -> DispatchResult<Value> {
                Ok(Value::Null)
            }
        }

        let handler = Noop;
        assert!(handler.path().ends_with("Noop"));
        assert!(handler.doc().is_none());
    }
}
