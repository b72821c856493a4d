//! Error types for the task dispatcher

use thiserror::Error;

/// Result type alias for dispatcher operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Error types for registration, binding and dispatch
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A task name collided with an existing entry in its partition
    #[error("task '{name}' is already registered")]
    DuplicateTask { name: String },

    /// An unbound binder was invoked with an execution payload
    #[error("task binder is not initialized: {message}")]
    NotInitialized { message: String },

    /// Backend task access on a binder that has not been bound yet
    #[error("task binder has no backend task: {attribute} is unavailable")]
    Unbound { attribute: String },

    /// Submission referenced a task name the backend does not know
    #[error("unknown task: {name}")]
    UnknownTask { name: String },

    /// Required settings or environment are absent or invalid
    #[error("improperly configured: {message}")]
    ImproperlyConfigured { message: String },

    /// Task execution errors surfaced by a backend task
    #[error("task execution failed: {message}")]
    TaskExecution { message: String },

    /// Errors reported by the task execution backend
    #[error("backend error: {message}")]
    Backend { message: String },

    /// Payload or report serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML rendering errors from the directory exporter
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic errors for wrapping other error types
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Create a duplicate task error
    pub fn duplicate_task<S: Into<String>>(name: S) -> Self {
        Self::DuplicateTask { name: name.into() }
    }

    /// Create a not-initialized error
    pub fn not_initialized<S: Into<String>>(message: S) -> Self {
        Self::NotInitialized {
            message: message.into(),
        }
    }

    /// Create an unbound-access error
    pub fn unbound<S: Into<String>>(attribute: S) -> Self {
        Self::Unbound {
            attribute: attribute.into(),
        }
    }

    /// Create an unknown task error
    pub fn unknown_task<S: Into<String>>(name: S) -> Self {
        Self::UnknownTask { name: name.into() }
    }

    /// Create a configuration error
    pub fn improperly_configured<S: Into<String>>(message: S) -> Self {
        Self::ImproperlyConfigured {
            message: message.into(),
        }
    }

    /// Create a task execution error
    pub fn task_execution<S: Into<String>>(message: S) -> Self {
        Self::TaskExecution {
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
