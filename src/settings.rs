//! Settings collaborator loaded from a TOML file.
//!
//! The file is named either by the `--settings` flag or by the
//! `TASK_DISPATCHER_SETTINGS` environment variable; having neither is a
//! fatal configuration error, raised before any subcommand logic runs.
//!
//! ```toml
//! [[run_at_startup]]
//! name = "app::jobs::refresh"
//! args = [1, 2]
//!
//! [run_at_startup.kwargs]
//! force = true
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, DispatchResult};
use crate::task::{TaskArgs, TaskKwargs};

/// Environment variable naming the settings file
pub const SETTINGS_ENV_VAR: &str = "TASK_DISPATCHER_SETTINGS";

/// One task to submit when the scheduler process starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupTask {
    /// Canonical task name, resolved against the task directory
    pub name: String,
    /// Positional arguments of the submission
    #[serde(default)]
    pub args: TaskArgs,
    /// Keyword arguments of the submission
    #[serde(default)]
    pub kwargs: TaskKwargs,
}

/// Process settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Tasks the scheduler submits before its run loop starts
    #[serde(default)]
    pub run_at_startup: Vec<StartupTask>,
}

impl Settings {
    /// Load settings from the explicit path, or from the path named by
    /// `TASK_DISPATCHER_SETTINGS`
    pub fn load(explicit: Option<&Path>) -> DispatchResult<Self> {
        let path = resolve_path(explicit, env::var(SETTINGS_ENV_VAR).ok())?;
        Self::from_path(&path)
    }

    /// Load settings from a TOML file
    pub fn from_path(path: &Path) -> DispatchResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::improperly_configured(format!(
                "cannot read settings file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&contents)
    }

    /// Parse settings from a TOML document
    pub fn from_toml(contents: &str) -> DispatchResult<Self> {
        toml::from_str(contents)
            .map_err(|e| DispatchError::improperly_configured(format!("invalid settings: {e}")))
    }
}

fn resolve_path(explicit: Option<&Path>, env_value: Option<String>) -> DispatchResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match env_value.filter(|value| !value.is_empty()) {
        Some(value) => Ok(PathBuf::from(value)),
        None => Err(DispatchError::improperly_configured(format!(
            "no settings file given; pass --settings or set {SETTINGS_ENV_VAR}"
        ))),
    }
}
