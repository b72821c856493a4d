//! Task directory: the partitioned register of producer and consumer tasks

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::TaskDescriptor;
use crate::error::{DispatchError, DispatchResult};
use crate::task::TaskKind;

/// Placeholder description for tasks without one
const NO_DESCRIPTION: &str = "Description not found";

/// Insertion-ordered, duplicate-rejecting name → descriptor mapping.
///
/// A name can be inserted once; the partition is additive for the process
/// lifetime.
#[derive(Debug, Default)]
pub struct Partition {
    order: Vec<String>,
    tasks: HashMap<String, Arc<TaskDescriptor>>,
}

impl Partition {
    /// Look a descriptor up by canonical name
    pub fn get(&self, name: &str) -> Option<&Arc<TaskDescriptor>> {
        self.tasks.get(name)
    }

    /// Whether the partition holds the given name
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate descriptors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TaskDescriptor>> {
        self.order.iter().map(move |name| &self.tasks[name.as_str()])
    }

    fn insert(&mut self, descriptor: Arc<TaskDescriptor>) -> DispatchResult<()> {
        let name = descriptor.name().to_string();
        if self.tasks.contains_key(&name) {
            return Err(DispatchError::duplicate_task(name));
        }
        self.order.push(name.clone());
        self.tasks.insert(name, descriptor);
        Ok(())
    }
}

/// The process-wide task directory.
///
/// Built once at process bootstrap and passed by reference to whatever
/// registers tasks or reads them back; registration happens during
/// sequential startup, so no interior locking is needed.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    producers: Partition,
    consumers: Partition,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bound descriptor into the partition matching its kind.
    ///
    /// Fails with [`DispatchError::DuplicateTask`] if the name is already
    /// taken in that partition. The producer and consumer partitions are
    /// independent namespaces.
    pub fn register(&mut self, descriptor: Arc<TaskDescriptor>) -> DispatchResult<()> {
        match descriptor.kind() {
            TaskKind::Producer => self.producers.insert(descriptor),
            TaskKind::Consumer => self.consumers.insert(descriptor),
        }
    }

    /// Read-only view of the producer partition
    pub fn producers(&self) -> &Partition {
        &self.producers
    }

    /// Read-only view of the consumer partition
    pub fn consumers(&self) -> &Partition {
        &self.consumers
    }

    /// Resolve a canonical task name across both partitions, producers first
    pub fn resolve(&self, name: &str) -> Option<&Arc<TaskDescriptor>> {
        self.producers.get(name).or_else(|| self.consumers.get(name))
    }

    /// Build the structured directory report, consumers before producers
    pub fn to_report(&self) -> DirectoryReport {
        DirectoryReport {
            consumers: partition_report(&self.consumers),
            producers: partition_report(&self.producers),
        }
    }

    /// Render the directory report as JSON
    pub fn to_json(&self) -> DispatchResult<String> {
        Ok(serde_json::to_string(&self.to_report())?)
    }

    /// Render the directory report as block-style YAML
    pub fn to_yaml(&self) -> DispatchResult<String> {
        Ok(serde_yaml::to_string(&self.to_report())?)
    }
}

/// Report entry for one registered task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Task description, or a placeholder when none is known
    pub description: String,
    /// Module path of the handler
    pub module: String,
    /// Qualified name of the handler (not the directory key)
    pub name: String,
}

/// Structured export of the whole directory.
///
/// Field order is fixed (consumers, then producers) and entries are emitted
/// in sorted name order, so repeated exports are byte-stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryReport {
    pub consumers: BTreeMap<String, TaskReport>,
    pub producers: BTreeMap<String, TaskReport>,
}

fn partition_report(partition: &Partition) -> BTreeMap<String, TaskReport> {
    partition
        .iter()
        .map(|descriptor| {
            (
                descriptor.name().to_string(),
                TaskReport {
                    description: descriptor
                        .description()
                        .unwrap_or(NO_DESCRIPTION)
                        .to_string(),
                    module: descriptor.module().to_string(),
                    name: descriptor.qualname().to_string(),
                },
            )
        })
        .collect()
}
