//! Startup reconciliation for the scheduler process.
//!
//! Run once when a scheduler starts, before its run loop: invocations of the
//! configured startup tasks left over from a previous run are revoked, then
//! each startup task is submitted fresh. Without the revocation pass, every
//! scheduler restart would stack another pending copy of the same tasks.

use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::backend::{TaskBackend, WorkerSnapshot};
use crate::error::DispatchResult;
use crate::registry::TaskRegistry;
use crate::settings::StartupTask;

/// Revoke stale invocations of the configured startup tasks, then submit
/// each of them with its configured payload.
///
/// Startup task names are resolved against the directory; a name that does
/// not resolve is logged at error level and skipped, without aborting the
/// remaining tasks. Backend errors propagate.
pub async fn reconcile(
    backend: &dyn TaskBackend,
    registry: &TaskRegistry,
    startup_tasks: &[StartupTask],
) -> DispatchResult<()> {
    if startup_tasks.is_empty() {
        debug!("no startup tasks configured");
        return Ok(());
    }

    let names: HashSet<&str> = startup_tasks.iter().map(|t| t.name.as_str()).collect();
    let snapshots = [
        backend.scheduled().await?,
        backend.active().await?,
        backend.reserved().await?,
    ];
    let stale = stale_invocations(&snapshots, &names);
    if !stale.is_empty() {
        info!(count = stale.len(), "revoking stale startup task invocations");
        backend.revoke(&stale).await?;
    }

    for task in startup_tasks {
        match registry.resolve(&task.name) {
            Some(descriptor) => {
                let id = descriptor
                    .enqueue(task.args.clone(), task.kwargs.clone())
                    .await?;
                debug!(task = %task.name, id = %id, "submitted startup task");
            }
            None => {
                error!(task = %task.name, "startup task is not registered; skipping");
            }
        }
    }
    Ok(())
}

/// Invocation ids across all snapshots whose task name is in the startup set
fn stale_invocations(snapshots: &[WorkerSnapshot], names: &HashSet<&str>) -> Vec<String> {
    let mut ids = Vec::new();
    for snapshot in snapshots {
        for instances in snapshot.values() {
            for instance in instances {
                if names.contains(instance.name.as_str()) {
                    ids.push(instance.id.clone());
                }
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TaskInstance;
    use crate::descriptor::TaskBinder;
    use crate::test_helpers::{RecordingBackend, RecordingHandler};
    use serde_json::json;

    fn startup(name: &str, args: Vec<serde_json::Value>) -> StartupTask {
        StartupTask {
            name: name.to_string(),
            args,
            kwargs: [("x".to_string(), json!(1))].into_iter().collect(),
        }
    }

    #[test]
    fn stale_ids_match_startup_names_only() {
        let names: HashSet<&str> = ["foo::bar"].into_iter().collect();
        let snapshot = WorkerSnapshot::from([(
            "workerA".to_string(),
            vec![
                TaskInstance::new("abc", "foo::bar"),
                TaskInstance::new("def", "other::task"),
            ],
        )]);

        let stale = stale_invocations(&[snapshot], &names);
        assert_eq!(stale, vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn revokes_stale_invocations_and_resubmits() {
        let backend = RecordingBackend::new();
        let mut registry = TaskRegistry::new();
        TaskBinder::producer()
            .bind(RecordingHandler::arc("foo::bar"), &backend, &mut registry)
            .expect("bind");

        backend.set_scheduled(WorkerSnapshot::from([(
            "workerA".to_string(),
            vec![TaskInstance::new("abc", "foo::bar")],
        )]));

        let tasks = vec![startup("foo::bar", vec![json!(1), json!(2)])];
        reconcile(&backend, &registry, &tasks).await.expect("reconcile");

        let revoked = backend.state.revoked.lock().unwrap();
        assert_eq!(*revoked, vec![vec!["abc".to_string()]]);

        let enqueued = backend.state.enqueued.lock().unwrap();
        assert_eq!(enqueued.len(), 1);
        let (name, args, kwargs) = &enqueued[0];
        assert_eq!(name, "foo::bar");
        assert_eq!(*args, vec![json!(1), json!(2)]);
        assert_eq!(kwargs.get("x"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn unresolved_startup_task_does_not_block_the_rest() {
        let backend = RecordingBackend::new();
        let mut registry = TaskRegistry::new();
        TaskBinder::consumer()
            .bind(RecordingHandler::arc("app::known"), &backend, &mut registry)
            .expect("bind");

        let tasks = vec![
            startup("app::vanished", vec![]),
            startup("app::known", vec![json!("ok")]),
        ];
        reconcile(&backend, &registry, &tasks).await.expect("reconcile");

        let enqueued = backend.state.enqueued.lock().unwrap();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].0, "app::known");

        // Nothing was pending, so nothing was revoked.
        assert!(backend.state.revoked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn active_and_reserved_snapshots_are_considered() {
        let backend = RecordingBackend::new();
        let mut registry = TaskRegistry::new();
        TaskBinder::producer()
            .bind(RecordingHandler::arc("foo::bar"), &backend, &mut registry)
            .expect("bind");

        backend.set_active(WorkerSnapshot::from([(
            "workerA".to_string(),
            vec![TaskInstance::new("id-1", "foo::bar")],
        )]));
        backend.set_reserved(WorkerSnapshot::from([(
            "workerB".to_string(),
            vec![TaskInstance::new("id-2", "foo::bar")],
        )]));

        let tasks = vec![startup("foo::bar", vec![])];
        reconcile(&backend, &registry, &tasks).await.expect("reconcile");

        let revoked = backend.state.revoked.lock().unwrap();
        assert_eq!(revoked.len(), 1);
        let mut ids = revoked[0].clone();
        ids.sort();
        assert_eq!(ids, vec!["id-1".to_string(), "id-2".to_string()]);
    }
}
