//! Simulate a scheduler start: settings declare a startup task, the
//! reconciler revokes the stale pending copy and submits a fresh one.

use std::sync::Arc;

use serde_json::json;

use task_dispatcher::{
    reconcile, FnHandler, LocalBackend, Settings, TaskBinder, TaskKwargs, TaskRegistry,
};

const SETTINGS: &str = r#"
[[run_at_startup]]
name = "demo::refresh"
args = [42]

[run_at_startup.kwargs]
force = true
"#;

#[tokio::main]
async fn main() -> task_dispatcher::DispatchResult<()> {
    tracing_subscriber::fmt().init();

    let mut registry = TaskRegistry::new();
    let backend = LocalBackend::new();

    let refresh = TaskBinder::producer()
        .name("demo::refresh")
        .description("Refresh the derived caches")
        .bind(
            Arc::new(FnHandler::new("demo::refresh", |args, kwargs| {
                Box::pin(async move {
                    println!("refresh called with args={args:?} kwargs={kwargs:?}");
                    Ok(json!("refreshed"))
                })
            })),
            &backend,
            &mut registry,
        )?;

    // A stale invocation left over from a previous scheduler run.
    refresh.enqueue(vec![json!(1)], TaskKwargs::new()).await?;

    let settings = Settings::from_toml(SETTINGS)?;
    reconcile(&backend, &registry, &settings.run_at_startup).await?;

    // Only the fresh submission survives.
    backend.drain(&["producer".to_string()]).await;
    Ok(())
}
