//! Register a producer and a consumer, push work through the local backend
//! and print the task directory.

use std::sync::Arc;

use serde_json::json;

use task_dispatcher::{FnHandler, LocalBackend, TaskBinder, TaskKwargs, TaskRegistry};

#[tokio::main]
async fn main() -> task_dispatcher::DispatchResult<()> {
    tracing_subscriber::fmt().init();

    let mut registry = TaskRegistry::new();
    let backend = LocalBackend::new();

    let generate = TaskBinder::producer()
        .description("Emit a batch of greetings")
        .bind(
            Arc::new(FnHandler::new("demo::generate", |_args, _kwargs| {
                Box::pin(async move { Ok(json!(["hello", "world"])) })
            })),
            &backend,
            &mut registry,
        )?;

    let greet = TaskBinder::consumer()
        .description("Print one greeting")
        .bind(
            Arc::new(FnHandler::new("demo::greet", |args, _kwargs| {
                Box::pin(async move {
                    println!("greeting: {args:?}");
                    Ok(json!(null))
                })
            })),
            &backend,
            &mut registry,
        )?;

    generate.enqueue(vec![], TaskKwargs::new()).await?;
    greet.enqueue(vec![json!("hello")], TaskKwargs::new()).await?;
    greet.enqueue(vec![json!("world")], TaskKwargs::new()).await?;

    let processed = backend
        .drain(&["producer".to_string(), "consumer".to_string()])
        .await;
    println!("processed {processed} invocations");

    println!("{}", registry.to_yaml()?);
    Ok(())
}
