//! Local Workflow
//!
//! This example runs a small thumbnail pipeline entirely in memory.
//!
//! Key concepts:
//! - Parsing a states-language definition
//! - Dispatching a task and stopping, instead of waiting for it
//! - A worker resuming the execution from the exported context only
//! - Catch clauses routing a failure to a recovery state
//!
//! Set RUST_LOG=stately=debug to see the executor's tracing events.
//!
//! Run with: cargo run --example local_workflow

use serde_json::{json, Value};
use stately::executor::{DispatchOutcome, Executor};
use stately::local::LocalComponents;
use stately::StateMachine;
use std::fmt;

const DEFINITION: &str = r#"{
    "Comment": "Make a thumbnail and tell someone about it",
    "StartAt": "Download",
    "States": {
        "Download": {"Type": "Task", "Resource": "download", "Next": "Resize"},
        "Resize": {
            "Type": "Task",
            "Resource": "resize",
            "Next": "Notify",
            "Catch": [{"ErrorEquals": ["ImageTooLarge"], "Next": "Rejected"}]
        },
        "Notify": {"Type": "Task", "Resource": "notify", "End": true},
        "Rejected": {"Type": "Fail", "Error": "Rejected", "Cause": "Image too large to resize"}
    }
}"#;

#[derive(Debug)]
enum WorkerError {
    ImageTooLarge(u64),
    Unknown(String),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageTooLarge(size) => write!(f, "image of {size} bytes is too large"),
            Self::Unknown(resource) => write!(f, "unknown resource {resource}"),
        }
    }
}

impl WorkerError {
    fn code(&self) -> String {
        match self {
            Self::ImageTooLarge(_) => "ImageTooLarge".to_string(),
            Self::Unknown(_) => "States.TaskFailed".to_string(),
        }
    }
}

// The "remote" functions a dispatcher would normally invoke.
fn run_resource(resource: &str, input: &Value) -> Result<Value, WorkerError> {
    match resource {
        "download" => {
            let size = input["size"].as_u64().unwrap_or(0);
            Ok(json!({"path": "/tmp/original.png", "size": size}))
        }
        "resize" => {
            let size = input["size"].as_u64().unwrap_or(0);
            if size > 10_000 {
                return Err(WorkerError::ImageTooLarge(size));
            }
            Ok(json!({"path": "/tmp/thumb.png"}))
        }
        "notify" => Ok(json!({"notified": input["path"]})),
        other => Err(WorkerError::Unknown(other.to_string())),
    }
}

fn run(size: u64) -> Result<(), Box<dyn std::error::Error>> {
    let definition: StateMachine = DEFINITION.parse()?;
    let local = LocalComponents::new();

    let mut executor = Executor::create(&definition, local.components())?;
    println!("Execution {} (image size {size})", executor.execution_id());

    let outcome = executor.dispatch(json!({"size": size}))?;
    if let DispatchOutcome::Suspended { state, resource } = &outcome {
        println!("  dispatched {resource} for {state}, executor exits");
    }

    // Each iteration plays a fresh worker invocation.
    let outcomes = local.dispatcher().run_until_idle(
        &local.components(),
        |resource, input| {
            println!("  [worker] running {resource} with {input}");
            run_resource(resource, input)
        },
        |err| {
            println!("  [worker] failed: {err}");
            err.code()
        },
        16,
    )?;

    match outcomes.last().and_then(DispatchOutcome::result) {
        Some(result) => println!(
            "  finished {} with {}",
            result.status,
            result.output.clone().unwrap_or(Value::Null)
        ),
        None => println!("  still running"),
    }

    println!("  log:");
    for line in local.logs().lines_for(executor.execution_id()) {
        println!("    #{} {}", line.sequence, line.message);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("=== Local Workflow ===\n");

    run(640)?;
    println!();
    run(50_000)?;

    Ok(())
}
