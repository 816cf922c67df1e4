//! Stately: a resumable states-language interpreter
//!
//! Stately runs workflows written in a JSON states language (Task, Succeed
//! and Fail states with `Catch` clauses) across many short-lived
//! invocations. An executor never blocks on a task. It hands the task to a
//! dispatcher together with an exported [`Context`] and stops; whoever
//! finishes the work rebuilds an executor from that context and reports the
//! outcome.
//!
//! # Core Concepts
//!
//! - **Definition**: an immutable [`StateMachine`], content-addressed by hash
//! - **Execution**: a pointer to the current state or a terminal result
//! - **Components**: pluggable stores, loggers and dispatchers behind traits
//! - **Context**: a flat, namespaced JSON map carrying everything needed to resume
//!
//! # Example
//!
//! ```rust
//! use stately::{DispatchOutcome, Executor, StateMachine, Status};
//! use stately::local::LocalComponents;
//! use serde_json::json;
//!
//! let definition: StateMachine = r#"{
//!     "StartAt": "Fetch",
//!     "States": {
//!         "Fetch": {"Type": "Task", "Resource": "fetch", "Next": "Done"},
//!         "Done": {"Type": "Succeed"}
//!     }
//! }"#
//! .parse()
//! .unwrap();
//!
//! let local = LocalComponents::new();
//! let mut executor = Executor::create(&definition, local.components()).unwrap();
//! let outcome = executor.dispatch(json!({"url": "https://example.com"})).unwrap();
//! assert!(matches!(outcome, DispatchOutcome::Suspended { .. }));
//!
//! // A worker picks the task up, possibly in another process.
//! let task = local.dispatcher().take_next().unwrap();
//! let mut worker = Executor::hydrate(&task.context, local.components()).unwrap();
//! let outcome = worker
//!     .run_task(|| Ok::<_, String>(json!({"status": 200})), |e| e.clone())
//!     .unwrap();
//!
//! assert_eq!(outcome.result().map(|r| r.status), Some(Status::Succeeded));
//! ```

pub mod builder;
pub mod components;
pub mod context;
pub mod definition;
pub mod execution;
pub mod executor;
pub mod local;

// Re-export commonly used types
pub use builder::{BuildError, ComponentsBuilder};
pub use components::{ComponentError, Components};
pub use context::{Context, ContextError, ContextSlice};
pub use definition::{Catcher, ParseError, State, StateMachine};
pub use execution::{ExecutionResult, ExecutionState, Status};
pub use executor::{DispatchOutcome, Executor, ExecutorError};
