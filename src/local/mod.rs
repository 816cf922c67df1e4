//! In-memory components for tests, demos and single-process use.
//!
//! None of these are durable. They implement the component traits so the
//! executor can be driven end to end without any external service:
//!
//! - [`LocalDefinitionStore`] / [`CachingDefinitionStore`] with an explicit
//!   [`DefinitionCache`]
//! - [`ContextExecutionStore`] and [`CentralExecutionStore`]
//! - [`LocalLoggerFactory`] writing into a [`LogSink`]
//! - [`QueueTaskDispatcher`] emulating asynchronous workers
//!
//! # Example
//!
//! ```rust
//! use stately::definition::StateMachine;
//! use stately::executor::{DispatchOutcome, Executor};
//! use stately::local::LocalComponents;
//! use serde_json::json;
//!
//! let definition = StateMachine::from_representation(json!({
//!     "StartAt": "Double",
//!     "States": {"Double": {"Type": "Task", "Resource": "double", "End": true}}
//! }))
//! .unwrap();
//!
//! let local = LocalComponents::new();
//! let mut executor = Executor::create(&definition, local.components()).unwrap();
//! executor.dispatch(json!({"n": 21})).unwrap();
//!
//! let outcome = local
//!     .dispatcher()
//!     .run_next(
//!         &local.components(),
//!         |_resource, input| Ok::<_, String>(json!({"n": input["n"].as_i64().unwrap_or(0) * 2})),
//!         |_err| "States.TaskFailed".to_string(),
//!     )
//!     .unwrap();
//!
//! let result = outcome.as_ref().and_then(DispatchOutcome::result).unwrap();
//! assert_eq!(result.output, Some(json!({"n": 42})));
//! ```

mod definitions;
mod dispatch;
mod executions;
mod logging;

pub use definitions::{CachingDefinitionStore, DefinitionCache, LocalDefinitionStore};
pub use dispatch::{QueueTaskDispatcher, QueuedTask};
pub use executions::{CentralExecutionStore, ContextExecutionStore, ExecutionRecord};
pub use logging::{LocalLogger, LocalLoggerFactory, LogLine, LogSink};

use crate::builder::ComponentsBuilder;
use crate::components::Components;
use std::sync::Arc;

/// Pre-wired local components, with handles for inspecting them.
#[derive(Clone)]
pub struct LocalComponents {
    components: Components,
    definitions: Arc<LocalDefinitionStore>,
    dispatcher: Arc<QueueTaskDispatcher>,
    logs: LogSink,
    central: Option<CentralExecutionStore>,
}

impl LocalComponents {
    /// Components whose execution state travels in the context.
    pub fn new() -> Self {
        Self::wire(None)
    }

    /// Components whose execution state lives in a shared table.
    pub fn central() -> Self {
        Self::wire(Some(CentralExecutionStore::new()))
    }

    fn wire(central: Option<CentralExecutionStore>) -> Self {
        let definitions = Arc::new(LocalDefinitionStore::new());
        let dispatcher = Arc::new(QueueTaskDispatcher::new());
        let logs = LogSink::new();

        let builder = ComponentsBuilder::new()
            .definition_store(definitions.clone())
            .logger_factory(Arc::new(LocalLoggerFactory::new(logs.clone())))
            .task_dispatcher(dispatcher.clone());
        let builder = match &central {
            Some(store) => builder.execution_store(Arc::new(store.clone())),
            None => builder.execution_store(Arc::new(ContextExecutionStore::new())),
        };

        Self {
            components: builder
                .build()
                .expect("Local components are always fully wired"),
            definitions,
            dispatcher,
            logs,
            central,
        }
    }

    /// A bundle sharing these components, ready to hand to an executor.
    pub fn components(&self) -> Components {
        self.components.clone()
    }

    pub fn definitions(&self) -> &LocalDefinitionStore {
        &self.definitions
    }

    pub fn dispatcher(&self) -> &QueueTaskDispatcher {
        &self.dispatcher
    }

    pub fn logs(&self) -> &LogSink {
        &self.logs
    }

    /// The shared table, when built with [`LocalComponents::central`].
    pub fn central_store(&self) -> Option<&CentralExecutionStore> {
        self.central.as_ref()
    }
}

impl Default for LocalComponents {
    fn default() -> Self {
        Self::new()
    }
}
