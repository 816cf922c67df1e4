//! Capability traits the executor needs from the outside world.
//!
//! The executor never builds a backend itself. It is handed a
//! [`Components`] bundle and talks to each collaborator only through
//! these traits:
//!
//! - [`DefinitionStore`]: content-addressed storage of definitions
//! - [`ExecutionStore`] / [`Execution`]: where an execution currently is
//! - [`LoggerFactory`] / [`Logger`]: the execution's own log stream
//! - [`TaskDispatcher`]: hands a task to an external worker
//!
//! Components that carry data across invocations implement
//! [`ContextComponent`]. Each owns one namespace of the context blob and
//! exports / imports a [`ContextSlice`] keyed relative to it.

use crate::context::{Context, ContextError, ContextSlice};
use crate::definition::StateMachine;
use crate::execution::{ExecutionResult, ExecutionState};
use serde_json::Value;
use std::sync::Arc;

pub mod error;

pub use error::ComponentError;

/// A component that contributes a namespaced slice to the context.
pub trait ContextComponent: Send + Sync {
    /// Namespace owned by this component.
    ///
    /// Must be non-empty and use only ASCII letters, digits or '_'.
    /// `executor` is reserved.
    fn namespace(&self) -> &'static str;

    /// Data needed to rebuild this component in another invocation.
    fn export_context(&self) -> Result<ContextSlice, ContextError>;
}

/// Content-addressed storage of state machine definitions.
pub trait DefinitionStore: ContextComponent {
    /// Store a definition under an id derived from its content.
    ///
    /// Storing the same definition twice yields the same id.
    fn put_anonymous(&self, definition: &StateMachine) -> Result<String, ComponentError>;

    /// Load a definition by id.
    fn hydrate_definition(&self, definition_id: &str) -> Result<Arc<StateMachine>, ComponentError>;

    /// Restore connection state (e.g. a storage location) from a context.
    ///
    /// Never touches stored definitions. Takes `&self` because the store is
    /// shared with the executions that resolve definitions through it.
    fn import_context(&self, slice: &ContextSlice) -> Result<(), ContextError>;
}

/// One execution's current state pointer or terminal result.
///
/// Implementations hold exactly one of the two: setting a result clears
/// the state.
pub trait Execution: ContextComponent {
    fn execution_id(&self) -> &str;

    /// Register the definition. Called exactly once, at creation.
    fn initialize(&mut self, definition: &StateMachine) -> Result<(), ComponentError>;

    fn definition(&self) -> Result<Arc<StateMachine>, ComponentError>;

    /// Move to a new state, replacing the current one.
    fn change_state(&mut self, name: &str, data: Option<Value>) -> Result<(), ComponentError>;

    /// Replace the data carried by the current state.
    fn update_state_data(&mut self, data: Value) -> Result<(), ComponentError>;

    /// Record the terminal result and clear the current state.
    fn set_result(&mut self, result: ExecutionResult) -> Result<(), ComponentError>;

    fn current_state_and_result(
        &self,
    ) -> Result<(Option<ExecutionState>, Option<ExecutionResult>), ComponentError>;

    fn import_context(&mut self, slice: &ContextSlice) -> Result<(), ContextError>;
}

/// Factory of [`Execution`] handles for a storage backend.
pub trait ExecutionStore: Send + Sync {
    fn execution(
        &self,
        execution_id: &str,
        definitions: Arc<dyn DefinitionStore>,
    ) -> Box<dyn Execution>;
}

/// Append-only log stream of one execution.
pub trait Logger: ContextComponent {
    /// Append a line. Best-effort: failures are swallowed by the implementation.
    fn log(&mut self, message: &str);

    fn import_context(&mut self, slice: &ContextSlice) -> Result<(), ContextError>;

    /// Default line layout: `[<last 4 of executor id>:<resource>] <state> <message>`.
    fn format(&self, executor_id: &str, resource: &str, state: &str, message: &str) -> String {
        let start = executor_id
            .char_indices()
            .rev()
            .nth(3)
            .map(|(index, _)| index)
            .unwrap_or(0);
        format!("[{}:{}] {} {}", &executor_id[start..], resource, state, message)
    }
}

pub trait LoggerFactory: Send + Sync {
    fn logger(&self, execution_id: &str, executor_id: &str) -> Box<dyn Logger>;
}

/// Hands a task to an external execution substrate.
pub trait TaskDispatcher: Send + Sync {
    /// Start `resource` asynchronously with `input`.
    ///
    /// Returns as soon as the work is handed off. The worker is expected to
    /// come back through `Executor::hydrate(context)` and `run_task`.
    fn dispatch(&self, resource: &str, input: &Value, context: Context) -> Result<(), ComponentError>;
}

/// The four collaborators an executor is composed from.
#[derive(Clone)]
pub struct Components {
    pub definitions: Arc<dyn DefinitionStore>,
    pub executions: Arc<dyn ExecutionStore>,
    pub loggers: Arc<dyn LoggerFactory>,
    pub dispatcher: Arc<dyn TaskDispatcher>,
}
