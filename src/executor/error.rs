//! Executor error types.

use crate::components::ComponentError;
use crate::context::ContextError;
use crate::execution::Status;
use thiserror::Error;

/// Errors that abort an executor operation.
///
/// Task failures are not among them: those resolve through the Catch
/// protocol into a new state or a `FAILED` result.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Context(#[from] ContextError),

    /// The execution points at a state the definition does not contain
    #[error("State '{0}' does not exist in the definition")]
    UnknownState(String),

    /// `run_task` was called while the current state is not a Task
    #[error("State '{name}' is a {kind} state, not a Task")]
    NotAtTask { name: String, kind: &'static str },

    /// `run_task` was called before anything was dispatched
    #[error("No task is in flight")]
    NoTaskInFlight,

    /// `run_task` was called on an execution that already ended
    #[error("Execution already finished with status {0}")]
    AlreadyFinished(Status),
}
