//! Component error types.

use thiserror::Error;

/// Errors reported by storage and dispatch components
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComponentError {
    /// No entity with this id exists in the backing store
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// The execution was used before `initialize` or `import_context`
    #[error("Execution '{0}' has not been initialized")]
    NotInitialized(String),

    /// Carried data was updated while no state is in flight
    #[error("Execution '{0}' has no state in flight")]
    NoStateInFlight(String),

    /// The backing store failed
    #[error("Storage failure: {0}")]
    Storage(String),

    /// The dispatch transport failed to hand off the task
    #[error("Dispatch of '{resource}' failed: {reason}")]
    Dispatch { resource: String, reason: String },
}
