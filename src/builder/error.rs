//! Build errors for the component builder.

use thiserror::Error;

/// Errors that can occur when assembling [`Components`](crate::components::Components).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Definition store not specified. Call .definition_store(store) before .build()")]
    MissingDefinitionStore,

    #[error("Execution store not specified. Call .execution_store(store) before .build()")]
    MissingExecutionStore,

    #[error("Logger factory not specified. Call .logger_factory(factory) before .build()")]
    MissingLoggerFactory,

    #[error("Task dispatcher not specified. Call .task_dispatcher(dispatcher) before .build()")]
    MissingTaskDispatcher,
}
