//! Builder for wiring an executor's components.

use crate::builder::error::BuildError;
use crate::components::{Components, DefinitionStore, ExecutionStore, LoggerFactory, TaskDispatcher};
use std::sync::Arc;

/// Builder for [`Components`] with a fluent API.
///
/// Every collaborator is required. Each one is shared, so the same store
/// can back several bundles.
#[derive(Default)]
pub struct ComponentsBuilder {
    definitions: Option<Arc<dyn DefinitionStore>>,
    executions: Option<Arc<dyn ExecutionStore>>,
    loggers: Option<Arc<dyn LoggerFactory>>,
    dispatcher: Option<Arc<dyn TaskDispatcher>>,
}

impl ComponentsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the definition store (required).
    pub fn definition_store(mut self, store: Arc<dyn DefinitionStore>) -> Self {
        self.definitions = Some(store);
        self
    }

    /// Set the execution store (required).
    pub fn execution_store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.executions = Some(store);
        self
    }

    /// Set the logger factory (required).
    pub fn logger_factory(mut self, factory: Arc<dyn LoggerFactory>) -> Self {
        self.loggers = Some(factory);
        self
    }

    /// Set the task dispatcher (required).
    pub fn task_dispatcher(mut self, dispatcher: Arc<dyn TaskDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Build the bundle.
    /// Returns an error naming the first missing component.
    pub fn build(self) -> Result<Components, BuildError> {
        Ok(Components {
            definitions: self.definitions.ok_or(BuildError::MissingDefinitionStore)?,
            executions: self.executions.ok_or(BuildError::MissingExecutionStore)?,
            loggers: self.loggers.ok_or(BuildError::MissingLoggerFactory)?,
            dispatcher: self.dispatcher.ok_or(BuildError::MissingTaskDispatcher)?,
        })
    }
}

impl From<Components> for ComponentsBuilder {
    /// Start from an existing bundle, e.g. to swap out one component.
    fn from(components: Components) -> Self {
        Self {
            definitions: Some(components.definitions),
            executions: Some(components.executions),
            loggers: Some(components.loggers),
            dispatcher: Some(components.dispatcher),
        }
    }
}
