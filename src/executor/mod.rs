//! The interpreter.
//!
//! An [`Executor`] advances one execution through its definition. It keeps
//! nothing between invocations: everything it needs to continue lives in
//! the components and in the context it exports.
//!
//! # Phases
//!
//! - **Starting**: no state, no result (just after [`Executor::create`])
//! - **Task in flight**: the current state is a Task that has been dispatched
//! - **Terminal**: a result is set
//!
//! [`Executor::dispatch`] moves from Starting (or from a freshly entered
//! state) to the next suspension or to a terminal result.
//! [`Executor::run_task`] records the outcome of the in-flight task and
//! dispatches again. A worker resumes with [`Executor::hydrate`] on the
//! context it was handed.

use crate::components::{Components, Execution, Logger};
use crate::context::{Context, ContextError, ContextSlice, CONTEXT_VERSION};
use crate::definition::{State, StateMachine, ERROR_TASK_FAILED};
use crate::execution::{ExecutionResult, ExecutionState};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

mod error;

pub use error::ExecutorError;

/// Context namespace owned by the executor itself.
pub const EXECUTOR_NAMESPACE: &str = "executor";

const EXECUTION_ID_KEY: &str = "execution_id";
const VERSION_KEY: &str = "version";

/// Cause recorded when a task failure matches no catcher.
pub const NO_MATCHING_CATCHER: &str = "No matching catcher";

/// Check whether `context` was exported by an executor.
pub fn is_execution_context(context: &Context) -> bool {
    context
        .slice(EXECUTOR_NAMESPACE)
        .get(EXECUTION_ID_KEY)
        .is_some_and(Value::is_string)
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Where a `dispatch` or `run_task` call left the execution.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    /// A task was handed to the dispatcher; waiting for it to complete
    Suspended { state: String, resource: String },
    /// The execution reached a terminal result
    Finished(ExecutionResult),
}

impl DispatchOutcome {
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Self::Finished(result) => Some(result),
            Self::Suspended { .. } => None,
        }
    }
}

/// Interpreter bound to one execution.
pub struct Executor {
    execution_id: String,
    executor_id: String,
    components: Components,
    execution: Box<dyn Execution>,
    logger: Box<dyn Logger>,
}

impl Executor {
    /// Start a new execution of `definition`.
    ///
    /// Allocates a fresh execution id and executor id and registers the
    /// definition. Nothing runs until [`Executor::dispatch`].
    pub fn create(definition: &StateMachine, components: Components) -> Result<Self, ExecutorError> {
        let execution_id = new_id();
        let executor_id = new_id();

        let mut execution = components
            .executions
            .execution(&execution_id, Arc::clone(&components.definitions));
        execution.initialize(definition)?;

        let logger = components.loggers.logger(&execution_id, &executor_id);

        info!(
            execution_id = %execution_id,
            executor_id = %executor_id,
            start_at = %definition.start_at(),
            "created execution"
        );

        Ok(Self {
            execution_id,
            executor_id,
            components,
            execution,
            logger,
        })
    }

    /// Rebuild an executor from an exported context.
    ///
    /// The definition store imports its slice first, since the execution
    /// resolves its definition through it.
    pub fn hydrate(context: &Context, components: Components) -> Result<Self, ExecutorError> {
        let own = context.slice(EXECUTOR_NAMESPACE);
        let version: u32 = own.require(VERSION_KEY)?;
        if version != CONTEXT_VERSION {
            return Err(ContextError::UnsupportedVersion {
                found: version,
                supported: CONTEXT_VERSION,
            }
            .into());
        }
        let execution_id: String = own.require(EXECUTION_ID_KEY)?;

        let definitions = Arc::clone(&components.definitions);
        definitions.import_context(&context.slice(definitions.namespace()))?;

        let mut execution = components.executions.execution(&execution_id, definitions);
        let slice = context.slice(execution.namespace());
        execution.import_context(&slice)?;

        let executor_id = new_id();
        let mut logger = components.loggers.logger(&execution_id, &executor_id);
        let slice = context.slice(logger.namespace());
        logger.import_context(&slice)?;

        debug!(
            execution_id = %execution_id,
            executor_id = %executor_id,
            "hydrated execution"
        );

        Ok(Self {
            execution_id,
            executor_id,
            components,
            execution,
            logger,
        })
    }

    /// Merge the executor's own entries with every component's slice.
    pub fn export_context(&self) -> Result<Context, ExecutorError> {
        let mut context = Context::new();
        context.merge_slice(
            EXECUTOR_NAMESPACE,
            ContextSlice::new()
                .with(EXECUTION_ID_KEY, json!(self.execution_id))
                .with(VERSION_KEY, json!(CONTEXT_VERSION)),
        )?;

        let definitions = &self.components.definitions;
        context.merge_slice(definitions.namespace(), definitions.export_context()?)?;
        context.merge_slice(self.execution.namespace(), self.execution.export_context()?)?;
        context.merge_slice(self.logger.namespace(), self.logger.export_context()?)?;

        Ok(context)
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Identity of this executor instance; differs across hydrations.
    pub fn executor_id(&self) -> &str {
        &self.executor_id
    }

    pub fn definition(&self) -> Result<Arc<StateMachine>, ExecutorError> {
        Ok(self.execution.definition()?)
    }

    pub fn current_state_and_result(
        &self,
    ) -> Result<(Option<ExecutionState>, Option<ExecutionResult>), ExecutorError> {
        Ok(self.execution.current_state_and_result()?)
    }

    /// Advance until the next Task is dispatched or a terminal state is reached.
    ///
    /// `input` is the task input for a Task state reached by this call; it is
    /// also recorded as that state's carried data before the context is
    /// exported. At most one task is dispatched per call. Calling this on an
    /// execution that already finished returns the existing result without
    /// dispatching anything.
    ///
    /// If the dispatcher rejects the hand-off the error is returned and the
    /// execution stays at the Task state with its input recorded, so calling
    /// `dispatch` again retries the hand-off.
    pub fn dispatch(&mut self, input: Value) -> Result<DispatchOutcome, ExecutorError> {
        let definition = self.execution.definition()?;

        let name = match self.execution.current_state_and_result()? {
            (Some(state), _) => state.name,
            (None, Some(result)) => {
                debug!(execution_id = %self.execution_id, status = %result.status, "replaying finished execution");
                return Ok(DispatchOutcome::Finished(result));
            }
            (None, None) => {
                let start_at = definition.start_at();
                self.execution.change_state(start_at, None)?;
                start_at.to_string()
            }
        };

        let state = definition
            .state(&name)
            .ok_or_else(|| ExecutorError::UnknownState(name.clone()))?;

        match state {
            State::Succeed(_) => self.finish("", &name, ExecutionResult::succeeded(None)),
            State::Fail(fail) => {
                self.finish("", &name, ExecutionResult::failed(&fail.error, &fail.cause))
            }
            State::Task(task) => {
                self.execution.update_state_data(input.clone())?;

                info!(
                    execution_id = %self.execution_id,
                    state = %name,
                    resource = %task.resource,
                    "dispatching task"
                );
                // Logged before exporting so the worker continues after this line.
                self.log(&task.resource, &name, "dispatching");
                let context = self.export_context()?;

                if let Err(err) = self
                    .components
                    .dispatcher
                    .dispatch(&task.resource, &input, context)
                {
                    warn!(
                        execution_id = %self.execution_id,
                        state = %name,
                        resource = %task.resource,
                        error = %err,
                        "task hand-off failed"
                    );
                    self.log(&task.resource, &name, &format!("dispatch failed: {err}"));
                    return Err(err.into());
                }

                Ok(DispatchOutcome::Suspended {
                    state: name,
                    resource: task.resource.clone(),
                })
            }
        }
    }

    /// Record the outcome of the in-flight task and continue.
    ///
    /// `runner` performs (or reports) the task's work. On success the
    /// execution ends with the output if the Task is an end state, otherwise
    /// it moves to `Next` and dispatches the output. On failure `mapper`
    /// turns the error into a code that is matched against the Task's
    /// catchers in declared order; the first match moves the execution to its
    /// `Next` with an empty payload. Without a match the execution ends
    /// `FAILED`.
    ///
    /// When moving on to another Task fails to hand it off, the error is
    /// returned with the execution already at that Task; see
    /// [`Executor::dispatch`].
    pub fn run_task<F, M, E>(&mut self, runner: F, mapper: M) -> Result<DispatchOutcome, ExecutorError>
    where
        F: FnOnce() -> Result<Value, E>,
        M: FnOnce(&E) -> String,
    {
        let current = match self.execution.current_state_and_result()? {
            (Some(state), _) => state,
            (None, Some(result)) => return Err(ExecutorError::AlreadyFinished(result.status)),
            (None, None) => return Err(ExecutorError::NoTaskInFlight),
        };

        let definition = self.execution.definition()?;
        let task = match definition.state(&current.name) {
            Some(State::Task(task)) => task,
            Some(other) => {
                return Err(ExecutorError::NotAtTask {
                    name: current.name,
                    kind: other.type_name(),
                })
            }
            None => return Err(ExecutorError::UnknownState(current.name)),
        };

        match runner() {
            Ok(output) => match &task.next {
                None => {
                    self.log(&task.resource, &current.name, "succeeded");
                    self.finish(
                        &task.resource,
                        &current.name,
                        ExecutionResult::succeeded(Some(output)),
                    )
                }
                Some(next) => {
                    self.log(&task.resource, &current.name, &format!("succeeded, next {next}"));
                    self.execution.change_state(next, None)?;
                    self.dispatch(output)
                }
            },
            Err(err) => {
                let code = mapper(&err);
                match task.catcher_for(&code) {
                    Some(catcher) => {
                        info!(
                            execution_id = %self.execution_id,
                            state = %current.name,
                            error = %code,
                            next = %catcher.next,
                            "task failure caught"
                        );
                        self.log(
                            &task.resource,
                            &current.name,
                            &format!("failed with {code}, caught, next {}", catcher.next),
                        );
                        self.execution.change_state(&catcher.next, Some(json!({})))?;
                        self.dispatch(json!({}))
                    }
                    None => {
                        warn!(
                            execution_id = %self.execution_id,
                            state = %current.name,
                            error = %code,
                            "task failure not caught"
                        );
                        self.log(&task.resource, &current.name, &format!("failed with {code}"));
                        self.finish(
                            &task.resource,
                            &current.name,
                            ExecutionResult::failed(ERROR_TASK_FAILED, NO_MATCHING_CATCHER),
                        )
                    }
                }
            }
        }
    }

    fn finish(
        &mut self,
        resource: &str,
        state: &str,
        result: ExecutionResult,
    ) -> Result<DispatchOutcome, ExecutorError> {
        info!(
            execution_id = %self.execution_id,
            state = %state,
            status = %result.status,
            "execution finished"
        );
        self.log(resource, state, &format!("finished {}", result.status));
        self.execution.set_result(result.clone())?;
        Ok(DispatchOutcome::Finished(result))
    }

    fn log(&mut self, resource: &str, state: &str, message: &str) {
        let line = self.logger.format(&self.executor_id, resource, state, message);
        self.logger.log(&line);
    }
}
