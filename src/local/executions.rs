//! In-memory execution stores.
//!
//! Two flavours:
//! - [`ContextExecutionStore`]: the state pointer and result travel in the
//!   context blob; nothing is kept between invocations.
//! - [`CentralExecutionStore`]: state lives in a shared table; the context
//!   only identifies the execution.

use crate::components::{ComponentError, ContextComponent, DefinitionStore, Execution, ExecutionStore};
use crate::context::{ContextError, ContextSlice};
use crate::definition::StateMachine;
use crate::execution::{ExecutionResult, ExecutionState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const NAMESPACE: &str = "execution";
const DEFINITION_ID_KEY: &str = "definition_id";
const STATE_KEY: &str = "state";
const RESULT_KEY: &str = "result";

/// Execution store whose executions carry their whole state in the context.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextExecutionStore;

impl ContextExecutionStore {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionStore for ContextExecutionStore {
    fn execution(
        &self,
        execution_id: &str,
        definitions: Arc<dyn DefinitionStore>,
    ) -> Box<dyn Execution> {
        Box::new(ContextExecution {
            execution_id: execution_id.to_string(),
            definitions,
            definition_id: None,
            state: None,
            result: None,
        })
    }
}

struct ContextExecution {
    execution_id: String,
    definitions: Arc<dyn DefinitionStore>,
    definition_id: Option<String>,
    state: Option<ExecutionState>,
    result: Option<ExecutionResult>,
}

impl ContextComponent for ContextExecution {
    fn namespace(&self) -> &'static str {
        NAMESPACE
    }

    fn export_context(&self) -> Result<ContextSlice, ContextError> {
        let mut slice = ContextSlice::new();
        if let Some(definition_id) = &self.definition_id {
            slice.put(DEFINITION_ID_KEY, definition_id)?;
        }
        if let Some(state) = &self.state {
            slice.put(STATE_KEY, state)?;
        }
        if let Some(result) = &self.result {
            slice.put(RESULT_KEY, result)?;
        }
        Ok(slice)
    }
}

impl Execution for ContextExecution {
    fn execution_id(&self) -> &str {
        &self.execution_id
    }

    fn initialize(&mut self, definition: &StateMachine) -> Result<(), ComponentError> {
        self.definition_id = Some(self.definitions.put_anonymous(definition)?);
        Ok(())
    }

    fn definition(&self) -> Result<Arc<StateMachine>, ComponentError> {
        let definition_id = self
            .definition_id
            .as_deref()
            .ok_or_else(|| ComponentError::NotInitialized(self.execution_id.clone()))?;
        self.definitions.hydrate_definition(definition_id)
    }

    fn change_state(&mut self, name: &str, data: Option<Value>) -> Result<(), ComponentError> {
        debug!(execution_id = %self.execution_id, state = %name, "changing state");
        self.state = Some(ExecutionState {
            name: name.to_string(),
            data,
        });
        Ok(())
    }

    fn update_state_data(&mut self, data: Value) -> Result<(), ComponentError> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| ComponentError::NoStateInFlight(self.execution_id.clone()))?;
        state.data = Some(data);
        Ok(())
    }

    fn set_result(&mut self, result: ExecutionResult) -> Result<(), ComponentError> {
        debug!(execution_id = %self.execution_id, status = %result.status, "setting result");
        self.state = None;
        self.result = Some(result);
        Ok(())
    }

    fn current_state_and_result(
        &self,
    ) -> Result<(Option<ExecutionState>, Option<ExecutionResult>), ComponentError> {
        Ok((self.state.clone(), self.result.clone()))
    }

    fn import_context(&mut self, slice: &ContextSlice) -> Result<(), ContextError> {
        self.definition_id = Some(slice.require(DEFINITION_ID_KEY)?);
        self.state = slice.get_as(STATE_KEY)?;
        self.result = slice.get_as(RESULT_KEY)?;
        Ok(())
    }
}

/// Stored record of one execution in a [`CentralExecutionStore`].
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionRecord {
    pub definition_id: String,
    pub state: Option<ExecutionState>,
    pub result: Option<ExecutionResult>,
}

type ExecutionTable = Arc<Mutex<HashMap<String, ExecutionRecord>>>;

/// Execution store keeping every execution in one shared table.
///
/// Clones share the table, so executors built from any clone see the same
/// executions.
#[derive(Clone, Debug, Default)]
pub struct CentralExecutionStore {
    table: ExecutionTable,
}

impl CentralExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the stored record for `execution_id`.
    pub fn record(&self, execution_id: &str) -> Option<ExecutionRecord> {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(execution_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExecutionStore for CentralExecutionStore {
    fn execution(
        &self,
        execution_id: &str,
        definitions: Arc<dyn DefinitionStore>,
    ) -> Box<dyn Execution> {
        Box::new(CentralExecution {
            execution_id: execution_id.to_string(),
            definitions,
            table: Arc::clone(&self.table),
        })
    }
}

struct CentralExecution {
    execution_id: String,
    definitions: Arc<dyn DefinitionStore>,
    table: ExecutionTable,
}

impl CentralExecution {
    fn with_record<T>(
        &self,
        f: impl FnOnce(&mut ExecutionRecord) -> Result<T, ComponentError>,
    ) -> Result<T, ComponentError> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let record = table
            .get_mut(&self.execution_id)
            .ok_or_else(|| ComponentError::NotFound {
                kind: "execution",
                id: self.execution_id.clone(),
            })?;
        f(record)
    }
}

impl ContextComponent for CentralExecution {
    fn namespace(&self) -> &'static str {
        NAMESPACE
    }

    fn export_context(&self) -> Result<ContextSlice, ContextError> {
        Ok(ContextSlice::new())
    }
}

impl Execution for CentralExecution {
    fn execution_id(&self) -> &str {
        &self.execution_id
    }

    fn initialize(&mut self, definition: &StateMachine) -> Result<(), ComponentError> {
        let definition_id = self.definitions.put_anonymous(definition)?;
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                self.execution_id.clone(),
                ExecutionRecord {
                    definition_id,
                    state: None,
                    result: None,
                },
            );
        Ok(())
    }

    fn definition(&self) -> Result<Arc<StateMachine>, ComponentError> {
        let definition_id = self.with_record(|record| Ok(record.definition_id.clone()))?;
        self.definitions.hydrate_definition(&definition_id)
    }

    fn change_state(&mut self, name: &str, data: Option<Value>) -> Result<(), ComponentError> {
        debug!(execution_id = %self.execution_id, state = %name, "changing state");
        self.with_record(|record| {
            record.state = Some(ExecutionState {
                name: name.to_string(),
                data,
            });
            Ok(())
        })
    }

    fn update_state_data(&mut self, data: Value) -> Result<(), ComponentError> {
        let execution_id = self.execution_id.clone();
        self.with_record(|record| {
            let state = record
                .state
                .as_mut()
                .ok_or(ComponentError::NoStateInFlight(execution_id))?;
            state.data = Some(data);
            Ok(())
        })
    }

    fn set_result(&mut self, result: ExecutionResult) -> Result<(), ComponentError> {
        debug!(execution_id = %self.execution_id, status = %result.status, "setting result");
        self.with_record(|record| {
            record.state = None;
            record.result = Some(result);
            Ok(())
        })
    }

    fn current_state_and_result(
        &self,
    ) -> Result<(Option<ExecutionState>, Option<ExecutionResult>), ComponentError> {
        self.with_record(|record| Ok((record.state.clone(), record.result.clone())))
    }

    fn import_context(&mut self, _slice: &ContextSlice) -> Result<(), ContextError> {
        Ok(())
    }
}
