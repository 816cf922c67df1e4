//! In-process task queue standing in for a remote dispatch transport.
//!
//! Dispatching only enqueues. A test (or a demo worker loop) drains the
//! queue with [`QueueTaskDispatcher::run_next`], which hydrates a fresh
//! executor from the queued context and runs the task, exactly as a remote
//! worker would.

use crate::components::{ComponentError, Components, TaskDispatcher};
use crate::context::Context;
use crate::executor::{DispatchOutcome, Executor, ExecutorError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// A dispatched task waiting for a worker.
#[derive(Clone, Debug, PartialEq)]
pub struct QueuedTask {
    pub resource: String,
    pub input: Value,
    pub context: Context,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<QueuedTask>,
    dispatched: usize,
}

/// Task dispatcher that queues work in memory.
#[derive(Debug, Default)]
pub struct QueueTaskDispatcher {
    state: Mutex<QueueState>,
}

impl QueueTaskDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of tasks dispatched since creation.
    pub fn dispatched(&self) -> usize {
        self.lock().dispatched
    }

    /// Copy of the queued tasks, oldest first.
    pub fn queued(&self) -> Vec<QueuedTask> {
        self.lock().pending.iter().cloned().collect()
    }

    pub fn take_next(&self) -> Option<QueuedTask> {
        self.lock().pending.pop_front()
    }

    /// Run the oldest queued task, if any.
    ///
    /// Hydrates an executor from the task's context with `components` and
    /// calls `run_task`, handing `runner` the resource and input. A task whose
    /// context cannot be hydrated goes back to the front of the queue.
    pub fn run_next<F, M, E>(
        &self,
        components: &Components,
        runner: F,
        mapper: M,
    ) -> Result<Option<DispatchOutcome>, ExecutorError>
    where
        F: FnOnce(&str, &Value) -> Result<Value, E>,
        M: FnOnce(&E) -> String,
    {
        let Some(task) = self.take_next() else {
            return Ok(None);
        };

        debug!(resource = %task.resource, "running queued task");
        let mut executor = match Executor::hydrate(&task.context, components.clone()) {
            Ok(executor) => executor,
            Err(err) => {
                warn!(resource = %task.resource, error = %err, "requeueing task that failed to hydrate");
                self.lock().pending.push_front(task);
                return Err(err);
            }
        };
        executor
            .run_task(|| runner(&task.resource, &task.input), mapper)
            .map(Some)
    }

    /// Keep running queued tasks until the queue is empty.
    ///
    /// Returns the outcome of every task run, in order. Stops with an error
    /// after `max_tasks` tasks so a definition that loops forever cannot
    /// hang the caller.
    pub fn run_until_idle<F, M, E>(
        &self,
        components: &Components,
        mut runner: F,
        mut mapper: M,
        max_tasks: usize,
    ) -> Result<Vec<DispatchOutcome>, ExecutorError>
    where
        F: FnMut(&str, &Value) -> Result<Value, E>,
        M: FnMut(&E) -> String,
    {
        let mut outcomes = Vec::new();
        while outcomes.len() < max_tasks {
            match self.run_next(components, &mut runner, &mut mapper)? {
                Some(outcome) => outcomes.push(outcome),
                None => return Ok(outcomes),
            }
        }

        if self.pending() > 0 {
            return Err(ComponentError::Dispatch {
                resource: self.queued().first().map(|t| t.resource.clone()).unwrap_or_default(),
                reason: format!("still pending after {max_tasks} tasks"),
            }
            .into());
        }
        Ok(outcomes)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskDispatcher for QueueTaskDispatcher {
    fn dispatch(&self, resource: &str, input: &Value, context: Context) -> Result<(), ComponentError> {
        debug!(resource = %resource, "queueing task");
        let mut state = self.lock();
        state.pending.push_back(QueuedTask {
            resource: resource.to_string(),
            input: input.clone(),
            context,
        });
        state.dispatched += 1;
        Ok(())
    }
}
