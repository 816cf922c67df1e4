//! Logger that forwards to `tracing` and records lines in memory.

use crate::components::{ContextComponent, Logger, LoggerFactory};
use crate::context::{ContextError, ContextSlice};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

const SEQUENCE_KEY: &str = "sequence";

/// One appended log line.
#[derive(Clone, Debug, PartialEq)]
pub struct LogLine {
    pub execution_id: String,
    pub executor_id: String,
    /// Position of the line in the execution's stream, starting at 1
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Shared, append-only collection of log lines.
#[derive(Clone, Debug, Default)]
pub struct LogSink {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: LogLine) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lines_for(&self, execution_id: &str) -> Vec<LogLine> {
        self.lines()
            .into_iter()
            .filter(|line| line.execution_id == execution_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Logger for one execution.
///
/// The next sequence number is the append-position token carried in the
/// context, so numbering continues across invocations.
pub struct LocalLogger {
    execution_id: String,
    executor_id: String,
    sequence: u64,
    sink: LogSink,
}

impl ContextComponent for LocalLogger {
    fn namespace(&self) -> &'static str {
        "logger"
    }

    fn export_context(&self) -> Result<ContextSlice, ContextError> {
        let mut slice = ContextSlice::new();
        slice.put(SEQUENCE_KEY, &self.sequence)?;
        Ok(slice)
    }
}

impl Logger for LocalLogger {
    fn log(&mut self, message: &str) {
        self.sequence += 1;
        info!(
            target: "stately::execution",
            execution_id = %self.execution_id,
            sequence = self.sequence,
            "{message}"
        );
        self.sink.push(LogLine {
            execution_id: self.execution_id.clone(),
            executor_id: self.executor_id.clone(),
            sequence: self.sequence,
            timestamp: Utc::now(),
            message: message.to_string(),
        });
    }

    fn import_context(&mut self, slice: &ContextSlice) -> Result<(), ContextError> {
        self.sequence = slice.get_as(SEQUENCE_KEY)?.unwrap_or(0);
        Ok(())
    }
}

/// Builds [`LocalLogger`]s writing into one [`LogSink`].
#[derive(Clone, Debug, Default)]
pub struct LocalLoggerFactory {
    sink: LogSink,
}

impl LocalLoggerFactory {
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }
}

impl LoggerFactory for LocalLoggerFactory {
    fn logger(&self, execution_id: &str, executor_id: &str) -> Box<dyn Logger> {
        Box::new(LocalLogger {
            execution_id: execution_id.to_string(),
            executor_id: executor_id.to_string(),
            sequence: 0,
            sink: self.sink.clone(),
        })
    }
}
