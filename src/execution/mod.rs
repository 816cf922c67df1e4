//! Where an execution is, and how it ended.
//!
//! An execution holds exactly one of:
//! - an [`ExecutionState`]: the state currently in flight, or
//! - an [`ExecutionResult`]: the terminal outcome.
//!
//! Both are plain values. A new `ExecutionState` is built on every
//! transition; only its carried `data` is ever updated in place.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// A present key decodes to `Some`, even when its value is `null`.
///
/// Paired with `#[serde(default)]` so that only a missing key yields `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Pointer to the state currently in flight.
///
/// # Example
///
/// ```rust
/// use stately::execution::ExecutionState;
/// use serde_json::json;
///
/// let state = ExecutionState::new("Resize").with_data(json!({"width": 640}));
/// assert_eq!(state.name, "Resize");
/// assert_eq!(state.data, Some(json!({"width": 640})));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionState {
    pub name: String,
    /// Opaque payload carried with the state
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
}

impl ExecutionState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Terminal status of an execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
            Self::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of an execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionResult {
    pub status: Status,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub output: Option<Value>,
}

impl ExecutionResult {
    pub fn succeeded(output: Option<Value>) -> Self {
        Self {
            status: Status::Succeeded,
            output,
        }
    }

    /// Failed result with the conventional `{"Error", "Cause"}` payload.
    pub fn failed(error: &str, cause: &str) -> Self {
        Self {
            status: Status::Failed,
            output: Some(serde_json::json!({"Error": error, "Cause": cause})),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Succeeded
    }
}
