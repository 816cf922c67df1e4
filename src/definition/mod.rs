//! States-language definitions.
//!
//! This module contains the pure data model of a state machine definition:
//! - [`StateMachine`] with its named states and start state
//! - [`State`] variants (`Task`, `Succeed`, `Fail`)
//! - [`Catcher`] rules for recovering from task errors
//!
//! Definitions are immutable once built. They are identified externally by
//! [`StateMachine::content_hash`], a digest of their canonical JSON form,
//! which lets stores deduplicate and cache them by content.

mod catcher;
mod error;
mod state;
mod validate;

pub use catcher::{find_catcher, Catcher, ERROR_ALL, ERROR_TASK_FAILED};
pub use error::ParseError;
pub use state::{FailState, State, SucceedState, TaskState};
pub use validate::{check_references, DefinitionValidation, DefinitionViolation};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::BTreeMap;
use stillwater::validation::Validation;

/// Version written when a document does not declare one.
pub const DEFAULT_VERSION: &str = "1.0";

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

/// A states-language document, either already decoded or still as text.
#[derive(Clone, Debug)]
pub enum Document<'a> {
    Value(Value),
    Text(Cow<'a, str>),
}

impl From<Value> for Document<'_> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl<'a> From<&'a Value> for Document<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Value(value.clone())
    }
}

impl<'a> From<&'a str> for Document<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(Cow::Borrowed(text))
    }
}

impl From<String> for Document<'_> {
    fn from(text: String) -> Self {
        Self::Text(Cow::Owned(text))
    }
}

/// An immutable state machine definition.
///
/// # Example
///
/// ```rust
/// use stately::definition::{State, StateMachine};
/// use serde_json::json;
///
/// let machine = StateMachine::from_representation(json!({
///     "StartAt": "Resize",
///     "States": {
///         "Resize": {"Type": "Task", "Resource": "arn:fn:resize", "Next": "Done"},
///         "Done": {"Type": "Succeed"}
///     }
/// }))
/// .unwrap();
///
/// assert_eq!(machine.start_at(), "Resize");
/// assert_eq!(machine.version(), "1.0");
/// assert!(matches!(machine.state("Done"), Some(State::Succeed(_))));
///
/// // Parsing the representation back yields an equal machine.
/// let again = StateMachine::from_representation(machine.to_representation()).unwrap();
/// assert_eq!(machine, again);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachine {
    states: BTreeMap<String, State>,
    start_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_seconds: Option<u64>,
}

impl StateMachine {
    /// Build a definition from states and a start state, checking references.
    pub fn new(
        states: BTreeMap<String, State>,
        start_at: impl Into<String>,
    ) -> Result<Self, ParseError> {
        Self::unchecked(states, start_at).checked()
    }

    pub(crate) fn unchecked(states: BTreeMap<String, State>, start_at: impl Into<String>) -> Self {
        Self {
            states,
            start_at: start_at.into(),
            comment: None,
            version: default_version(),
            timeout_seconds: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Parse a states-language document.
    ///
    /// Accepts a decoded `serde_json::Value` or its textual encoding. Fails
    /// with [`ParseError::Document`] when the shape is wrong and with
    /// [`ParseError::Invalid`] listing every dangling reference otherwise.
    pub fn from_representation<'a>(doc: impl Into<Document<'a>>) -> Result<Self, ParseError> {
        let machine: Self = match doc.into() {
            Document::Value(value) => serde_json::from_value(value)?,
            Document::Text(text) => serde_json::from_str(&text)?,
        };
        machine.checked()
    }

    /// The states-language document for this definition.
    ///
    /// Optional fields that are unset are omitted and end-of-chain Task
    /// states carry `"End": true` instead of `Next`.
    pub fn to_representation(&self) -> Value {
        serde_json::to_value(self).expect("State machine definitions always serialize to JSON")
    }

    /// Lowercase hex SHA-256 of the canonical JSON form.
    ///
    /// Object keys are sorted at every level, so two documents that differ
    /// only in key order produce the same hash.
    pub fn content_hash(&self) -> String {
        let canonical = self.to_representation().to_string();
        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }

    /// Run the reference checks, accumulating every violation.
    pub fn validate(&self) -> DefinitionValidation {
        check_references(self)
    }

    fn checked(self) -> Result<Self, ParseError> {
        match self.validate() {
            Validation::Success(_) => Ok(self),
            Validation::Failure(violations) => {
                Err(ParseError::Invalid(violations.iter().cloned().collect()))
            }
        }
    }

    pub fn states(&self) -> &BTreeMap<String, State> {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    pub fn start_at(&self) -> &str {
        &self.start_at
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Carried only; the interpreter does not enforce it.
    pub fn timeout_seconds(&self) -> Option<u64> {
        self.timeout_seconds
    }
}

impl std::str::FromStr for StateMachine {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_representation(s)
    }
}
