//! Definition parsing errors.

use super::validate::DefinitionViolation;
use thiserror::Error;

/// Errors that can occur while building a [`StateMachine`](super::StateMachine)
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not valid JSON or does not have the states-language shape
    /// (missing `StartAt`, unknown `Type`, missing `Resource`, ...)
    #[error("Malformed state machine document: {0}")]
    Document(#[from] serde_json::Error),

    /// The document parsed but references states that do not exist
    #[error("Invalid state machine definition: {}", format_violations(.0))]
    Invalid(Vec<DefinitionViolation>),
}

fn format_violations(violations: &[DefinitionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
