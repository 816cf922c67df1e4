//! Reference checks for parsed definitions.
//!
//! Uses Stillwater's `Validation` so that every dangling reference in a
//! definition is reported in one pass instead of stopping at the first.

use super::state::State;
use super::StateMachine;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A structural problem found in an otherwise well-formed definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionViolation {
    #[error("StartAt names unknown state '{0}'")]
    UnknownStartState(String),

    #[error("State '{state}' transitions to unknown state '{next}'")]
    UnknownNext { state: String, next: String },

    #[error("Catcher {index} of state '{state}' transitions to unknown state '{next}'")]
    UnknownCatchNext {
        state: String,
        index: usize,
        next: String,
    },

    #[error("Catcher {index} of state '{state}' has an empty ErrorEquals")]
    EmptyErrorEquals { state: String, index: usize },
}

/// Type alias for the accumulated outcome of all reference checks
pub type DefinitionValidation = Validation<(), NonEmptyVec<DefinitionViolation>>;

fn check(ok: bool, violation: impl FnOnce() -> DefinitionViolation) -> DefinitionValidation {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// Run every reference check, accumulating ALL violations.
pub fn check_references(machine: &StateMachine) -> DefinitionValidation {
    let states = machine.states();
    let mut checks: Vec<DefinitionValidation> = Vec::new();

    checks.push(check(states.contains_key(machine.start_at()), || {
        DefinitionViolation::UnknownStartState(machine.start_at().to_string())
    }));

    for (name, state) in states {
        let State::Task(task) = state else {
            continue;
        };

        if let Some(next) = &task.next {
            checks.push(check(states.contains_key(next), || {
                DefinitionViolation::UnknownNext {
                    state: name.clone(),
                    next: next.clone(),
                }
            }));
        }

        for (index, catcher) in task.catchers().iter().enumerate() {
            checks.push(check(!catcher.error_equals.is_empty(), || {
                DefinitionViolation::EmptyErrorEquals {
                    state: name.clone(),
                    index,
                }
            }));
            checks.push(check(states.contains_key(&catcher.next), || {
                DefinitionViolation::UnknownCatchNext {
                    state: name.clone(),
                    index,
                    next: catcher.next.clone(),
                }
            }));
        }
    }

    Validation::all_vec(checks).map(|_| ())
}
