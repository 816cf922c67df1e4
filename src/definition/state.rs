//! State variants of the states language.
//!
//! Only the `Task`, `Succeed` and `Fail` kinds are modelled. The `Type`
//! field of a state document selects the variant; unknown kinds are
//! rejected while parsing so they never reach the interpreter.

use super::catcher::{find_catcher, Catcher};
use serde::{Deserialize, Serialize};

/// A single named state of a [`StateMachine`](super::StateMachine).
///
/// # Example
///
/// ```rust
/// use stately::definition::{State, TaskState};
///
/// let task = State::Task(TaskState::new("arn:fn:resize", Some("Notify")));
/// assert!(!task.is_end());
///
/// let last = State::Task(TaskState::new("arn:fn:notify", None));
/// assert!(last.is_end());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum State {
    Task(TaskState),
    #[serde(alias = "Success")]
    Succeed(SucceedState),
    Fail(FailState),
}

impl State {
    /// Check whether reaching this state terminates the machine (pure).
    pub fn is_end(&self) -> bool {
        match self {
            Self::Task(task) => task.next.is_none(),
            Self::Succeed(_) | Self::Fail(_) => true,
        }
    }

    /// The `Type` discriminator as written in documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Task(_) => "Task",
            Self::Succeed(_) => "Succeed",
            Self::Fail(_) => "Fail",
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            Self::Task(task) => task.comment.as_deref(),
            Self::Succeed(succeed) => succeed.comment.as_deref(),
            Self::Fail(fail) => fail.comment.as_deref(),
        }
    }

    pub fn as_task(&self) -> Option<&TaskState> {
        match self {
            Self::Task(task) => Some(task),
            _ => None,
        }
    }
}

/// State that hands work to an external resource.
///
/// `next == None` marks the end of the chain; in documents that is written
/// as `"End": true` and exactly one of `Next` / `End` must be present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaskDocument", into = "TaskDocument")]
pub struct TaskState {
    /// Opaque identifier of the work to perform
    pub resource: String,
    pub next: Option<String>,
    pub catch: Option<Vec<Catcher>>,
    pub comment: Option<String>,
}

impl TaskState {
    pub fn new(resource: impl Into<String>, next: Option<&str>) -> Self {
        Self {
            resource: resource.into(),
            next: next.map(str::to_string),
            catch: None,
            comment: None,
        }
    }

    pub fn with_catch(mut self, catch: Vec<Catcher>) -> Self {
        self.catch = Some(catch);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Catchers in declared order; empty when the state has no `Catch`.
    pub fn catchers(&self) -> &[Catcher] {
        self.catch.as_deref().unwrap_or_default()
    }

    /// Resolve an error code to the first catcher that handles it.
    pub fn catcher_for(&self, code: &str) -> Option<&Catcher> {
        find_catcher(self.catchers(), code)
    }
}

/// Document shape of a Task state, with the `Next` / `End` pair spelled out.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskDocument {
    resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    catch: Option<Vec<Catcher>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

impl TryFrom<TaskDocument> for TaskState {
    type Error = String;

    fn try_from(doc: TaskDocument) -> Result<Self, Self::Error> {
        let next = match (doc.next, doc.end) {
            (Some(_), Some(true)) => {
                return Err(format!(
                    "Task '{}' declares both Next and End",
                    doc.resource
                ))
            }
            (Some(next), _) => Some(next),
            (None, Some(true)) => None,
            (None, _) => {
                return Err(format!(
                    "Task '{}' must declare either Next or \"End\": true",
                    doc.resource
                ))
            }
        };

        Ok(Self {
            resource: doc.resource,
            next,
            catch: doc.catch,
            comment: doc.comment,
        })
    }
}

impl From<TaskState> for TaskDocument {
    fn from(task: TaskState) -> Self {
        let end = task.next.is_none().then_some(true);
        Self {
            resource: task.resource,
            next: task.next,
            end,
            catch: task.catch,
            comment: task.comment,
        }
    }
}

/// Terminal state reporting success.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SucceedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Terminal state reporting failure with an error code and cause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailState {
    pub error: String,
    pub cause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl FailState {
    pub fn new(error: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            cause: cause.into(),
            comment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn is_end_follows_next() {
        assert!(State::Task(TaskState::new("R", None)).is_end());
        assert!(!State::Task(TaskState::new("R", Some("Next"))).is_end());
        assert!(State::Succeed(SucceedState::default()).is_end());
        assert!(State::Fail(FailState::new("E", "C")).is_end());
    }

    #[test]
    fn end_task_serializes_end_marker() {
        let state = State::Task(TaskState::new("R", None));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json, json!({"Type": "Task", "Resource": "R", "End": true}));
    }

    #[test]
    fn chained_task_serializes_next() {
        let state = State::Task(TaskState::new("R", Some("B")).with_comment("first"));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(
            json,
            json!({"Type": "Task", "Resource": "R", "Next": "B", "Comment": "first"})
        );
    }

    #[test]
    fn task_requires_next_or_end() {
        let result: Result<State, _> =
            serde_json::from_value(json!({"Type": "Task", "Resource": "R"}));
        assert!(result.is_err());

        let result: Result<State, _> = serde_json::from_value(
            json!({"Type": "Task", "Resource": "R", "Next": "B", "End": true}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn end_false_without_next_is_rejected() {
        let result: Result<State, _> =
            serde_json::from_value(json!({"Type": "Task", "Resource": "R", "End": false}));
        assert!(result.is_err());
    }

    #[test]
    fn task_requires_resource() {
        let result: Result<State, _> =
            serde_json::from_value(json!({"Type": "Task", "End": true}));
        assert!(result.is_err());
    }

    #[test]
    fn fail_requires_error_and_cause() {
        let result: Result<State, _> =
            serde_json::from_value(json!({"Type": "Fail", "Error": "E"}));
        assert!(result.is_err());

        let state: State =
            serde_json::from_value(json!({"Type": "Fail", "Error": "E", "Cause": "C"})).unwrap();
        assert_eq!(state, State::Fail(FailState::new("E", "C")));
    }

    #[test]
    fn success_is_accepted_as_succeed() {
        let state: State = serde_json::from_value(json!({"Type": "Success"})).unwrap();
        assert_eq!(state, State::Succeed(SucceedState::default()));
        assert_eq!(state.type_name(), "Succeed");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<State, _> = serde_json::from_value(json!({"Type": "Parallel"}));
        assert!(result.is_err());

        let result: Result<State, _> = serde_json::from_value(json!({"Resource": "R"}));
        assert!(result.is_err());
    }

    #[test]
    fn catcher_for_uses_declared_order() {
        let task = TaskState::new("R", None).with_catch(vec![
            Catcher::new(vec!["A".to_string()], "X"),
            Catcher::all("Y"),
        ]);

        assert_eq!(task.catcher_for("A").map(|c| c.next.as_str()), Some("X"));
        assert_eq!(task.catcher_for("B").map(|c| c.next.as_str()), Some("Y"));
        assert!(TaskState::new("R", None).catcher_for("A").is_none());
    }
}
