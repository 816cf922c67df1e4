//! Catch rules attached to Task states.

use serde::{Deserialize, Serialize};

/// Wildcard error code matched by every catcher that lists it.
pub const ERROR_ALL: &str = "States.ALL";

/// Error code reported when a task fails and nothing more specific is known.
pub const ERROR_TASK_FAILED: &str = "States.TaskFailed";

/// Rule mapping one or more error codes to a recovery state.
///
/// Catchers are evaluated in declared order and the first match wins, so a
/// wildcard catcher placed after a specific one only sees the codes the
/// specific one lets through.
///
/// # Example
///
/// ```rust
/// use stately::definition::Catcher;
///
/// let specific = Catcher::new(vec!["Timeout".to_string()], "Retry");
/// let fallback = Catcher::all("Cleanup");
///
/// assert!(specific.matches("Timeout"));
/// assert!(!specific.matches("Boom"));
/// assert!(fallback.matches("Boom"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Catcher {
    /// Error codes handled by this catcher, in declared order
    pub error_equals: Vec<String>,
    /// State to move to when the catcher matches
    pub next: String,
}

impl Catcher {
    pub fn new(error_equals: Vec<String>, next: impl Into<String>) -> Self {
        Self {
            error_equals,
            next: next.into(),
        }
    }

    /// Catcher for the generic task failure code.
    pub fn task_failed(next: impl Into<String>) -> Self {
        Self::new(vec![ERROR_TASK_FAILED.to_string()], next)
    }

    /// Catcher that matches every error code.
    pub fn all(next: impl Into<String>) -> Self {
        Self::new(vec![ERROR_ALL.to_string()], next)
    }

    /// Check whether this catcher handles `code` (pure).
    pub fn matches(&self, code: &str) -> bool {
        self.error_equals
            .iter()
            .any(|candidate| candidate == code || candidate == ERROR_ALL)
    }
}

/// First catcher in `catchers` that handles `code`.
pub fn find_catcher<'a>(catchers: &'a [Catcher], code: &str) -> Option<&'a Catcher> {
    catchers.iter().find(|catcher| catcher.matches(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_listed_code_only() {
        let catcher = Catcher::new(vec!["A".to_string(), "B".to_string()], "X");

        assert!(catcher.matches("A"));
        assert!(catcher.matches("B"));
        assert!(!catcher.matches("C"));
    }

    #[test]
    fn wildcard_matches_everything() {
        let catcher = Catcher::all("X");

        assert!(catcher.matches("States.TaskFailed"));
        assert!(catcher.matches("anything"));
        assert!(catcher.matches(""));
    }

    #[test]
    fn first_match_wins() {
        let catchers = vec![
            Catcher::new(vec!["A".to_string()], "X"),
            Catcher::all("Y"),
        ];

        assert_eq!(find_catcher(&catchers, "A").map(|c| c.next.as_str()), Some("X"));
        assert_eq!(find_catcher(&catchers, "B").map(|c| c.next.as_str()), Some("Y"));
    }

    #[test]
    fn no_catchers_means_no_match() {
        assert!(find_catcher(&[], "A").is_none());
    }

    #[test]
    fn task_failed_shorthand() {
        let catcher = Catcher::task_failed("Recover");
        assert_eq!(catcher.error_equals, vec![ERROR_TASK_FAILED.to_string()]);
        assert!(catcher.matches(ERROR_TASK_FAILED));
        assert!(!catcher.matches("Other"));
    }

    #[test]
    fn serializes_with_states_language_keys() {
        let catcher = Catcher::all("Cleanup");
        let json = serde_json::to_value(&catcher).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"ErrorEquals": ["States.ALL"], "Next": "Cleanup"})
        );
    }
}
