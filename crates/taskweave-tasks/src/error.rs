//! Engine error taxonomy

use thiserror::Error;

/// Errors produced while resolving or running a task specification
#[derive(Debug, Error)]
pub enum TaskError {
    /// A referenced task name is not registered
    #[error("Task '{0}' does not exist")]
    UnknownTask(String),

    /// A leaf reported a failure
    #[error("Task '{task}' failed: {cause:#}")]
    LeafFailed { task: String, cause: anyhow::Error },

    /// The run request had nothing to run
    #[error("No task specification given")]
    MissingSpecification,

    /// An alias reaches itself through its own body
    #[error("Alias cycle detected: {}", .chain.join(" -> "))]
    AliasCycle { chain: Vec<String> },

    /// A leaf panicked while running
    #[error("Task '{task}' panicked: {message}")]
    Panicked { task: String, message: String },

    /// An alias was handed to the invoker instead of a leaf
    #[error("Task '{0}' is an alias and cannot be invoked directly")]
    NotInvocable(String),
}

impl TaskError {
    /// Wrap a leaf's own error
    pub fn leaf(task: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self::LeafFailed {
            task: task.into(),
            cause: cause.into(),
        }
    }

    /// The task name this error is about, when there is one
    pub fn task(&self) -> Option<&str> {
        match self {
            Self::UnknownTask(task) | Self::NotInvocable(task) => Some(task),
            Self::LeafFailed { task, .. } | Self::Panicked { task, .. } => Some(task),
            Self::AliasCycle { chain } => chain.first().map(String::as_str),
            Self::MissingSpecification => None,
        }
    }

    /// Whether the error was raised before any leaf ran
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTask(_) | Self::MissingSpecification | Self::AliasCycle { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_task_display() {
        let err = TaskError::UnknownTask("hi".to_string());
        assert_eq!(err.to_string(), "Task 'hi' does not exist");
        assert_eq!(err.task(), Some("hi"));
        assert!(err.is_resolution_error());
    }

    #[test]
    fn test_leaf_failure_keeps_cause_chain() {
        let cause = anyhow::anyhow!("disk full").context("writing report");
        let err = TaskError::leaf("report", cause);
        assert_eq!(
            err.to_string(),
            "Task 'report' failed: writing report: disk full"
        );
        assert!(!err.is_resolution_error());
    }

    #[test]
    fn test_alias_cycle_display() {
        let err = TaskError::AliasCycle {
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "Alias cycle detected: a -> b -> a");
        assert_eq!(err.task(), Some("a"));
    }

    #[test]
    fn test_missing_specification_has_no_task() {
        assert!(TaskError::MissingSpecification.task().is_none());
    }
}
