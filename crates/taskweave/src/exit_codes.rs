//! Exit codes for the CLI

use taskweave_core::{ConfigError, TaskweaveError};
use taskweave_tasks::TaskError;

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error, including alias cycles
pub const CONFIG_ERROR: i32 = 2;

/// A task failed or panicked
pub const TASK_FAILED: i32 = 3;

/// A task name does not exist
pub const UNKNOWN_TASK: i32 = 4;

/// Pick the exit code for an error returned by a command
pub fn for_error(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<TaskError>() {
        return match e {
            TaskError::UnknownTask(_) => UNKNOWN_TASK,
            TaskError::AliasCycle { .. } => CONFIG_ERROR,
            TaskError::LeafFailed { .. } | TaskError::Panicked { .. } => TASK_FAILED,
            TaskError::MissingSpecification | TaskError::NotInvocable(_) => ERROR,
        };
    }

    if let Some(e) = error.downcast_ref::<TaskweaveError>() {
        if e.is_config() {
            return CONFIG_ERROR;
        }
    }

    if error.downcast_ref::<ConfigError>().is_some() {
        return CONFIG_ERROR;
    }

    ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_errors() {
        let unknown = anyhow::Error::new(TaskError::UnknownTask("x".into()));
        assert_eq!(for_error(&unknown), UNKNOWN_TASK);

        let failed = anyhow::Error::new(TaskError::leaf("x", anyhow::anyhow!("exit 1")));
        assert_eq!(for_error(&failed), TASK_FAILED);

        let cycle = anyhow::Error::new(TaskError::AliasCycle {
            chain: vec!["a".into(), "a".into()],
        });
        assert_eq!(for_error(&cycle), CONFIG_ERROR);
    }

    #[test]
    fn test_config_errors() {
        let err: anyhow::Error = TaskweaveError::from(ConfigError::invalid("shell", "empty")).into();
        assert_eq!(for_error(&err), CONFIG_ERROR);
    }

    #[test]
    fn test_context_is_looked_through() {
        let err = anyhow::Error::new(TaskError::UnknownTask("x".into())).context("while running");
        assert_eq!(for_error(&err), UNKNOWN_TASK);
    }

    #[test]
    fn test_other_errors() {
        assert_eq!(for_error(&anyhow::anyhow!("boom")), ERROR);
        assert_ne!(SUCCESS, ERROR);
    }
}
