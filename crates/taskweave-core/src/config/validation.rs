//! Configuration validation
//!
//! Checks shape only: every referenced name must be defined. Alias cycles are
//! left to the engine's resolver, which reports the full chain.

use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::types::TaskRef;

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_settings(config)?;
    validate_tasks(config)?;
    validate_aliases(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_settings(config: &Config) -> Result<()> {
    if config.settings.shell.trim().is_empty() {
        return Err(ConfigError::invalid("settings.shell", "shell cannot be empty").into());
    }

    if let Some(default_task) = &config.settings.default_task {
        if default_task.is_empty() {
            return Err(ConfigError::invalid(
                "settings.default_task",
                "default task cannot be empty",
            )
            .into());
        }
        check_references(config, "settings.default_task", default_task)?;
    }

    Ok(())
}

fn validate_tasks(config: &Config) -> Result<()> {
    for (name, task) in &config.tasks {
        if name.trim().is_empty() {
            return Err(ConfigError::invalid("tasks", "task name cannot be empty").into());
        }

        if task.command.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("tasks.{}.command", name),
                "command cannot be empty",
            )
            .into());
        }

        if config.aliases.contains_key(name) {
            return Err(ConfigError::invalid(
                format!("aliases.{}", name),
                "name is already defined as a task",
            )
            .into());
        }
    }

    Ok(())
}

fn validate_aliases(config: &Config) -> Result<()> {
    for (name, body) in &config.aliases {
        if name.trim().is_empty() {
            return Err(ConfigError::invalid("aliases", "alias name cannot be empty").into());
        }

        let field = format!("aliases.{}", name);
        for reference in body {
            check_references(config, &field, reference)?;
        }
    }

    Ok(())
}

fn check_references(config: &Config, field: &str, reference: &TaskRef) -> Result<()> {
    for name in reference.names() {
        if !config.defines(name) {
            return Err(ConfigError::invalid(
                field,
                format!("references undefined task '{}'", name),
            )
            .into());
        }
    }
    Ok(())
}
