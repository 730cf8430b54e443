//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::types::TaskRef;

/// Main configuration for taskweave
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global settings
    pub settings: Settings,

    /// Leaf tasks, keyed by name
    pub tasks: BTreeMap<String, TaskConfig>,

    /// Named groups of task references
    pub aliases: BTreeMap<String, Vec<TaskRef>>,
}

impl Config {
    /// Whether `name` is defined as a task or an alias
    pub fn defines(&self, name: &str) -> bool {
        self.tasks.contains_key(name) || self.aliases.contains_key(name)
    }
}

/// Global settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Shell program used to run task commands (invoked as `<shell> -c <command>`)
    pub shell: String,

    /// Reference run when no tasks are given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_task: Option<TaskRef>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            default_task: None,
        }
    }
}

/// A shell-command task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Shell command to execute
    pub command: String,

    /// Working directory, relative to the config file's directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Environment variables
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Human-readable description, shown by `list`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TaskConfig {
    /// Create a task with just a command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Set the working directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
