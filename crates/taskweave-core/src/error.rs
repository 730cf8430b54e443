//! Error types for taskweave

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using TaskweaveError
pub type Result<T> = std::result::Result<T, TaskweaveError>;

/// Main error type for configuration-level operations
#[derive(Debug, Error)]
pub enum TaskweaveError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskweaveError {
    /// Whether this error originated from configuration loading or validation
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl ConfigError {
    /// Shorthand for an [`ConfigError::InvalidValue`]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
