//! taskweave Core - shared types, errors and configuration
//!
//! This crate provides the task reference type used by both the engine and
//! configuration files, the configuration error taxonomy, and loading and
//! validation of `taskweave.yaml` / `taskweave.toml` files.

pub mod config;
pub mod error;
pub mod types;

pub use error::{ConfigError, Result, TaskweaveError};
pub use types::TaskRef;
