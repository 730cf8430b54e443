//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use taskweave_core::config::{load_config, load_config_or_default, Config};

use commands::{CompletionsCommand, ListCommand, RunCommand, ValidateCommand};

/// taskweave - run named shell tasks in series and in parallel
#[derive(Debug, Parser)]
#[command(name = "taskweave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Configuration file (default: search upward from the working directory)
    #[arg(short, long, global = true, env = "TASKWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run tasks and aliases
    Run(RunCommand),

    /// List configured tasks and aliases
    List(ListCommand),

    /// Validate configuration and alias references
    Validate(ValidateCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Run(ref cmd) => cmd.execute(&self),
            Commands::List(ref cmd) => cmd.execute(&self),
            Commands::Validate(ref cmd) => cmd.execute(&self),
            Commands::Completions(ref cmd) => cmd.execute(&self),
        }
    }

    /// Load the configuration named by `--config`, or search for one.
    ///
    /// Returns the config with its file path (if any) and the directory that
    /// task working directories are relative to.
    pub fn load_config(&self) -> anyhow::Result<(Config, Option<PathBuf>, PathBuf)> {
        let cwd = std::env::current_dir()?;
        let (config, path) = match &self.config {
            Some(path) => (load_config(path)?, Some(path.clone())),
            None => load_config_or_default(&cwd)?,
        };

        let base_dir = path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or(cwd);
        Ok((config, path, base_dir))
    }
}
