//! Validate command

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use taskweave_core::config::{load_config, load_config_from_dir, Config};
use taskweave_tasks::TracingHooks;

use super::run::build_engine;
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Validate configuration and alias references
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Strict mode - treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

impl ValidateCommand {
    /// Execute the validate command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(strict = self.strict, "executing validate command");
        let cwd = std::env::current_dir()?;

        let mut errors: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        // Validate configuration
        let loaded = match &cli.config {
            Some(path) => load_config(path).map(|c| (c, path.clone())),
            None => load_config_from_dir(&cwd),
        };
        let (config, config_path): (Option<Config>, Option<PathBuf>) = match loaded {
            Ok((c, p)) => (Some(c), Some(p)),
            Err(e) => {
                errors.push(format!("Configuration: {}", e));
                (None, None)
            }
        };

        if let Some(ref cfg) = config {
            let (plan_errors, plan_warnings) = check_plans(cfg);
            errors.extend(plan_errors);
            warnings.extend(plan_warnings);
        }

        // If strict, promote warnings to errors
        if self.strict {
            errors.append(&mut warnings);
        }

        // Output
        let passed = errors.is_empty();

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "valid": passed,
                    "config_path": config_path.map(|p| p.to_string_lossy().to_string()),
                    "errors": errors,
                    "warnings": warnings
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{}", style("Validation Results").bold());
                    println!();

                    if let Some(path) = config_path {
                        println!("Config: {}", style(path.display()).cyan());
                        println!();
                    }

                    if !errors.is_empty() {
                        println!("{}", style("Errors:").red().bold());
                        for error in &errors {
                            println!("  {} {}", style("✗").red(), error);
                        }
                        println!();
                    }

                    if !warnings.is_empty() {
                        println!("{}", style("Warnings:").yellow().bold());
                        for warning in &warnings {
                            println!("  {} {}", style("!").yellow(), warning);
                        }
                        println!();
                    }

                    if passed {
                        if warnings.is_empty() {
                            println!("{}", style("✓ All checks passed").green().bold());
                        } else {
                            println!(
                                "{} with {} warning(s)",
                                style("✓ Validation passed").green().bold(),
                                warnings.len()
                            );
                        }
                    } else {
                        println!(
                            "{} with {} error(s)",
                            style("✗ Validation failed").red().bold(),
                            errors.len()
                        );
                    }
                }
            }
        }

        if !passed {
            std::process::exit(exit_codes::CONFIG_ERROR);
        }

        Ok(())
    }
}

/// Resolve every alias and the default task, collecting problems
fn check_plans(config: &Config) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let engine = build_engine(config, &PathBuf::from("."), Arc::new(TracingHooks));

    for (name, body) in &config.aliases {
        if body.is_empty() {
            warnings.push(format!("Alias '{}' is empty", name));
            continue;
        }
        if let Err(e) = engine.plan(name.as_str()) {
            errors.push(format!("Alias '{}': {}", name, e));
        }
    }

    if let Some(default) = &config.settings.default_task {
        if let Err(e) = engine.plan(default.clone()) {
            errors.push(format!("Default task '{}': {}", default, e));
        }
    }

    if config.tasks.is_empty() {
        warnings.push("No tasks configured".to_string());
    }

    (errors, warnings)
}
