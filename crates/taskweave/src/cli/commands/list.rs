//! List command

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use taskweave_core::config::Config;
use taskweave_core::TaskRef;

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// List configured tasks and aliases
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only list names, one per line
    #[arg(long)]
    pub names_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Entry<'a> {
    Task {
        name: &'a str,
        command: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<&'a str>,
    },
    Alias {
        name: &'a str,
        body: &'a [TaskRef],
    },
}

impl Entry<'_> {
    fn name(&self) -> &str {
        match self {
            Entry::Task { name, .. } | Entry::Alias { name, .. } => name,
        }
    }
}

fn entries(config: &Config) -> Vec<Entry<'_>> {
    let tasks = config.tasks.iter().map(|(name, task)| Entry::Task {
        name,
        command: &task.command,
        description: task.description.as_deref(),
    });
    let aliases = config
        .aliases
        .iter()
        .map(|(name, body)| Entry::Alias { name, body });

    let mut all: Vec<Entry<'_>> = tasks.chain(aliases).collect();
    all.sort_by(|a, b| a.name().cmp(b.name()));
    all
}

impl ListCommand {
    /// Execute the list command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(names_only = self.names_only, "executing list command");
        let (config, config_path, _) = cli.load_config()?;
        let entries = entries(&config);

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if self.names_only {
            for entry in &entries {
                println!("{}", entry.name());
            }
            return Ok(());
        }

        if entries.is_empty() {
            output::warning("No tasks or aliases configured");
            return Ok(());
        }

        if !cli.quiet {
            if let Some(path) = &config_path {
                let shown = output::path_style().apply_to(path.display()).to_string();
                println!("{}", output::key_value("Config", &shown));
                println!();
            }
        }

        println!("{}", output::header("Tasks"));
        for entry in &entries {
            match entry {
                Entry::Task {
                    name,
                    command,
                    description,
                } => {
                    print!("  {:<16} {}", output::task_style().apply_to(name), command);
                    match description {
                        Some(text) => println!("  {}", style(format!("# {}", text)).dim()),
                        None => println!(),
                    }
                }
                Entry::Alias { name, body } => {
                    println!(
                        "  {:<16} {}",
                        output::task_style().apply_to(name),
                        style(TaskRef::Group(body.to_vec())).yellow()
                    );
                }
            }
        }

        Ok(())
    }
}
