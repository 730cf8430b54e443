//! Run command: execute tasks and aliases from the configuration

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use serde_json::{json, Value};
use tracing::info;

use taskweave_core::config::Config;
use taskweave_tasks::{
    Engine, EngineOptions, ShellTask, TaskDefinition, TaskError, TaskHooks, TaskRef, TracingHooks,
};

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Run tasks and aliases
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Task references to run in series (e.g. lint '["test", "build"]').
    /// An argument starting with '[' is a JSON group whose members run in parallel
    /// when it is not the only argument.
    pub tasks: Vec<String>,

    /// Shared data passed to every task as JSON (exported as TASKWEAVE_DATA)
    #[arg(long, default_value = "{}")]
    pub data: String,

    /// Show execution plan without running
    #[arg(long)]
    pub dry_run: bool,
}

impl RunCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(tasks = ?self.tasks, dry_run = self.dry_run, "executing run command");
        let (config, _, base_dir) = cli.load_config()?;

        let spec = parse_specification(&self.tasks, config.settings.default_task.as_ref())?;
        let data: Value = serde_json::from_str(&self.data)
            .with_context(|| format!("--data is not valid JSON: {}", self.data))?;

        let hooks: Arc<dyn TaskHooks<Value>> =
            if cli.quiet || cli.format == OutputFormat::Json {
                Arc::new(TracingHooks)
            } else {
                Arc::new(ConsoleHooks::new(cli.verbose))
            };
        let engine = build_engine(&config, &base_dir, hooks);
        let plan = engine.plan(spec.clone())?;

        if self.dry_run {
            match cli.format {
                OutputFormat::Json => {
                    let output = json!({ "spec": spec, "steps": plan.steps() });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    if !cli.quiet {
                        println!("{}", output::header(&format!("Execution plan for {}", spec)));
                        println!();
                        print!("{}", plan.outline());
                        println!();
                        println!(
                            "{}",
                            style("[DRY RUN - no tasks will be executed]").yellow().bold()
                        );
                    }
                }
            }
            return Ok(());
        }

        if !cli.quiet && cli.format == OutputFormat::Text {
            output::info(&format!(
                "Running {} ({} step{})",
                style(&spec).bold(),
                plan.len(),
                if plan.len() == 1 { "" } else { "s" }
            ));
            println!();
        }

        let outcome = engine.run_plan(plan, data).await;

        match (&outcome, cli.format) {
            (Ok(report), OutputFormat::Json) => {
                let summary = json!({
                    "success": true,
                    "executed": report.executed,
                    "duration_ms": report.duration.as_millis() as u64,
                    "result": report.result,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            (Ok(report), OutputFormat::Text) => {
                if !cli.quiet {
                    println!();
                    output::success(&format!(
                        "{} task{} completed {}",
                        report.executed,
                        if report.executed == 1 { "" } else { "s" },
                        output::duration(report.duration)
                    ));
                }
            }
            (Err(e), OutputFormat::Json) => {
                let summary = json!({
                    "success": false,
                    "task": e.task(),
                    "error": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            (Err(_), OutputFormat::Text) => {}
        }

        outcome.map(|_| ()).map_err(Into::into)
    }
}

/// Turn command-line arguments into a task specification.
///
/// One argument is used as-is, so a lone alias name keeps its own top level;
/// several arguments form a top-level sequence.
fn parse_specification(args: &[String], default: Option<&TaskRef>) -> anyhow::Result<TaskRef> {
    let mut references = args
        .iter()
        .map(|arg| parse_reference(arg))
        .collect::<anyhow::Result<Vec<_>>>()?;

    match references.len() {
        0 => default.cloned().ok_or_else(|| TaskError::MissingSpecification.into()),
        1 => Ok(references.swap_remove(0)),
        _ => Ok(TaskRef::Group(references)),
    }
}

fn parse_reference(arg: &str) -> anyhow::Result<TaskRef> {
    if arg.trim_start().starts_with('[') {
        serde_json::from_str(arg).with_context(|| format!("Invalid task group: {}", arg))
    } else {
        Ok(TaskRef::name(arg))
    }
}

/// Register every configured task and alias with a fresh engine
pub(crate) fn build_engine(
    config: &Config,
    base_dir: &Path,
    hooks: Arc<dyn TaskHooks<Value>>,
) -> Engine<Value> {
    let mut engine = Engine::with_options(EngineOptions::new().with_shared_hooks(hooks));

    for (name, task) in &config.tasks {
        let cwd = match &task.cwd {
            Some(cwd) => base_dir.join(cwd),
            None => base_dir.to_path_buf(),
        };
        let shell = ShellTask::new(&task.command)
            .with_shell(&config.settings.shell)
            .with_cwd(cwd)
            .with_env(task.env.clone());
        engine.register(name.clone(), TaskDefinition::capability(shell));
    }

    for (name, body) in &config.aliases {
        engine.register(name.clone(), TaskDefinition::Alias(body.clone()));
    }

    engine
}

/// Console hooks with live per-task lines
struct ConsoleHooks {
    verbose: bool,
    /// Start times per name, oldest first; a name can be running more than once
    started: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl ConsoleHooks {
    fn new(verbose: bool) -> Self {
        Self {
            verbose,
            started: Mutex::new(HashMap::new()),
        }
    }

    fn elapsed(&self, task: &str) -> String {
        let mut started = self
            .started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(queue) = started.get_mut(task) else {
            return String::new();
        };
        let start = queue.pop_front();
        if queue.is_empty() {
            started.remove(task);
        }
        start
            .map(|start| output::duration(start.elapsed()))
            .unwrap_or_default()
    }
}

impl TaskHooks<Value> for ConsoleHooks {
    fn on_start(&self, task: &str, _data: &Value) {
        self.started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(task.to_string())
            .or_default()
            .push_back(Instant::now());
        println!("  {} {}", style("▸").dim(), output::task_style().apply_to(task));
    }

    fn on_finish(&self, task: &str, _data: &Value, result: Result<&Value, &TaskError>) {
        let elapsed = self.elapsed(task);
        match result {
            Ok(value) => {
                println!("  {} {} {}", style("✓").green(), style(task).green(), elapsed);
                if self.verbose {
                    if let Some(stdout) = value.get("stdout").and_then(Value::as_str) {
                        for line in stdout.lines() {
                            println!("    {} {}", style(format!("[{}]", task)).dim(), line);
                        }
                    }
                }
            }
            Err(error) => {
                println!(
                    "  {} {} {} {}",
                    style("✗").red(),
                    style(task).red(),
                    elapsed,
                    style(error).red().dim()
                );
            }
        }
    }
}
