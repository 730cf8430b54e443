//! Shell completions

use std::io::{self, Write};

use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use tracing::info;

use crate::cli::Cli;

/// Print a completion script for `shell` to stdout
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsCommand {
    pub fn execute(&self, _cli: &Cli) -> anyhow::Result<()> {
        info!(shell = %self.shell, "executing completions command");
        write_completions(self.shell, &mut io::stdout());
        Ok(())
    }
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    generate(shell, &mut Cli::command(), "taskweave", out);
}
