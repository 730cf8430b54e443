//! CLI commands

mod completions;
mod list;
mod run;
mod validate;

pub use completions::CompletionsCommand;
pub use list::ListCommand;
pub use run::RunCommand;
pub use validate::ValidateCommand;
