//! Command-line argument definitions for `bridgecheck`.

use clap::{Parser, Subcommand};

/// Plugin-gated build and test runner for cross-runtime suites.
#[derive(Parser, Debug)]
#[command(name = "bridgecheck", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Action to perform. Defaults to `run`.
    #[command(subcommand)]
    pub(crate) command: Option<CliCommand>,
}

impl Cli {
    /// Returns the requested command, falling back to `run`.
    pub(crate) fn command(&self) -> CliCommand {
        self.command.unwrap_or_default()
    }
}

/// Structured subcommands.
#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Builds and tests every group in plan order, stopping at the first
    /// failure.
    #[default]
    Run,
    /// Lists the plan's groups and whether each plugin is installed.
    Plan,
}
