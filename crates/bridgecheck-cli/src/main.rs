//! CLI entrypoint for `bridgecheck`.
//!
//! The binary delegates to [`bridgecheck_cli::run`], which loads
//! configuration, reads the plan, and drives the pipeline.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    bridgecheck_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
