//! Command-line runtime for `bridgecheck`.
//!
//! The runtime splits leading configuration flags from the subcommand, loads
//! layered configuration, installs logging, reads the plan, and either lists
//! it (`plan`) or drives it through the pipeline (`run`, the default).
//! Output goes through caller-supplied writers so tests can capture it.
//!
//! Exit status is zero when every group passed or was skipped. A fatal
//! fault prints its category, message, and the failing child's captured
//! output to stderr and exits nonzero.

use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use bridgecheck_config::Config;
use bridgecheck_pipeline::{
    EnvironmentContext, InstallRoot, Orchestrator, PipelineSettings, Plan, PluginProbe,
    ProcessRunner, SystemRunner,
};
use clap::Parser;
use tracing::{info, warn};

mod cli;
mod config;
mod errors;
mod report;
pub mod telemetry;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
pub(crate) use errors::AppError;

/// Tracing target for CLI events.
const CLI_TARGET: &str = "bridgecheck_cli";

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(
        args,
        stdout,
        stderr,
        &OrthoConfigLoader,
        SystemRunner,
        EnvironmentContext::from_process(),
    )
}

/// Runs the CLI with substitutable configuration, process, and environment
/// sources.
pub(crate) fn run_with_loader<I, W, E, L, R>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    runner: R,
    env: EnvironmentContext,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    R: ProcessRunner,
{
    match execute(args, stdout, stderr, loader, runner, env) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            if let Err(write_error) = writeln!(stderr, "{error}") {
                warn!(target: CLI_TARGET, %write_error, %error, "failed to report error");
            }
            ExitCode::FAILURE
        }
    }
}

fn execute<I, W, E, L, R>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    runner: R,
    env: EnvironmentContext,
) -> Result<ExitCode, AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    R: ProcessRunner,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&arguments);
    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            write!(stdout, "{}", error.render()).map_err(AppError::Output)?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(error) => return Err(AppError::CliUsage(error)),
    };

    let config = loader.load(&split.config_arguments)?;
    telemetry::initialise(&config)?;

    let plan = Plan::load(config.plan_path().as_std_path())?;
    let probe = InstallRoot::from_env(&env, config.install_root_var());
    match cli.command() {
        CliCommand::Plan => {
            report::write_plan(&plan, &probe, stdout).map_err(AppError::Output)?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Run => {
            let settings = pipeline_settings(&config, plan.base_dir());
            let orchestrator = Orchestrator::new(plan, runner, probe, env, settings);
            run_plan(&orchestrator, config.require_plugin(), stdout, stderr)
        }
    }
}

fn pipeline_settings(config: &Config, archive_dir: &Path) -> PipelineSettings {
    PipelineSettings::new(archive_dir)
        .with_interpreter(config.interpreter())
        .with_install_root_var(config.install_root_var())
        .with_host_plugin(config.host_plugin())
        .with_guest_tag(config.guest_tag())
        .with_step_timeout(config.step_timeout())
}

fn run_plan<R, P, W, E>(
    orchestrator: &Orchestrator<R, P>,
    require_plugin: bool,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    R: ProcessRunner,
    P: PluginProbe,
    W: Write,
    E: Write,
{
    if require_plugin {
        orchestrator.ensure_any_available()?;
    }

    info!(
        target: CLI_TARGET,
        groups = orchestrator.plan().len(),
        "starting run"
    );
    let report = orchestrator.run();
    report::write_run_report(&report, stdout).map_err(AppError::Output)?;
    match report.error() {
        None => Ok(ExitCode::SUCCESS),
        Some(error) => {
            report::write_failure(error, stderr).map_err(AppError::Output)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests;
