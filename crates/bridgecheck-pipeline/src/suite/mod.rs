//! Test step execution.
//!
//! Script steps run through the interpreter, either plainly or through its
//! unit-test discovery. Compiled suites run in two phases: a compile
//! invocation and, only when it exits zero, a console-runner invocation
//! sharing the same classpath. Compiled classes left next to the source are
//! removed after either phase ends the step.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::build::script_invocation;
use crate::cleanup::ArtifactCleaner;
use crate::context::StepContext;
use crate::environment::{EnvironmentContext, JAVA_HOME_VAR};
use crate::error::PipelineError;
use crate::plan::{CompiledSuiteStep, Step};
use crate::platform::PATH_SEPARATOR;
use crate::process::{ExecutionOutcome, Invocation, ProcessRunner};

/// Tracing target for test steps.
const SUITE_TARGET: &str = "bridgecheck_pipeline::suite";

/// Console launcher archive expected next to the plan.
pub const JUNIT_CONSOLE_ARCHIVE: &str = "junit-platform-console-standalone-1.10.2.jar";
/// Matcher library archive expected next to the plan.
pub const HAMCREST_ARCHIVE: &str = "hamcrest-core-1.3.jar";
/// Host API archive inside the host plugin directory.
pub const API_ARCHIVE: &str = "metaffi.api.jar";

const COMPILER: &str = "javac";
const LAUNCHER: &str = "java";

/// Returns the bridge archive name for the host plugin.
#[must_use]
pub fn bridge_archive(host_plugin: &str) -> String {
    format!("xllr.{host_plugin}.bridge.jar")
}

/// Joins classpath entries with the platform path separator.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::suite::join_classpath;
///
/// let classpath = join_classpath([".", "a.jar", "b.jar"]);
/// let separator = bridgecheck_pipeline::platform::PATH_SEPARATOR;
/// assert_eq!(classpath, format!(".{separator}a.jar{separator}b.jar").as_str());
/// ```
#[must_use]
pub fn join_classpath<I, S>(entries: I) -> OsString
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut buffer = [0_u8; 4];
    let separator: &str = PATH_SEPARATOR.encode_utf8(&mut buffer);
    let mut classpath = OsString::new();
    for (index, entry) in entries.into_iter().enumerate() {
        if index > 0 {
            classpath.push(separator);
        }
        classpath.push(entry.as_ref());
    }
    classpath
}

/// Assembles the compiled-suite classpath for the group in `ctx`.
///
/// The entries are the current directory, the console launcher and matcher
/// archives from the settings' archive directory, then the host bridge and
/// API archives under `<install root>/<host plugin>`.
///
/// # Errors
///
/// Returns [`PipelineError::MissingVariable`] when the installation root is
/// unset and [`PipelineError::MissingArchive`] when a fixed archive is absent.
pub fn assemble_classpath(ctx: &StepContext<'_>) -> Result<OsString, PipelineError> {
    let settings = ctx.settings();
    let root = ctx
        .env()
        .require_path(settings.install_root_var(), ctx.group())?;
    let junit = fixed_archive(ctx, JUNIT_CONSOLE_ARCHIVE)?;
    let hamcrest = fixed_archive(ctx, HAMCREST_ARCHIVE)?;
    let host = root.join(settings.host_plugin());
    Ok(join_classpath([
        PathBuf::from("."),
        junit,
        hamcrest,
        host.join(bridge_archive(settings.host_plugin())),
        host.join(API_ARCHIVE),
    ]))
}

fn fixed_archive(ctx: &StepContext<'_>, name: &str) -> Result<PathBuf, PipelineError> {
    let path = ctx.settings().archive_dir().join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(PipelineError::MissingArchive {
            group: ctx.group().to_owned(),
            path,
        })
    }
}

/// Resolves a JDK tool under `$JAVA_HOME/bin`, falling back to `PATH`.
fn java_tool(env: &EnvironmentContext, tool: &str) -> OsString {
    env.path(JAVA_HOME_VAR).map_or_else(
        || OsString::from(tool),
        |home| home.join("bin").join(tool).into_os_string(),
    )
}

/// Runs test steps through a [`ProcessRunner`].
#[derive(Debug, Clone)]
pub struct TestStepExecutor<R> {
    runner: R,
}

impl<R> TestStepExecutor<R> {
    /// Creates an executor that spawns through `runner`.
    #[must_use]
    pub const fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: ProcessRunner> TestStepExecutor<R> {
    /// Runs `step` and returns the outcome that decides the group.
    ///
    /// For a compiled suite this is the compile outcome when compilation
    /// fails, otherwise the run outcome.
    ///
    /// # Errors
    ///
    /// Returns a configuration fault when the classpath cannot be assembled.
    /// No process is spawned in that case.
    pub fn execute(
        &self,
        step: &Step,
        ctx: &StepContext<'_>,
    ) -> Result<ExecutionOutcome, PipelineError> {
        match step {
            Step::Script(script) => {
                debug!(
                    target: SUITE_TARGET,
                    group = ctx.group(),
                    script = %script.path().display(),
                    "running script test"
                );
                Ok(self.runner.run(&script_invocation(script, ctx), ctx.env()))
            }
            Step::CompiledSuite(suite) => self.run_suite(suite, ctx),
        }
    }

    fn run_suite(
        &self,
        suite: &CompiledSuiteStep,
        ctx: &StepContext<'_>,
    ) -> Result<ExecutionOutcome, PipelineError> {
        let classpath = assemble_classpath(ctx)?;
        let directory = suite.directory();

        debug!(
            target: SUITE_TARGET,
            group = ctx.group(),
            suite = suite.suite_name(),
            "compiling suite"
        );
        let compile = Invocation::new(java_tool(ctx.env(), COMPILER), directory)
            .arg("-cp")
            .arg(&classpath)
            .arg(suite.source())
            .with_timeout(ctx.timeout());
        let compiled = self.runner.run(&compile, ctx.env());
        if !compiled.success() {
            warn!(
                target: SUITE_TARGET,
                group = ctx.group(),
                suite = suite.suite_name(),
                exit_code = compiled.exit_code(),
                "compilation failed; skipping run phase"
            );
            remove_classes(directory);
            return Ok(compiled);
        }

        debug!(
            target: SUITE_TARGET,
            group = ctx.group(),
            suite = suite.suite_name(),
            "running suite"
        );
        let launcher = ctx.settings().archive_dir().join(JUNIT_CONSOLE_ARCHIVE);
        let run = Invocation::new(java_tool(ctx.env(), LAUNCHER), directory)
            .arg("-jar")
            .arg(launcher)
            .arg("-cp")
            .arg(&classpath)
            .arg("-c")
            .arg(suite.suite_name())
            .with_timeout(ctx.timeout());
        let outcome = self.runner.run(&run, ctx.env());
        remove_classes(directory);
        Ok(outcome)
    }
}

fn remove_classes(directory: &Path) {
    let failures = ArtifactCleaner.remove_compiled_classes(directory);
    if failures > 0 {
        debug!(
            target: SUITE_TARGET,
            directory = %directory.display(),
            failures,
            "compiled classes left behind"
        );
    }
}
