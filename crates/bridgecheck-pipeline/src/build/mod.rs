//! Build and codegen step execution.
//!
//! A build step runs a script through the host interpreter with the script's
//! own directory as working directory, so artifacts land next to it. The
//! executor only reports the outcome; the orchestrator treats a nonzero
//! status as a fatal build failure.

use tracing::debug;

use crate::context::StepContext;
use crate::plan::{ScriptMode, ScriptStep};
use crate::process::{ExecutionOutcome, Invocation, ProcessRunner};

/// Tracing target for build steps.
const BUILD_TARGET: &str = "bridgecheck_pipeline::build";

/// Module passed to `-m` for unit-test discovery.
const UNITTEST_MODULE: &str = "unittest";

/// Runs build scripts through a [`ProcessRunner`].
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::{
///     BuildStepExecutor, EnvironmentContext, ExecutionOutcome, Invocation, PipelineSettings,
///     ProcessRunner, ScriptMode, ScriptStep, Step, StepContext, StepGroup,
/// };
///
/// struct Echo;
/// impl ProcessRunner for Echo {
///     fn run(&self, invocation: &Invocation, _env: &EnvironmentContext) -> ExecutionOutcome {
///         ExecutionOutcome::new(invocation.command_line(), "", "", 0)
///     }
/// }
///
/// let group = StepGroup::new(
///     "sanity-go",
///     "go",
///     Step::Script(ScriptStep::new("/suite/test_go.py", ScriptMode::UnitTest)),
/// )
/// .with_build("/suite/go/build_guest.py");
/// let env = EnvironmentContext::default();
/// let settings = PipelineSettings::new("/suite").with_interpreter("python3");
/// let ctx = StepContext::new(&group, &env, &settings);
///
/// let build = group.build().unwrap();
/// let outcome = BuildStepExecutor::new(Echo).execute(build, &ctx);
/// assert_eq!(outcome.command(), "python3 /suite/go/build_guest.py");
/// ```
#[derive(Debug, Clone)]
pub struct BuildStepExecutor<R> {
    runner: R,
}

impl<R> BuildStepExecutor<R> {
    /// Creates an executor that spawns through `runner`.
    #[must_use]
    pub const fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: ProcessRunner> BuildStepExecutor<R> {
    /// Runs the build script and returns its outcome.
    #[must_use]
    pub fn execute(&self, step: &ScriptStep, ctx: &StepContext<'_>) -> ExecutionOutcome {
        debug!(
            target: BUILD_TARGET,
            group = ctx.group(),
            script = %step.path().display(),
            "running build step"
        );
        self.runner.run(&script_invocation(step, ctx), ctx.env())
    }
}

/// Builds the interpreter invocation for a script step.
///
/// Plain scripts run as `<interpreter> <script>`; unit-test scripts run as
/// `<interpreter> -m unittest <script>`. Both use the script's directory as
/// working directory and the context's effective timeout.
#[must_use]
pub fn script_invocation(step: &ScriptStep, ctx: &StepContext<'_>) -> Invocation {
    let mut invocation = Invocation::new(ctx.settings().interpreter(), step.directory());
    if step.mode() == ScriptMode::UnitTest {
        invocation = invocation.arg("-m").arg(UNITTEST_MODULE);
    }
    invocation.arg(step.path()).with_timeout(ctx.timeout())
}
