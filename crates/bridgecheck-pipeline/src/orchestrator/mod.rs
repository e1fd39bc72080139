//! Fail-fast execution of a plan.
//!
//! The [`Orchestrator`] walks the plan's groups in order. A group whose
//! plugin is not installed is skipped without spawning anything. An
//! available group ensures its prerequisites, runs its build step, then its
//! test step; the first nonzero status or configuration fault aborts the
//! whole run. Generated artifacts are removed on every exit path of a group
//! that started, and cleanup problems are only logged.
//!
//! ```text
//! Pending -> Running(0) -> Running(i) -> ... -> Completed
//!                           |      \
//!                     Skipped(i)   Aborted(i, cause)
//!                           |
//!                      Running(i + 1)
//! ```

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::availability::PluginProbe;
use crate::build::BuildStepExecutor;
use crate::cleanup::ArtifactCleaner;
use crate::context::{PipelineSettings, StepContext};
use crate::environment::EnvironmentContext;
use crate::error::PipelineError;
use crate::plan::{Plan, StepGroup};
use crate::prerequisites::PrerequisiteInstaller;
use crate::process::{ExecutionOutcome, ProcessRunner};
use crate::suite::TestStepExecutor;

/// Tracing target for orchestration events.
const ORCHESTRATOR_TARGET: &str = "bridgecheck_pipeline::orchestrator";

/// State of a pipeline run.
#[derive(Debug, Clone)]
pub enum RunState {
    /// No group has started.
    Pending,
    /// The group at this index is being evaluated.
    Running(usize),
    /// The group at this index was skipped because its plugin is absent.
    Skipped(usize),
    /// The group at this index failed fatally. Terminal.
    Aborted {
        /// Index of the failing group.
        group: usize,
        /// The fatal fault.
        error: PipelineError,
    },
    /// Every group was skipped or passed. Terminal.
    Completed,
}

impl RunState {
    /// Returns `true` for `Aborted` and `Completed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted { .. } | Self::Completed)
    }
}

/// Outcome of one group within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    /// The plugin was absent; nothing ran.
    Skipped,
    /// Build and test exited zero.
    Passed,
    /// A fatal fault aborted the run in this group.
    Failed,
}

impl GroupStatus {
    /// Returns the status label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "SKIPPED",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report line for one evaluated group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    name: String,
    plugin: String,
    status: GroupStatus,
    cleanup_failures: usize,
    outputs: Vec<ExecutionOutcome>,
}

impl GroupReport {
    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin gating the group.
    #[must_use]
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Returns the group's status.
    #[must_use]
    pub const fn status(&self) -> GroupStatus {
        self.status
    }

    /// Returns how many artifacts could not be removed.
    #[must_use]
    pub const fn cleanup_failures(&self) -> usize {
        self.cleanup_failures
    }

    /// Returns the captured outcomes of the build and test steps that
    /// succeeded, in execution order. A failing step's outcome travels with
    /// the run's fault instead.
    #[must_use]
    pub fn outputs(&self) -> &[ExecutionOutcome] {
        &self.outputs
    }
}

/// Result of a whole run: per-group reports and the terminal state.
///
/// Groups after an abort are absent from the report because they were never
/// evaluated.
#[derive(Debug, Clone)]
pub struct RunReport {
    groups: Vec<GroupReport>,
    state: RunState,
}

impl RunReport {
    /// Returns the evaluated groups in plan order.
    #[must_use]
    pub fn groups(&self) -> &[GroupReport] {
        &self.groups
    }

    /// Returns the terminal state.
    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    /// Returns `true` when the run completed without a fatal fault.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.state, RunState::Completed)
    }

    /// Returns the fault that aborted the run, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&PipelineError> {
        match &self.state {
            RunState::Aborted { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns the number of groups with `status`.
    #[must_use]
    pub fn count(&self, status: GroupStatus) -> usize {
        self.groups
            .iter()
            .filter(|group| group.status == status)
            .count()
    }
}

/// Drives a [`Plan`] through the executors.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::{
///     EnvironmentContext, InstallRoot, Orchestrator, PipelineSettings, Plan, ScriptMode,
///     ScriptStep, Step, StepGroup, SystemRunner,
/// };
///
/// let group = StepGroup::new(
///     "sanity-go",
///     "go",
///     Step::Script(ScriptStep::new("/suite/test_go.py", ScriptMode::UnitTest)),
/// );
/// let plan = Plan::new(vec![group], "/suite").unwrap();
/// let env = EnvironmentContext::default();
/// let probe = InstallRoot::from_env(&env, "METAFFI_HOME");
///
/// let orchestrator =
///     Orchestrator::new(plan, SystemRunner, probe, env, PipelineSettings::new("/suite"));
/// let report = orchestrator.run();
/// assert!(report.is_success());
/// assert_eq!(report.groups().len(), 1);
/// ```
#[derive(Debug)]
pub struct Orchestrator<R, P> {
    plan: Plan,
    runner: R,
    probe: P,
    env: EnvironmentContext,
    settings: PipelineSettings,
}

impl<R, P> Orchestrator<R, P> {
    /// Creates an orchestrator over `plan`.
    #[must_use]
    pub const fn new(
        plan: Plan,
        runner: R,
        probe: P,
        env: EnvironmentContext,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            plan,
            runner,
            probe,
            env,
            settings,
        }
    }

    /// Returns the plan being executed.
    #[must_use]
    pub const fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Returns the plugin probe.
    #[must_use]
    pub const fn probe(&self) -> &P {
        &self.probe
    }
}

impl<R, P: PluginProbe> Orchestrator<R, P> {
    /// Fails when none of the plan's plugins is installed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoPluginsInstalled`] when the plan names
    /// plugins and none of them is available.
    pub fn ensure_any_available(&self) -> Result<(), PipelineError> {
        let plugins = self.plan.plugins();
        if plugins.is_empty() || plugins.iter().any(|plugin| self.probe.is_available(plugin)) {
            return Ok(());
        }
        Err(PipelineError::NoPluginsInstalled {
            plugins: plugins.into_iter().map(str::to_owned).collect(),
        })
    }
}

impl<R: ProcessRunner, P: PluginProbe> Orchestrator<R, P> {
    /// Runs the plan to a terminal state.
    #[must_use]
    pub fn run(&self) -> RunReport {
        let mut groups = Vec::with_capacity(self.plan.len());
        let mut state = RunState::Pending;
        while !state.is_terminal() {
            state = match state {
                RunState::Pending => RunState::Running(0),
                RunState::Running(index) => match self.plan.groups().get(index) {
                    Some(group) => self.evaluate(index, group, &mut groups),
                    None => RunState::Completed,
                },
                RunState::Skipped(index) => RunState::Running(index + 1),
                terminal @ (RunState::Aborted { .. } | RunState::Completed) => terminal,
            };
        }

        match &state {
            RunState::Aborted { group, error } => error!(
                target: ORCHESTRATOR_TARGET,
                group_index = group,
                fault = %error.kind(),
                "pipeline aborted"
            ),
            _ => info!(
                target: ORCHESTRATOR_TARGET,
                groups = groups.len(),
                "pipeline completed"
            ),
        }
        RunReport { groups, state }
    }

    fn evaluate(
        &self,
        index: usize,
        group: &StepGroup,
        reports: &mut Vec<GroupReport>,
    ) -> RunState {
        let mut report = GroupReport {
            name: group.name().to_owned(),
            plugin: group.plugin().to_owned(),
            status: GroupStatus::Skipped,
            cleanup_failures: 0,
            outputs: Vec::new(),
        };

        if !self.probe.is_available(group.plugin()) {
            info!(
                target: ORCHESTRATOR_TARGET,
                group = group.name(),
                plugin = group.plugin(),
                "plugin not installed; skipping group"
            );
            reports.push(report);
            return RunState::Skipped(index);
        }

        info!(
            target: ORCHESTRATOR_TARGET,
            group = group.name(),
            plugin = group.plugin(),
            "running group"
        );
        let ctx = StepContext::new(group, &self.env, &self.settings);
        let result = self.build_and_test(group, &ctx, &mut report.outputs);
        report.cleanup_failures = self.clean(group);

        let next = match result {
            Ok(()) => {
                report.status = GroupStatus::Passed;
                RunState::Running(index + 1)
            }
            Err(error) => {
                report.status = GroupStatus::Failed;
                error!(
                    target: ORCHESTRATOR_TARGET,
                    group = group.name(),
                    fault = %error.kind(),
                    %error,
                    "group failed"
                );
                RunState::Aborted {
                    group: index,
                    error,
                }
            }
        };
        reports.push(report);
        next
    }

    fn build_and_test(
        &self,
        group: &StepGroup,
        ctx: &StepContext<'_>,
        outputs: &mut Vec<ExecutionOutcome>,
    ) -> Result<(), PipelineError> {
        PrerequisiteInstaller::new(&self.runner).ensure_all(group.requirements(), ctx)?;

        if let Some(build) = group.build() {
            let outcome = BuildStepExecutor::new(&self.runner).execute(build, ctx);
            log_step_output(group, "build", &outcome);
            if !outcome.success() {
                return Err(PipelineError::BuildFailed {
                    group: group.name().to_owned(),
                    outcome: Box::new(outcome),
                });
            }
            outputs.push(outcome);
        }

        let outcome = TestStepExecutor::new(&self.runner).execute(group.test(), ctx)?;
        log_step_output(group, "test", &outcome);
        if !outcome.success() {
            return Err(PipelineError::TestFailed {
                group: group.name().to_owned(),
                outcome: Box::new(outcome),
            });
        }
        outputs.push(outcome);
        Ok(())
    }

    fn clean(&self, group: &StepGroup) -> usize {
        let artifacts = group.artifact_paths(self.settings.guest_tag());
        let failures = ArtifactCleaner.remove_all(artifacts.iter().map(PathBuf::as_path));
        if failures > 0 {
            warn!(
                target: ORCHESTRATOR_TARGET,
                group = group.name(),
                failures,
                "some artifacts could not be removed"
            );
        }
        failures
    }
}

fn log_step_output(group: &StepGroup, step: &str, outcome: &ExecutionOutcome) {
    debug!(
        target: ORCHESTRATOR_TARGET,
        group = group.name(),
        step,
        command = outcome.command(),
        exit_code = outcome.exit_code(),
        stdout = outcome.stdout(),
        stderr = outcome.stderr(),
        "step output"
    );
}
