//! Plugin-gated build and test pipeline for cross-runtime suites.
//!
//! The `bridgecheck-pipeline` crate decides what runs, in what order, and
//! under which environment when verifying a polyglot interoperability
//! installation. A [`Plan`] lists step groups; each group is gated on a
//! runtime plugin being installed, builds its guest artifacts, runs one test
//! step, and removes what it generated.
//!
//! # Architecture
//!
//! The [`Orchestrator`] owns the plan and evaluates groups strictly in
//! order, one child process at a time. It consults a [`PluginProbe`] to skip
//! groups whose plugin is absent, hands available groups to the
//! [`BuildStepExecutor`] and [`TestStepExecutor`], and stops at the first
//! fatal fault. Executors spawn children through the [`ProcessRunner`]
//! trait; [`SystemRunner`] is the production implementation and test code
//! substitutes scripted doubles. The environment is captured once as an
//! [`EnvironmentContext`] and passed explicitly into every call.
//!
//! Faults are values: every [`PipelineError`] carries a [`FaultKind`] so
//! callers can tell configuration problems from build and test failures, and
//! cleanup problems never change the verdict.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use bridgecheck_pipeline::{
//!     EnvironmentContext, InstallRoot, Orchestrator, PipelineSettings, Plan, SystemRunner,
//! };
//!
//! let plan = Plan::load(Path::new("bridgecheck.json")).expect("plan loads");
//! let env = EnvironmentContext::from_process();
//! let probe = InstallRoot::from_env(&env, "METAFFI_HOME");
//! let settings = PipelineSettings::new(plan.base_dir());
//!
//! let report = Orchestrator::new(plan, SystemRunner, probe, env, settings).run();
//! assert!(report.is_success());
//! ```

pub mod availability;
pub mod build;
pub mod cleanup;
pub mod context;
pub mod environment;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod platform;
pub mod prerequisites;
pub mod process;
pub mod suite;

#[cfg(test)]
mod tests;

pub use self::availability::{InstallRoot, PluginProbe};
pub use self::build::BuildStepExecutor;
pub use self::cleanup::ArtifactCleaner;
pub use self::context::{
    DEFAULT_GUEST_TAG, DEFAULT_HOST_PLUGIN, DEFAULT_INSTALL_ROOT_VAR, DEFAULT_INTERPRETER,
    PipelineSettings, StepContext,
};
pub use self::environment::EnvironmentContext;
pub use self::error::{FaultKind, PipelineError};
pub use self::orchestrator::{GroupReport, GroupStatus, Orchestrator, RunReport, RunState};
pub use self::plan::{
    CompiledSuiteStep, PackageRequirement, Plan, PlanError, ScriptMode, ScriptStep, Step,
    StepGroup,
};
pub use self::platform::artifact_suffix;
pub use self::prerequisites::PrerequisiteInstaller;
pub use self::process::{ExecutionOutcome, Invocation, ProcessRunner, SystemRunner};
pub use self::suite::TestStepExecutor;
