//! Interpreter package prerequisites.
//!
//! Before a group builds, each declared module is probed with an import. A
//! module that fails to import is installed through the interpreter's
//! package installer; an install that exits nonzero fails the group.

use tracing::{debug, info};

use crate::context::StepContext;
use crate::error::PipelineError;
use crate::plan::PackageRequirement;
use crate::process::{Invocation, ProcessRunner};

/// Tracing target for prerequisite checks.
const PREREQUISITES_TARGET: &str = "bridgecheck_pipeline::prerequisites";

/// Probes and installs interpreter packages through a [`ProcessRunner`].
#[derive(Debug, Clone)]
pub struct PrerequisiteInstaller<R> {
    runner: R,
}

impl<R> PrerequisiteInstaller<R> {
    /// Creates an installer that spawns through `runner`.
    #[must_use]
    pub const fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: ProcessRunner> PrerequisiteInstaller<R> {
    /// Ensures every requirement is importable, stopping at the first
    /// failed install.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PrerequisiteFailed`] when an install exits
    /// nonzero.
    pub fn ensure_all(
        &self,
        requirements: &[PackageRequirement],
        ctx: &StepContext<'_>,
    ) -> Result<(), PipelineError> {
        requirements
            .iter()
            .try_for_each(|requirement| self.ensure(requirement, ctx))
    }

    /// Ensures `requirement` is importable, installing it when it is not.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PrerequisiteFailed`] when the install exits
    /// nonzero.
    pub fn ensure(
        &self,
        requirement: &PackageRequirement,
        ctx: &StepContext<'_>,
    ) -> Result<(), PipelineError> {
        let probe = interpreter(ctx)
            .arg("-c")
            .arg(format!("import {}", requirement.module()));
        if self.runner.run(&probe, ctx.env()).success() {
            debug!(
                target: PREREQUISITES_TARGET,
                group = ctx.group(),
                module = requirement.module(),
                "module already importable"
            );
            return Ok(());
        }

        info!(
            target: PREREQUISITES_TARGET,
            group = ctx.group(),
            package = requirement.package(),
            "installing missing package"
        );
        let install = interpreter(ctx)
            .arg("-m")
            .arg("pip")
            .arg("install")
            .arg(requirement.package());
        let outcome = self.runner.run(&install, ctx.env());
        if outcome.success() {
            Ok(())
        } else {
            Err(PipelineError::PrerequisiteFailed {
                group: ctx.group().to_owned(),
                package: requirement.package().to_owned(),
                outcome: Box::new(outcome),
            })
        }
    }
}

fn interpreter(ctx: &StepContext<'_>) -> Invocation {
    let settings = ctx.settings();
    Invocation::new(settings.interpreter(), settings.archive_dir()).with_timeout(ctx.timeout())
}
