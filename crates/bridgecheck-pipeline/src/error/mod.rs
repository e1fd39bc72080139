//! Domain errors raised while executing a pipeline.
//!
//! Every fault carries a [`FaultKind`] tag so the orchestrator can decide
//! between aborting the run and logging a non-fatal problem without relying
//! on unwinding. Failures of a spawned process keep the full
//! [`ExecutionOutcome`] so the captured streams can be surfaced verbatim.
//! I/O errors are wrapped in `Arc` to satisfy the `result_large_err` Clippy
//! lint and to keep the enum cheaply cloneable.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::plan::PlanError;
use crate::process::ExecutionOutcome;

/// Classification of a pipeline fault.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::FaultKind;
///
/// assert_eq!(FaultKind::Build.as_str(), "build");
/// assert!(!FaultKind::Cleanup.is_fatal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Missing environment variable, archive, or an invalid plan.
    Configuration,
    /// A build, codegen, or prerequisite step exited with a nonzero status.
    Build,
    /// The compile or run phase of a test step exited with a nonzero status.
    Test,
    /// A generated artifact could not be deleted.
    Cleanup,
}

impl FaultKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Build => "build",
            Self::Test => "test",
            Self::Cleanup => "cleanup",
        }
    }

    /// Returns `true` when a fault of this kind aborts the pipeline.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Cleanup)
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors arising while executing step groups.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A required environment variable was not set.
    #[error("group '{group}' requires environment variable {variable}, which is not set")]
    MissingVariable {
        /// Group that needed the variable.
        group: String,
        /// Name of the missing variable.
        variable: String,
    },

    /// A fixed archive expected next to the plan was absent.
    #[error("group '{group}' requires archive {path}, which does not exist")]
    MissingArchive {
        /// Group that needed the archive.
        group: String,
        /// Path that was checked.
        path: PathBuf,
    },

    /// None of the plugins named by the plan is installed.
    #[error("no guest plugins installed (looked for: {})", plugins.join(", "))]
    NoPluginsInstalled {
        /// Plugin names the plan refers to.
        plugins: Vec<String>,
    },

    /// The plan document could not be loaded.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// An interpreter package could not be installed.
    #[error(
        "group '{group}' could not install package '{package}' (exit status {})",
        outcome.exit_code()
    )]
    PrerequisiteFailed {
        /// Group declaring the prerequisite.
        group: String,
        /// Package passed to the installer.
        package: String,
        /// Outcome of the failed install.
        outcome: Box<ExecutionOutcome>,
    },

    /// The build step exited with a nonzero status.
    #[error(
        "build step of group '{group}' failed with exit status {}: {}",
        outcome.exit_code(),
        outcome.command()
    )]
    BuildFailed {
        /// Group whose build failed.
        group: String,
        /// Outcome of the failed build.
        outcome: Box<ExecutionOutcome>,
    },

    /// The compile or run phase of the test step exited with a nonzero status.
    #[error(
        "test step of group '{group}' failed with exit status {}: {}",
        outcome.exit_code(),
        outcome.command()
    )]
    TestFailed {
        /// Group whose test failed.
        group: String,
        /// Outcome of the failed phase.
        outcome: Box<ExecutionOutcome>,
    },

    /// A generated artifact could not be removed.
    #[error("failed to remove {path}: {source}")]
    Cleanup {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl PipelineError {
    /// Returns the fault classification for this error.
    #[must_use]
    pub const fn kind(&self) -> FaultKind {
        match self {
            Self::MissingVariable { .. }
            | Self::MissingArchive { .. }
            | Self::NoPluginsInstalled { .. }
            | Self::Plan(_) => FaultKind::Configuration,
            Self::PrerequisiteFailed { .. } | Self::BuildFailed { .. } => FaultKind::Build,
            Self::TestFailed { .. } => FaultKind::Test,
            Self::Cleanup { .. } => FaultKind::Cleanup,
        }
    }

    /// Returns the captured outcome of the failing invocation, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<&ExecutionOutcome> {
        match self {
            Self::PrerequisiteFailed { outcome, .. }
            | Self::BuildFailed { outcome, .. }
            | Self::TestFailed { outcome, .. } => Some(outcome.as_ref()),
            _ => None,
        }
    }
}
