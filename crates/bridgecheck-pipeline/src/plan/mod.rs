//! Step groups and the plan that orders them.
//!
//! A [`Plan`] is an ordered list of [`StepGroup`]s, each gated on a runtime
//! plugin and holding an optional build step followed by exactly one test
//! step. Plans are loaded from a JSON document whose steps are tagged by
//! `kind`, so the step variant is resolved once at load time and never
//! re-inspected from file names afterwards. Relative paths in the document
//! resolve against the document's directory.

mod document;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::platform::artifact_suffix;

pub use self::document::{PlanDocument, RequirementDocument, StepGroupDocument, TestDocument};

/// How a script step is handed to the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptMode {
    /// `<interpreter> <script>`.
    Plain,
    /// `<interpreter> -m unittest <script>`.
    UnitTest,
}

/// A script executed by the host interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    path: PathBuf,
    mode: ScriptMode,
}

impl ScriptStep {
    /// Creates a script step.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mode: ScriptMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    /// Returns the script path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the invocation mode.
    #[must_use]
    pub const fn mode(&self) -> ScriptMode {
        self.mode
    }

    /// Returns the directory holding the script, used as working directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        parent_or_current(&self.path)
    }
}

/// A suite compiled from source and run through a console runner.
///
/// The classpath is assembled at execution time from the environment so a
/// missing variable surfaces as a fault of the owning group only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSuiteStep {
    source: PathBuf,
    suite_name: String,
}

impl CompiledSuiteStep {
    /// Creates a compiled suite step, deriving the suite name from the source
    /// file stem.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Invalid`] when the source path has no file stem.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PlanError> {
        let source = path.into();
        let suite_name = source
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| PlanError::Invalid {
                message: format!("cannot derive a suite name from {}", source.display()),
            })?;
        Ok(Self { source, suite_name })
    }

    /// Returns the source file path.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the suite (class) name passed to the console runner.
    #[must_use]
    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    /// Returns the directory holding the source.
    #[must_use]
    pub fn directory(&self) -> &Path {
        parent_or_current(&self.source)
    }
}

/// A test step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A script, plain or run through unit-test discovery.
    Script(ScriptStep),
    /// A compiled suite with a compile and a run phase.
    CompiledSuite(CompiledSuiteStep),
}

/// An interpreter package that must be importable before a group runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequirement {
    module: String,
    package: String,
}

impl PackageRequirement {
    /// Creates a requirement on `module`, installed from `package`.
    #[must_use]
    pub fn new(module: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            package: package.into(),
        }
    }

    /// Returns the module name probed with an import.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Returns the package name handed to the installer.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }
}

/// A plugin-gated unit of build-then-test work.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::{ScriptMode, ScriptStep, Step, StepGroup};
///
/// let group = StepGroup::new(
///     "sanity-python",
///     "python311",
///     Step::Script(ScriptStep::new("/tests/test_api.py", ScriptMode::UnitTest)),
/// );
/// assert_eq!(group.plugin(), "python311");
/// assert!(group.build().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepGroup {
    name: String,
    plugin: String,
    build: Option<ScriptStep>,
    test: Step,
    artifacts: Vec<String>,
    requirements: Vec<PackageRequirement>,
    timeout: Option<Duration>,
}

impl StepGroup {
    /// Creates a group with no build step, artifacts, or prerequisites.
    #[must_use]
    pub fn new(name: impl Into<String>, plugin: impl Into<String>, test: Step) -> Self {
        Self {
            name: name.into(),
            plugin: plugin.into(),
            build: None,
            test,
            artifacts: Vec::new(),
            requirements: Vec::new(),
            timeout: None,
        }
    }

    /// Sets the build script. Build steps always run in plain mode.
    #[must_use]
    pub fn with_build(mut self, script: impl Into<PathBuf>) -> Self {
        self.build = Some(ScriptStep::new(script, ScriptMode::Plain));
        self
    }

    /// Adds a generated artifact base name owned by this group.
    #[must_use]
    pub fn with_artifact(mut self, base_name: impl Into<String>) -> Self {
        self.artifacts.push(base_name.into());
        self
    }

    /// Adds an interpreter package prerequisite.
    #[must_use]
    pub fn with_requirement(mut self, requirement: PackageRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Overrides the per-step timeout for this group. A zero duration runs
    /// the group without any limit, whatever the run-wide default.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin gating this group.
    #[must_use]
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Returns the build step, if any.
    #[must_use]
    pub const fn build(&self) -> Option<&ScriptStep> {
        self.build.as_ref()
    }

    /// Returns the test step.
    #[must_use]
    pub const fn test(&self) -> &Step {
        &self.test
    }

    /// Returns the artifact base names owned by this group.
    #[must_use]
    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }

    /// Returns the interpreter package prerequisites.
    #[must_use]
    pub fn requirements(&self) -> &[PackageRequirement] {
        &self.requirements
    }

    /// Returns the group-level timeout override.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the paths of the generated artifacts for this platform.
    ///
    /// Artifacts are named `<base>_<guest_tag><suffix>` and live in the build
    /// script's directory. Groups without a build step own no artifacts.
    #[must_use]
    pub fn artifact_paths(&self, guest_tag: &str) -> Vec<PathBuf> {
        let Some(build) = self.build.as_ref() else {
            return Vec::new();
        };
        self.artifacts
            .iter()
            .map(|base| artifact_path(build.directory(), base, guest_tag))
            .collect()
    }
}

/// Builds the path of one generated guest artifact.
#[must_use]
pub fn artifact_path(directory: &Path, base_name: &str, guest_tag: &str) -> PathBuf {
    directory.join(format!("{base_name}_{guest_tag}{}", artifact_suffix()))
}

/// An ordered, validated list of step groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    groups: Vec<StepGroup>,
    base_dir: PathBuf,
}

impl Plan {
    /// Creates a plan from groups, validating names.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Invalid`] when a group or plugin name is empty,
    /// a group name repeats, or artifacts are declared without a build step.
    pub fn new(groups: Vec<StepGroup>, base_dir: impl Into<PathBuf>) -> Result<Self, PlanError> {
        validate(&groups)?;
        Ok(Self {
            groups,
            base_dir: base_dir.into(),
        })
    }

    /// Loads a plan document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Read`] or [`PlanError::Parse`] when the document
    /// cannot be read or decoded, and [`PlanError::Invalid`] when it fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let text = std::fs::read_to_string(path).map_err(|err| PlanError::Read {
            path: path.to_path_buf(),
            source: Arc::new(err),
        })?;
        let document: PlanDocument =
            serde_json::from_str(&text).map_err(|err| PlanError::Parse {
                path: path.to_path_buf(),
                source: Arc::new(err),
            })?;
        let base_dir =
            std::path::absolute(parent_or_current(path)).map_err(|err| PlanError::Read {
                path: path.to_path_buf(),
                source: Arc::new(err),
            })?;
        document.resolve(&base_dir)
    }

    /// Returns the groups in execution order.
    #[must_use]
    pub fn groups(&self) -> &[StepGroup] {
        &self.groups
    }

    /// Returns the directory relative paths were resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the distinct plugin names in plan order.
    #[must_use]
    pub fn plugins(&self) -> Vec<&str> {
        let mut plugins: Vec<&str> = Vec::new();
        for group in &self.groups {
            if !plugins.contains(&group.plugin()) {
                plugins.push(group.plugin());
            }
        }
        plugins
    }

    /// Returns the number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` when the plan holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn validate(groups: &[StepGroup]) -> Result<(), PlanError> {
    let mut seen: Vec<&str> = Vec::with_capacity(groups.len());
    for group in groups {
        if group.name().trim().is_empty() {
            return Err(PlanError::Invalid {
                message: String::from("group name must not be empty"),
            });
        }
        if group.plugin().trim().is_empty() {
            return Err(PlanError::Invalid {
                message: format!("group '{}' must name a plugin", group.name()),
            });
        }
        if seen.contains(&group.name()) {
            return Err(PlanError::Invalid {
                message: format!("group '{}' is declared more than once", group.name()),
            });
        }
        if group.build().is_none() && !group.artifacts().is_empty() {
            return Err(PlanError::Invalid {
                message: format!(
                    "group '{}' declares artifacts but has no build step",
                    group.name()
                ),
            });
        }
        seen.push(group.name());
    }
    Ok(())
}

fn parent_or_current(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Errors raised while loading or validating a plan.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    /// The plan document could not be read.
    #[error("failed to read plan {path}: {source}")]
    Read {
        /// Document path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plan document is not valid JSON for the plan schema.
    #[error("failed to parse plan {path}: {source}")]
    Parse {
        /// Document path.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// The plan decoded but breaks a structural rule.
    #[error("invalid plan: {message}")]
    Invalid {
        /// Description of the violation.
        message: String,
    },
}

#[cfg(test)]
mod tests;
