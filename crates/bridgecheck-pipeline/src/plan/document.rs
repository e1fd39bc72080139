//! Serialised form of a plan.
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "name": "sanity-go",
//!       "plugin": "go",
//!       "build": "sanity/go/build_guest.py",
//!       "artifacts": ["TestRuntime"],
//!       "test": { "kind": "compiled_suite", "source": "sanity/APITestGo.java" }
//!     }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    CompiledSuiteStep, PackageRequirement, Plan, PlanError, ScriptMode, ScriptStep, Step,
    StepGroup,
};

/// Top-level plan document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDocument {
    /// Groups in execution order.
    #[serde(default)]
    pub groups: Vec<StepGroupDocument>,
}

/// One step group as written in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepGroupDocument {
    /// Unique group name.
    pub name: String,
    /// Plugin directory gating the group.
    pub plugin: String,
    /// Build script run before the test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<PathBuf>,
    /// The test step.
    pub test: TestDocument,
    /// Generated artifact base names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    /// Interpreter packages that must be importable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<RequirementDocument>,
    /// Per-step timeout override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// A test step, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum TestDocument {
    /// A script run as a plain program.
    Script {
        /// Script path.
        path: PathBuf,
    },
    /// A script run through the interpreter's unit-test discovery.
    Unittest {
        /// Script path.
        path: PathBuf,
    },
    /// A compiled suite.
    CompiledSuite {
        /// Source file path.
        source: PathBuf,
    },
}

/// An interpreter package prerequisite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementDocument {
    /// Module name probed with an import.
    pub module: String,
    /// Installer package name; defaults to the module name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl PlanDocument {
    /// Converts the document into a validated [`Plan`], resolving relative
    /// paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Invalid`] when a group fails validation.
    pub fn resolve(self, base_dir: &Path) -> Result<Plan, PlanError> {
        let groups = self
            .groups
            .into_iter()
            .map(|group| group.resolve(base_dir))
            .collect::<Result<Vec<_>, _>>()?;
        Plan::new(groups, base_dir)
    }
}

impl StepGroupDocument {
    fn resolve(self, base_dir: &Path) -> Result<StepGroup, PlanError> {
        let test = self.test.resolve(base_dir)?;
        let mut group = StepGroup::new(self.name, self.plugin, test)
            .with_timeout(self.timeout_secs.map(Duration::from_secs));
        if let Some(build) = self.build {
            group = group.with_build(base_dir.join(build));
        }
        for artifact in self.artifacts {
            group = group.with_artifact(artifact);
        }
        for requirement in self.requires {
            let package = requirement
                .package
                .unwrap_or_else(|| requirement.module.clone());
            group = group.with_requirement(PackageRequirement::new(requirement.module, package));
        }
        Ok(group)
    }
}

impl TestDocument {
    fn resolve(self, base_dir: &Path) -> Result<Step, PlanError> {
        Ok(match self {
            Self::Script { path } => {
                Step::Script(ScriptStep::new(base_dir.join(path), ScriptMode::Plain))
            }
            Self::Unittest { path } => {
                Step::Script(ScriptStep::new(base_dir.join(path), ScriptMode::UnitTest))
            }
            Self::CompiledSuite { source } => {
                Step::CompiledSuite(CompiledSuiteStep::new(base_dir.join(source))?)
            }
        })
    }
}
