//! Plugin availability gating.
//!
//! A guest runtime plugin counts as installed when a directory carrying its
//! name sits directly under the installation root. The check is a read-only
//! filesystem query that never fails: a missing root simply reports every
//! plugin as unavailable.

use std::path::{Component, Path, PathBuf};

use crate::environment::EnvironmentContext;

/// Answers whether a named plugin is installed.
///
/// The orchestrator consults a probe before each step group. Test code can
/// implement this trait to script availability without touching the
/// filesystem.
pub trait PluginProbe {
    /// Returns `true` when `plugin_name` is installed.
    fn is_available(&self, plugin_name: &str) -> bool;
}

/// Returns whether a directory named `plugin_name` exists directly under
/// `root`.
///
/// Names that are empty or would escape `root` (separators, `..`) are never
/// available.
#[must_use]
pub fn is_available(root: &Path, plugin_name: &str) -> bool {
    if !is_plain_name(plugin_name) {
        return false;
    }
    root.join(plugin_name).is_dir()
}

fn is_plain_name(plugin_name: &str) -> bool {
    let mut components = Path::new(plugin_name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Filesystem-backed probe rooted at the installation directory.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::{EnvironmentContext, InstallRoot, PluginProbe};
///
/// let env = EnvironmentContext::default();
/// let probe = InstallRoot::from_env(&env, "METAFFI_HOME");
/// assert!(probe.root().is_none());
/// assert!(!probe.is_available("go"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRoot {
    root: Option<PathBuf>,
}

impl InstallRoot {
    /// Creates a probe for the given root. `None` models an unset root.
    #[must_use]
    pub const fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Resolves the root from the variable named `variable`.
    #[must_use]
    pub fn from_env(env: &EnvironmentContext, variable: &str) -> Self {
        Self::new(env.path(variable))
    }

    /// Returns the installation root, when one is configured.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl PluginProbe for InstallRoot {
    fn is_available(&self, plugin_name: &str) -> bool {
        self.root
            .as_deref()
            .is_some_and(|root| is_available(root, plugin_name))
    }
}
