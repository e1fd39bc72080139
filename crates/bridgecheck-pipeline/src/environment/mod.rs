//! Read-only snapshot of the environment a pipeline runs under.
//!
//! The context is captured once at startup and handed to every executor
//! call, so no helper consults or mutates process-wide state mid-run. Child
//! processes receive exactly the variables held here.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::error::PipelineError;

/// Variable naming the JVM installation used for compiled suites.
pub const JAVA_HOME_VAR: &str = "JAVA_HOME";

/// Immutable mapping of environment variables.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::EnvironmentContext;
///
/// let env = EnvironmentContext::from_pairs([("METAFFI_HOME", "/opt/metaffi")]);
/// assert_eq!(
///     env.path("METAFFI_HOME").as_deref(),
///     Some(std::path::Path::new("/opt/metaffi"))
/// );
/// assert!(env.get("JAVA_HOME").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentContext {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvironmentContext {
    /// Captures the environment of the current process.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    /// Builds a context from explicit key/value pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Returns a copy of this context with one variable added or replaced.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Looks up a variable. Empty values are treated as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars
            .get(OsStr::new(key))
            .map(OsString::as_os_str)
            .filter(|value| !value.is_empty())
    }

    /// Looks up a variable holding a filesystem path.
    #[must_use]
    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    /// Looks up a variable that `group` cannot proceed without.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingVariable`] when the variable is unset
    /// or empty.
    pub fn require_path(&self, key: &str, group: &str) -> Result<PathBuf, PipelineError> {
        self.path(key).ok_or_else(|| PipelineError::MissingVariable {
            group: group.to_owned(),
            variable: key.to_owned(),
        })
    }

    /// Iterates over every variable in the snapshot.
    pub fn vars(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars
            .iter()
            .map(|(key, value)| (key.as_os_str(), value.as_os_str()))
    }

    /// Returns the number of captured variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` when the snapshot holds no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
