//! Settings shared by every executor and the per-group context built from
//! them.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::environment::EnvironmentContext;
use crate::plan::StepGroup;

/// Default name of the variable locating the installation root.
pub const DEFAULT_INSTALL_ROOT_VAR: &str = "METAFFI_HOME";
/// Default plugin directory holding the host bridge archives.
pub const DEFAULT_HOST_PLUGIN: &str = "openjdk";
/// Default infix of generated guest artifact names.
pub const DEFAULT_GUEST_TAG: &str = "Guest";

/// Default script interpreter.
#[cfg(windows)]
pub const DEFAULT_INTERPRETER: &str = "python";
/// Default script interpreter.
#[cfg(not(windows))]
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Run-wide settings, fixed before the first group executes.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bridgecheck_pipeline::PipelineSettings;
///
/// let settings = PipelineSettings::new("/suites")
///     .with_interpreter("python3.11")
///     .with_step_timeout(Some(Duration::from_secs(900)));
/// assert_eq!(settings.install_root_var(), "METAFFI_HOME");
/// assert_eq!(settings.guest_tag(), "Guest");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    archive_dir: PathBuf,
    interpreter: OsString,
    install_root_var: String,
    host_plugin: String,
    guest_tag: String,
    step_timeout: Option<Duration>,
}

impl PipelineSettings {
    /// Creates settings with defaults; fixed archives live in `archive_dir`.
    #[must_use]
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            interpreter: OsString::from(DEFAULT_INTERPRETER),
            install_root_var: DEFAULT_INSTALL_ROOT_VAR.to_owned(),
            host_plugin: DEFAULT_HOST_PLUGIN.to_owned(),
            guest_tag: DEFAULT_GUEST_TAG.to_owned(),
            step_timeout: None,
        }
    }

    /// Sets the script interpreter.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<OsString>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Sets the name of the installation-root variable.
    #[must_use]
    pub fn with_install_root_var(mut self, variable: impl Into<String>) -> Self {
        self.install_root_var = variable.into();
        self
    }

    /// Sets the plugin directory holding the host bridge archives.
    #[must_use]
    pub fn with_host_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.host_plugin = plugin.into();
        self
    }

    /// Sets the infix of generated guest artifact names.
    #[must_use]
    pub fn with_guest_tag(mut self, tag: impl Into<String>) -> Self {
        self.guest_tag = tag.into();
        self
    }

    /// Sets the default per-step timeout. A zero duration means no limit.
    #[must_use]
    pub const fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = match timeout {
            Some(limit) if limit.is_zero() => None,
            other => other,
        };
        self
    }

    /// Returns the directory holding the fixed test-framework archives.
    #[must_use]
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Returns the script interpreter.
    #[must_use]
    pub const fn interpreter(&self) -> &OsString {
        &self.interpreter
    }

    /// Returns the name of the installation-root variable.
    #[must_use]
    pub fn install_root_var(&self) -> &str {
        &self.install_root_var
    }

    /// Returns the plugin directory holding the host bridge archives.
    #[must_use]
    pub fn host_plugin(&self) -> &str {
        &self.host_plugin
    }

    /// Returns the infix of generated guest artifact names.
    #[must_use]
    pub fn guest_tag(&self) -> &str {
        &self.guest_tag
    }

    /// Returns the default per-step timeout.
    #[must_use]
    pub const fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout
    }
}

/// Everything an executor needs to run one step of one group.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    group: &'a str,
    env: &'a EnvironmentContext,
    settings: &'a PipelineSettings,
    timeout: Option<Duration>,
}

impl<'a> StepContext<'a> {
    /// Builds the context for `group`; the group's timeout overrides the
    /// run-wide default, and a zero group timeout lifts it entirely.
    #[must_use]
    pub fn new(
        group: &'a StepGroup,
        env: &'a EnvironmentContext,
        settings: &'a PipelineSettings,
    ) -> Self {
        Self {
            group: group.name(),
            env,
            settings,
            timeout: match group.timeout() {
                Some(limit) if limit.is_zero() => None,
                Some(limit) => Some(limit),
                None => settings.step_timeout(),
            },
        }
    }

    /// Returns the owning group's name.
    #[must_use]
    pub const fn group(&self) -> &'a str {
        self.group
    }

    /// Returns the environment snapshot.
    #[must_use]
    pub const fn env(&self) -> &'a EnvironmentContext {
        self.env
    }

    /// Returns the run-wide settings.
    #[must_use]
    pub const fn settings(&self) -> &'a PipelineSettings {
        self.settings
    }

    /// Returns the effective per-step timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
