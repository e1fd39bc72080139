//! Layered configuration for the `bridgecheck` binary.
//!
//! Values resolve from built-in defaults, then a TOML configuration file
//! (`--config-path` or `BRIDGECHECK_CONFIG_PATH`), then `BRIDGECHECK_*`
//! environment variables, and finally command-line flags. Loading is handled
//! by [`ortho_config`]; this crate only declares the fields, their defaults,
//! and typed accessors.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_GUEST_TAG, DEFAULT_HOST_PLUGIN, DEFAULT_INSTALL_ROOT_VAR, DEFAULT_INTERPRETER,
    DEFAULT_LOG_FILTER, DEFAULT_PLAN_PATH, default_guest_tag, default_host_plugin,
    default_install_root_var, default_interpreter, default_log_filter,
    default_log_filter_string, default_log_format, default_plan_path, step_timeout_from_secs,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration shared by the CLI and its pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "BRIDGECHECK")]
pub struct Config {
    /// Plan document describing the step groups to run.
    #[ortho_config(default = default_plan_path())]
    pub plan_path: Utf8PathBuf,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Name of the environment variable pointing at the installation root.
    #[ortho_config(default = default_install_root_var())]
    pub install_root_var: String,
    /// Plugin directory that holds the bridge archives for compiled suites.
    #[ortho_config(default = default_host_plugin())]
    pub host_plugin: String,
    /// Infix used in generated artifact names.
    #[ortho_config(default = default_guest_tag())]
    pub guest_tag: String,
    /// Interpreter used for build and test scripts.
    #[ortho_config(default = default_interpreter())]
    pub interpreter: String,
    /// Per-step timeout in seconds. Unset or zero means no limit.
    pub step_timeout_secs: Option<u64>,
    /// Refuse to run when none of the plan's plugins is installed.
    #[ortho_config(default = false)]
    pub require_plugin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan_path: default_plan_path(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            install_root_var: default_install_root_var(),
            host_plugin: default_host_plugin(),
            guest_tag: default_guest_tag(),
            interpreter: default_interpreter(),
            step_timeout_secs: None,
            require_plugin: false,
        }
    }
}

impl Config {
    /// Returns the plan document path.
    #[must_use]
    pub fn plan_path(&self) -> &Utf8Path {
        &self.plan_path
    }

    /// Returns the log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the installation-root variable name.
    #[must_use]
    pub fn install_root_var(&self) -> &str {
        &self.install_root_var
    }

    /// Returns the host plugin name.
    #[must_use]
    pub fn host_plugin(&self) -> &str {
        &self.host_plugin
    }

    /// Returns the artifact infix.
    #[must_use]
    pub fn guest_tag(&self) -> &str {
        &self.guest_tag
    }

    /// Returns the script interpreter.
    #[must_use]
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Returns the per-step timeout, if one is configured.
    #[must_use]
    pub const fn step_timeout(&self) -> Option<Duration> {
        step_timeout_from_secs(self.step_timeout_secs)
    }

    /// Returns whether at least one plugin must be installed.
    #[must_use]
    pub const fn require_plugin(&self) -> bool {
        self.require_plugin
    }
}
