use std::time::Duration;

use camino::Utf8PathBuf;

pub use bridgecheck_pipeline::{
    DEFAULT_GUEST_TAG, DEFAULT_HOST_PLUGIN, DEFAULT_INSTALL_ROOT_VAR, DEFAULT_INTERPRETER,
};

use crate::logging::LogFormat;

/// Default plan document, resolved against the working directory.
pub const DEFAULT_PLAN_PATH: &str = "bridgecheck.json";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default plan document path.
#[must_use]
pub fn default_plan_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PLAN_PATH)
}

/// Default name of the installation-root variable.
#[must_use]
pub fn default_install_root_var() -> String {
    DEFAULT_INSTALL_ROOT_VAR.to_owned()
}

/// Default host plugin.
#[must_use]
pub fn default_host_plugin() -> String {
    DEFAULT_HOST_PLUGIN.to_owned()
}

/// Default artifact infix.
#[must_use]
pub fn default_guest_tag() -> String {
    DEFAULT_GUEST_TAG.to_owned()
}

/// Default script interpreter for the current platform.
#[must_use]
pub fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_owned()
}

/// Converts a timeout in whole seconds into a [`Duration`].
///
/// Zero is treated as "no limit".
#[must_use]
pub const fn step_timeout_from_secs(secs: Option<u64>) -> Option<Duration> {
    match secs {
        Some(0) | None => None,
        Some(value) => Some(Duration::from_secs(value)),
    }
}
