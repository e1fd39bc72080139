//! Platform naming conventions for generated guest artifacts.

/// Shared-library suffix used on the Windows family.
pub const WINDOWS_SUFFIX: &str = ".dll";
/// Shared-library suffix used on the Apple Darwin family.
pub const DARWIN_SUFFIX: &str = ".dylib";
/// Shared-library suffix used everywhere else.
pub const DEFAULT_SUFFIX: &str = ".so";

/// Separator placed between classpath entries on this platform.
#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
/// Separator placed between classpath entries on this platform.
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Returns the shared-library suffix for the running operating system.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::platform::artifact_suffix;
///
/// assert!([".dll", ".dylib", ".so"].contains(&artifact_suffix()));
/// ```
#[must_use]
pub fn artifact_suffix() -> &'static str {
    suffix_for_os(std::env::consts::OS)
}

/// Maps an operating system identity, as reported by
/// [`std::env::consts::OS`], to its shared-library suffix.
#[must_use]
pub fn suffix_for_os(os: &str) -> &'static str {
    match os {
        "windows" => WINDOWS_SUFFIX,
        "macos" | "ios" => DARWIN_SUFFIX,
        _ => DEFAULT_SUFFIX,
    }
}
