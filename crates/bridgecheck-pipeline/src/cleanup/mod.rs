//! Best-effort removal of generated artifacts.
//!
//! Deletion is idempotent: a path that is already gone counts as removed.
//! Any other failure is reported as a [`PipelineError::Cleanup`] for the
//! caller to log; it never changes the verdict of a run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PipelineError;

/// Tracing target for cleanup operations.
const CLEANUP_TARGET: &str = "bridgecheck_pipeline::cleanup";

/// Extension of compiled class files left next to suite sources.
const CLASS_EXTENSION: &str = "class";

/// Removes generated artifacts and compiled-class leftovers.
///
/// # Example
///
/// ```
/// use bridgecheck_pipeline::ArtifactCleaner;
///
/// let dir = tempfile::tempdir().unwrap();
/// let artifact = dir.path().join("TestRuntime_Guest.so");
/// std::fs::write(&artifact, b"elf").unwrap();
///
/// ArtifactCleaner.remove(&artifact).unwrap();
/// ArtifactCleaner.remove(&artifact).unwrap();
/// assert!(!artifact.exists());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactCleaner;

impl ArtifactCleaner {
    /// Deletes `path`. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Cleanup`] when the file exists but cannot be
    /// deleted.
    pub fn remove(self, path: &Path) -> Result<(), PipelineError> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(target: CLEANUP_TARGET, path = %path.display(), "removed artifact");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PipelineError::Cleanup {
                path: path.to_path_buf(),
                source: Arc::new(err),
            }),
        }
    }

    /// Deletes every path, logging failures instead of returning them.
    ///
    /// Returns the number of failures observed.
    #[must_use]
    pub fn remove_all<'p, I>(self, paths: I) -> usize
    where
        I: IntoIterator<Item = &'p Path>,
    {
        let mut failures = 0;
        for path in paths {
            if let Err(err) = self.remove(path) {
                warn!(
                    target: CLEANUP_TARGET,
                    path = %path.display(),
                    fault = %err.kind(),
                    error = %err,
                    "failed to remove artifact"
                );
                failures += 1;
            }
        }
        failures
    }

    /// Deletes compiled `.class` files directly inside `directory`.
    ///
    /// Returns the number of failures observed. An unreadable directory is
    /// logged and counted as one failure.
    #[must_use]
    pub fn remove_compiled_classes(self, directory: &Path) -> usize {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    target: CLEANUP_TARGET,
                    directory = %directory.display(),
                    error = %err,
                    "failed to list compiled classes"
                );
                return 1;
            }
        };
        let classes: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|extension| extension == CLASS_EXTENSION)
            })
            .collect();
        self.remove_all(classes.iter().map(PathBuf::as_path))
    }
}
