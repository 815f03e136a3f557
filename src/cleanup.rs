use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::engine::ContainerEngine;

/// Releases the temporary container and build directory when dropped.
///
/// Runs on every way out of the owning scope: normal return, `?`, unwinding
/// panics, and signals (which surface as cancellation errors). Each resource
/// is re-checked before removal, so dropping with nothing to clean is a no-op.
/// Failures are logged and swallowed; they never replace the error that
/// caused the unwind.
pub struct CleanupGuard<'a> {
    engine: &'a ContainerEngine<'a>,
    container: Option<String>,
    build_dir: Option<PathBuf>,
}

impl<'a> CleanupGuard<'a> {
    pub fn new(engine: &'a ContainerEngine<'a>) -> Self {
        Self {
            engine,
            container: None,
            build_dir: None,
        }
    }

    /// Take ownership of the named container.
    pub fn track_container(&mut self, name: impl Into<String>) {
        self.container = Some(name.into());
    }

    /// Take ownership of the build directory.
    pub fn track_build_dir(&mut self, dir: impl Into<PathBuf>) {
        self.build_dir = Some(dir.into());
    }

    fn release_container(&self, name: &str) {
        match self.engine.container_state(name) {
            Ok(Some(_)) => {
                info!(container = name, "removing temporary container");
                if let Err(e) = self.engine.stop(name) {
                    debug!(container = name, error = %e, "stop during cleanup failed");
                }
                if let Err(e) = self.engine.remove(name) {
                    warn!(container = name, error = %e, "could not remove temporary container");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(container = name, error = %e, "could not inspect temporary container"),
        }
    }

    fn release_build_dir(&self, dir: &Path) {
        if !dir.exists() {
            return;
        }
        info!(dir = %dir.display(), "removing build directory");
        if let Err(e) = std::fs::remove_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "could not remove build directory");
        }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Some(name) = self.container.take() {
            self.release_container(&name);
        }
        if let Some(dir) = self.build_dir.take() {
            self.release_build_dir(&dir);
        }
    }
}
