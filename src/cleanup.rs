use log::debug;
use std::path::{Path, PathBuf};

/// Tracks paths that must be removed once an operation finishes
#[derive(Debug, Default)]
pub struct CleanupContext {
    #[cfg(test)]
    pub paths: Vec<PathBuf>,
    #[cfg(not(test))]
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path to be cleaned up
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Remove a path from the cleanup list (e.g., when it should be kept)
    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Clean up all registered paths, most recently added first
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..).rev() {
            debug!("Cleaning up: {:?}", path);
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            if let Err(e) = result
                && e.kind() != std::io::ErrorKind::NotFound
            {
                debug!("Failed to clean up {:?}: {}", path, e);
            }
        }
    }
}

/// RAII guard that removes every tracked path when dropped, whether the
/// surrounding operation succeeded or failed.
#[derive(Debug, Default)]
pub struct CleanupGuard {
    ctx: CleanupContext,
}

impl CleanupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a guard already tracking one path
    pub fn for_path(path: PathBuf) -> Self {
        let mut guard = Self::new();
        guard.track(path);
        guard
    }

    pub fn track(&mut self, path: PathBuf) {
        self.ctx.add(path);
    }

    /// Keep a path that would otherwise be removed
    pub fn keep(&mut self, path: &Path) {
        self.ctx.remove(path);
    }

    pub fn is_armed(&self) -> bool {
        !self.ctx.is_empty()
    }

    /// Keep everything and stop tracking
    pub fn disarm(mut self) {
        self.ctx = CleanupContext::new();
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.ctx.cleanup();
    }
}
