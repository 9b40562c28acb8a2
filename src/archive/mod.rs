//! Packaging of local model files into a single upload archive.

mod zip;

use crate::cleanup::CleanupGuard;
use crate::error::ApiError;
use crate::runtime::Runtime;
use anyhow::Result;
use log::{debug, info};
use std::path::{Component, Path, PathBuf};

pub use zip::{ArchiveEntry, ZipArchiveWriter};

const ARCHIVE_EXTENSION: &str = ".zip";

/// Archive file name for a model: the name itself when it already ends in
/// `.zip`, otherwise the name with `.zip` appended.
pub fn archive_filename(name: &str) -> String {
    if name.ends_with(ARCHIVE_EXTENSION) {
        name.to_string()
    } else {
        format!("{}{}", name, ARCHIVE_EXTENSION)
    }
}

/// One or more local paths to upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileList(Vec<PathBuf>);

impl FileList {
    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for FileList {
    fn from(path: &str) -> Self {
        Self(vec![PathBuf::from(path)])
    }
}

impl From<String> for FileList {
    fn from(path: String) -> Self {
        Self(vec![PathBuf::from(path)])
    }
}

impl From<PathBuf> for FileList {
    fn from(path: PathBuf) -> Self {
        Self(vec![path])
    }
}

impl From<&Path> for FileList {
    fn from(path: &Path) -> Self {
        Self(vec![path.to_path_buf()])
    }
}

impl<T: Into<PathBuf>> From<Vec<T>> for FileList {
    fn from(paths: Vec<T>) -> Self {
        Self(paths.into_iter().map(Into::into).collect())
    }
}

impl<T: AsRef<Path>> From<&[T]> for FileList {
    fn from(paths: &[T]) -> Self {
        Self(paths.iter().map(|p| p.as_ref().to_path_buf()).collect())
    }
}

/// An archive ready to be uploaded.
///
/// Archives synthesized by the builder are removed, together with their
/// temporary directory, when this value is dropped. A pre-zipped file passed
/// in by the caller is left untouched.
#[derive(Debug)]
pub struct StagedArchive {
    path: PathBuf,
    cleanup: CleanupGuard,
}

impl StagedArchive {
    fn existing(path: PathBuf) -> Self {
        Self {
            path,
            cleanup: CleanupGuard::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the archive was built by this crate and will be removed on drop.
    pub fn is_staged(&self) -> bool {
        self.cleanup.is_armed()
    }
}

/// Builds upload archives from files and directories.
pub struct ArchiveBuilder<'a, R: Runtime + ?Sized> {
    runtime: &'a R,
    working_dir: PathBuf,
    staging_dir: Option<PathBuf>,
}

impl<'a, R: Runtime + ?Sized> ArchiveBuilder<'a, R> {
    /// `working_dir` anchors relative input paths and archive entry names.
    pub fn new(runtime: &'a R, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            working_dir: working_dir.into(),
            staging_dir: None,
        }
    }

    /// Stage archives in `dir` instead of a fresh temporary directory.
    pub fn with_staging_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.staging_dir = dir;
        self
    }

    /// Packages `files` into `<name>.zip`.
    ///
    /// A single input that already carries the target archive name is used
    /// as-is. Every missing path is rejected before anything is written.
    #[tracing::instrument(skip(self, files))]
    pub fn build(&self, name: &str, files: &FileList) -> Result<StagedArchive> {
        if files.is_empty() || files.paths().iter().any(|p| p.as_os_str().is_empty()) {
            return Err(ApiError::InvalidParam(
                "Please provide at least one model file path to upload".to_string(),
            )
            .into());
        }

        let archive_name = archive_filename(name);

        if let [single] = files.paths() {
            let resolved = self.resolve(single);
            if single.file_name().is_some_and(|n| n == archive_name.as_str())
                && self.runtime.is_file(&resolved)
            {
                info!("Using existing archive {:?}", resolved);
                return Ok(StagedArchive::existing(resolved));
            }
        }

        let entries = self.collect_entries(files)?;

        let (destination, cleanup) = match &self.staging_dir {
            Some(dir) => {
                let destination = dir.join(&archive_name);
                if self.runtime.exists(&destination) {
                    return Err(ApiError::InvalidParam(format!(
                        "{} already exists and would be overwritten. Remove it or choose another staging directory.",
                        destination.display()
                    ))
                    .into());
                }
                self.runtime.create_dir_all(dir)?;
                (destination.clone(), CleanupGuard::for_path(destination))
            }
            None => {
                let dir = self.runtime.create_temp_dir("skafos-upload-")?;
                (dir.join(&archive_name), CleanupGuard::for_path(dir))
            }
        };

        let count = ZipArchiveWriter.write(self.runtime, &entries, &destination)?;
        info!("Zipped {} file(s) into {}", count, archive_name);

        Ok(StagedArchive {
            path: destination,
            cleanup,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    fn collect_entries(&self, files: &FileList) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();

        for input in files.paths() {
            let resolved = self.resolve(input);
            if self.runtime.is_dir(&resolved) {
                self.walk_dir(&resolved, &mut entries)?;
            } else if self.runtime.is_file(&resolved) {
                entries.push(self.entry_for(resolved));
            } else {
                return Err(ApiError::InvalidParam(format!(
                    "We were unable to find {}. Check to make sure that the file path is correct.",
                    input.display()
                ))
                .into());
            }
        }

        Ok(entries)
    }

    fn walk_dir(&self, dir: &Path, entries: &mut Vec<ArchiveEntry>) -> Result<()> {
        for path in self.runtime.read_dir(dir)? {
            if self.runtime.is_dir(&path) {
                if self.runtime.is_symlink(&path) {
                    debug!("Skipping {:?}: symlinked directory", path);
                    continue;
                }
                self.walk_dir(&path, entries)?;
            } else if self.runtime.is_file(&path) {
                entries.push(self.entry_for(path));
            } else {
                debug!("Skipping {:?}: not a regular file", path);
            }
        }
        Ok(())
    }

    fn entry_for(&self, source: PathBuf) -> ArchiveEntry {
        let name = entry_name(&source, &self.working_dir);
        ArchiveEntry { source, name }
    }
}

/// Archive entry name for `path`: relative to `base` when the file lives
/// below it, otherwise the full path without its root. Always `/`-separated.
fn entry_name(path: &Path, base: &Path) -> String {
    let relative = pathdiff::diff_paths(path, base)
        .filter(|rel| !rel.components().any(|c| c == Component::ParentDir))
        .unwrap_or_else(|| path.to_path_buf());

    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
