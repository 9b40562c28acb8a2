use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A file to add to an archive and the name it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    pub name: String,
}

/// Writes deflate-compressed zip archives.
pub struct ZipArchiveWriter;

impl ZipArchiveWriter {
    /// Writes `entries` into a new zip file at `destination`.
    ///
    /// Entries sharing a name are written once. Returns the number of
    /// entries stored.
    #[tracing::instrument(skip(self, runtime, entries))]
    pub fn write<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        entries: &[ArchiveEntry],
        destination: &Path,
    ) -> Result<usize> {
        debug!("Writing {} file(s) to {:?}...", entries.len(), destination);

        // zip requires Write + Seek, but Runtime::create_file returns Box<dyn Write + Send>,
        // so the archive is assembled in memory and written out in one go
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.name.as_str()) {
                debug!("Skipping duplicate entry {}", entry.name);
                continue;
            }

            zip.start_file(entry.name.clone(), options)
                .with_context(|| format!("Failed to add {} to archive", entry.name))?;
            let mut source = runtime
                .open(&entry.source)
                .with_context(|| format!("Failed to open {:?}", entry.source))?;
            std::io::copy(&mut source, &mut zip)
                .with_context(|| format!("Failed to compress {:?}", entry.source))?;
        }

        let bytes = zip
            .finish()
            .context("Failed to finalize zip archive")?
            .into_inner();

        let mut file = runtime
            .create_file(destination)
            .with_context(|| format!("Failed to create archive at {:?}", destination))?;
        file.write_all(&bytes)
            .with_context(|| format!("Failed to write archive to {:?}", destination))?;
        file.flush()?;

        debug!("Wrote {} bytes to {:?}", bytes.len(), destination);
        Ok(seen.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use std::fs::{self, File};
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn entry(dir: &Path, name: &str, content: &str) -> ArchiveEntry {
        let source = dir.join(name.replace('/', "_"));
        fs::write(&source, content).unwrap();
        ArchiveEntry {
            source,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_write_archive_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let entries = vec![
            entry(dir.path(), "model.mlmodel", "weights"),
            entry(dir.path(), "assets/labels.txt", "cat\ndog"),
        ];
        let destination = dir.path().join("clf.zip");

        let count = ZipArchiveWriter.write(&RealRuntime, &entries, &destination)?;
        assert_eq!(count, 2);

        let mut archive = ZipArchive::new(File::open(&destination)?)?;
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("assets/labels.txt")?
            .read_to_string(&mut content)?;
        assert_eq!(content, "cat\ndog");

        let stored = archive.by_name("model.mlmodel")?;
        assert_eq!(stored.compression(), zip::CompressionMethod::Deflated);

        Ok(())
    }

    #[test]
    fn test_write_archive_skips_duplicate_names() -> Result<()> {
        let dir = tempdir()?;
        let first = entry(dir.path(), "model.mlmodel", "weights");
        let entries = vec![first.clone(), first];
        let destination = dir.path().join("clf.zip");

        let count = ZipArchiveWriter.write(&RealRuntime, &entries, &destination)?;
        assert_eq!(count, 1);
        assert_eq!(ZipArchive::new(File::open(&destination)?)?.len(), 1);

        Ok(())
    }

    #[test]
    fn test_write_archive_missing_source() {
        let dir = tempdir().unwrap();
        let entries = vec![ArchiveEntry {
            source: dir.path().join("missing.bin"),
            name: "missing.bin".to_string(),
        }];

        let result = ZipArchiveWriter.write(&RealRuntime, &entries, &dir.path().join("clf.zip"));
        assert!(result.is_err());
        assert!(!dir.path().join("clf.zip").exists());
    }
}
