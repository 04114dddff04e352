use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::ExtractError;
use crate::joblog::JobLog;

/// Temporary directory a transmittal is extracted into.
///
/// Cleanup is explicit so the pipeline controls when the tree goes away;
/// on a crash the directory survives for inspection.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    fn create() -> Result<Self, ExtractError> {
        let path = std::env::temp_dir().join(format!("fabflow_{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&path).map_err(|source| ExtractError::CreateWorkDir {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the working directory. Failures are logged, never raised.
    pub fn cleanup(&self, log: &JobLog) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => log.success(format!("Cleaned temp folder: {}", self.path.display())),
            Err(e) => log.error(format!("Cleanup error: {}", e)),
        }
    }
}

/// Extracts a transmittal zip, then walks the result and unpacks any
/// nested zips it finds.
pub struct ArchiveExtractor {
    archive_path: PathBuf,
}

impl ArchiveExtractor {
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
        }
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// True when the file opens as a zip archive.
    pub fn is_valid_archive(path: &Path) -> bool {
        File::open(path)
            .ok()
            .and_then(|f| ZipArchive::new(f).ok())
            .is_some()
    }

    /// Extracts the archive into a fresh working directory.
    pub fn extract(&self, log: &JobLog) -> Result<WorkDir, ExtractError> {
        if self.archive_path.is_dir() {
            return Err(ExtractError::IsDirectory(self.archive_path.clone()));
        }

        let file = File::open(&self.archive_path).map_err(|source| ExtractError::ReadArchive {
            path: self.archive_path.clone(),
            source,
        })?;
        let mut archive =
            ZipArchive::new(file).map_err(|source| ExtractError::InvalidArchive {
                path: self.archive_path.clone(),
                source,
            })?;

        let work_dir = WorkDir::create()?;
        if let Err(source) = archive.extract(work_dir.path()) {
            // Leave no partial tree behind.
            if let Err(e) = std::fs::remove_dir_all(work_dir.path()) {
                warn!("could not remove partial extraction: {}", e);
            }
            return Err(ExtractError::Unpack {
                path: work_dir.path().to_path_buf(),
                source,
            });
        }
        log.set_status("Zip extracted successfully");
        log.success("Zip extracted successfully");

        self.extract_nested(work_dir.path(), log);
        Ok(work_dir)
    }

    /// Names of the archive's entries, in archive order.
    pub fn entry_names(&self) -> Result<Vec<String>, ExtractError> {
        let file = File::open(&self.archive_path).map_err(|source| ExtractError::ReadArchive {
            path: self.archive_path.clone(),
            source,
        })?;
        let archive = ZipArchive::new(file).map_err(|source| ExtractError::InvalidArchive {
            path: self.archive_path.clone(),
            source,
        })?;
        Ok(archive.file_names().map(String::from).collect())
    }

    /// Unpacks every nested zip under `root` into a sibling directory named
    /// after the zip's stem, then recurses into what came out. The zip file
    /// itself stays on disk so classification still sees it.
    fn extract_nested(&self, root: &Path, log: &JobLog) {
        let nested: Vec<PathBuf> = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file()
                    && e.path()
                        .extension()
                        .map(|ext| ext.eq_ignore_ascii_case("zip"))
                        .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();

        for zip_path in nested {
            match self.unpack_one(&zip_path) {
                Ok(extract_dir) => {
                    log.success(format!("Extracted nested zip: {}", zip_path.display()));
                    self.extract_nested(&extract_dir, log);
                }
                Err(e) => {
                    log.error(format!(
                        "Error extracting nested zip: {}: {}",
                        zip_path.display(),
                        e
                    ));
                }
            }
        }
    }

    fn unpack_one(&self, zip_path: &Path) -> Result<PathBuf, ExtractError> {
        let stem = zip_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "nested".to_string());
        let parent = zip_path.parent().unwrap_or(Path::new("."));
        let extract_dir = parent.join(stem);

        debug!("unpacking {} into {}", zip_path.display(), extract_dir.display());
        std::fs::create_dir_all(&extract_dir).map_err(|source| ExtractError::CreateWorkDir {
            path: extract_dir.clone(),
            source,
        })?;

        let file = File::open(zip_path).map_err(|source| ExtractError::ReadArchive {
            path: zip_path.to_path_buf(),
            source,
        })?;
        let mut archive = ZipArchive::new(file).map_err(|source| ExtractError::InvalidArchive {
            path: zip_path.to_path_buf(),
            source,
        })?;
        archive
            .extract(&extract_dir)
            .map_err(|source| ExtractError::Unpack {
                path: extract_dir.clone(),
                source,
            })?;

        Ok(extract_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_flat_archive() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("t.zip");
        write_zip(
            &zip_path,
            &[("Fab Drawings/B1.pdf", b"pdf"), ("readme.txt", b"hi")],
        );

        let log = JobLog::new();
        let work = ArchiveExtractor::new(&zip_path).extract(&log).unwrap();
        assert!(work.path().join("Fab Drawings/B1.pdf").is_file());
        assert!(work.path().join("readme.txt").is_file());
        work.cleanup(&log);
        assert!(!work.path().exists());
    }

    #[test]
    fn test_extract_nested_zip_into_sibling_dir() {
        let tmp = TempDir::new().unwrap();

        let mut inner = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut inner));
            writer
                .start_file("deep.nc1", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"nc").unwrap();
            writer.finish().unwrap();
        }

        let zip_path = tmp.path().join("outer.zip");
        let file = File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("sub/inner.zip", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&inner).unwrap();
        writer.finish().unwrap();

        let log = JobLog::new();
        let work = ArchiveExtractor::new(&zip_path).extract(&log).unwrap();
        // Nested zip unpacks next to itself; the zip file stays.
        assert!(work.path().join("sub/inner/deep.nc1").is_file());
        assert!(work.path().join("sub/inner.zip").is_file());
        work.cleanup(&log);
    }

    #[test]
    fn test_corrupt_archive_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("bad.zip");
        std::fs::write(&zip_path, b"this is not a zip").unwrap();

        let log = JobLog::new();
        let err = ArchiveExtractor::new(&zip_path).extract(&log).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidArchive { .. }));
    }

    #[test]
    fn test_directory_input_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let log = JobLog::new();
        let err = ArchiveExtractor::new(tmp.path()).extract(&log).unwrap_err();
        assert!(matches!(err, ExtractError::IsDirectory(_)));
    }

    #[test]
    fn test_entry_names() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("t.zip");
        write_zip(&zip_path, &[("a.txt", b"a"), ("b/c.txt", b"c")]);

        let names = ArchiveExtractor::new(&zip_path).entry_names().unwrap();
        assert_eq!(names, vec!["a.txt".to_string(), "b/c.txt".to_string()]);
    }

    #[test]
    fn test_is_valid_archive() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.zip");
        write_zip(&good, &[("a.txt", b"a")]);
        let bad = tmp.path().join("bad.zip");
        std::fs::write(&bad, b"junk").unwrap();

        assert!(ArchiveExtractor::is_valid_archive(&good));
        assert!(!ArchiveExtractor::is_valid_archive(&bad));
    }
}
