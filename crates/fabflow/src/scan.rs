//! Scans the downloads folder for recently fetched transmittal archives.
//!
//! Bridges manual browser downloads and processing: after pulling a
//! transmittal from a cloud link, a scan lists what landed, what it looks
//! like, and whether it is ready to feed into the pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use crate::archive::ArchiveExtractor;
use crate::detect::{DeliveryType, MetadataDetector};
use crate::pipeline::PipelineConfig;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Downloads folder not found: {0}")]
    MissingFolder(PathBuf),
}

/// One archive found in the scan window.
#[derive(Debug, Serialize)]
pub struct ScannedArchive {
    pub path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub modified: String,
    pub age_minutes: f64,
    pub detected_job: Option<String>,
    pub detected_transmittal: Option<String>,
    pub detected_type: DeliveryType,
    pub is_valid_archive: bool,
    pub size_warning: bool,
    /// Valid archive and not oversized.
    pub ready_for_processing: bool,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub downloads_folder: PathBuf,
    pub time_window_minutes: u64,
    pub files_found: Vec<ScannedArchive>,
    pub total_found: usize,
    pub ready_count: usize,
}

/// Lists recent archives in the downloads folder with detected metadata.
pub struct DownloadScanner {
    downloads_dir: PathBuf,
    max_archive_size: u64,
    detector: MetadataDetector,
}

impl DownloadScanner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            downloads_dir: config.downloads_dir.clone(),
            max_archive_size: config.max_archive_size,
            detector: MetadataDetector::new(),
        }
    }

    /// Scan for archives modified within the last `minutes_ago` minutes
    /// (clamped to 1-120), optionally filtered to one job number. Newest
    /// first.
    pub fn scan(
        &self,
        job_number: Option<&str>,
        minutes_ago: u64,
    ) -> Result<ScanReport, ScanError> {
        let minutes_ago = minutes_ago.clamp(1, 120);

        if !self.downloads_dir.is_dir() {
            return Err(ScanError::MissingFolder(self.downloads_dir.clone()));
        }

        let now = SystemTime::now();
        let window = std::time::Duration::from_secs(minutes_ago * 60);

        let mut files_found = Vec::new();
        for entry in fs::read_dir(&self.downloads_dir)
            .map_err(|_| ScanError::MissingFolder(self.downloads_dir.clone()))?
            .flatten()
        {
            let path = entry.path();
            if !is_zip_file(&path) {
                continue;
            }
            if let Some(scanned) = self.scan_one(&path, now, window, job_number) {
                files_found.push(scanned);
            }
        }

        files_found.sort_by(|a, b| b.modified.cmp(&a.modified));
        let ready_count = files_found.iter().filter(|f| f.ready_for_processing).count();

        Ok(ScanReport {
            downloads_folder: self.downloads_dir.clone(),
            time_window_minutes: minutes_ago,
            total_found: files_found.len(),
            ready_count,
            files_found,
        })
    }

    fn scan_one(
        &self,
        path: &Path,
        now: SystemTime,
        window: std::time::Duration,
        job_number: Option<&str>,
    ) -> Option<ScannedArchive> {
        let metadata = fs::metadata(path).ok()?;
        let mtime = metadata.modified().ok()?;
        let age = now.duration_since(mtime).unwrap_or_default();
        if age > window {
            return None;
        }

        let filename = path.file_name()?.to_string_lossy().into_owned();
        let detected = self.detector.detect_from_name(&filename);
        if let Some(wanted) = job_number {
            if detected.job_number.as_deref() != Some(wanted) {
                return None;
            }
        }

        let size_bytes = metadata.len();
        let size_mb = round2(size_bytes as f64 / (1024.0 * 1024.0));
        let age_minutes = round1(age.as_secs_f64() / 60.0);
        let modified = DateTime::<Local>::from(mtime).to_rfc3339();

        let is_valid_archive = ArchiveExtractor::is_valid_archive(path);
        let size_warning = size_bytes > self.max_archive_size;

        Some(ScannedArchive {
            path: path.to_path_buf(),
            filename,
            size_bytes,
            size_mb,
            modified,
            age_minutes,
            detected_job: detected.job_number,
            detected_transmittal: detected.transmittal_number,
            detected_type: detected.delivery_type,
            is_valid_archive,
            size_warning,
            ready_for_processing: is_valid_archive && !size_warning,
        })
    }
}

fn is_zip_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path) {
        let file = fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("a.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"data").unwrap();
        writer.finish().unwrap();
    }

    fn scanner_for(dir: &Path) -> DownloadScanner {
        let mut config = PipelineConfig::default();
        config.downloads_dir = dir.to_path_buf();
        DownloadScanner::new(&config)
    }

    #[test]
    fn test_finds_recent_archives_with_metadata() {
        let tmp = TempDir::new().unwrap();
        write_zip(&tmp.path().join("6516_IFF_T077.zip"));
        fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let report = scanner_for(tmp.path()).scan(None, 15).unwrap();
        assert_eq!(report.total_found, 1);
        assert_eq!(report.ready_count, 1);

        let found = &report.files_found[0];
        assert_eq!(found.detected_job.as_deref(), Some("6516"));
        assert_eq!(found.detected_transmittal.as_deref(), Some("T077"));
        assert!(found.is_valid_archive);
        assert!(found.ready_for_processing);
    }

    #[test]
    fn test_job_filter_drops_other_jobs() {
        let tmp = TempDir::new().unwrap();
        write_zip(&tmp.path().join("6516_T077.zip"));
        write_zip(&tmp.path().join("7001_T001.zip"));

        let report = scanner_for(tmp.path()).scan(Some("7001"), 15).unwrap();
        assert_eq!(report.total_found, 1);
        assert_eq!(report.files_found[0].filename, "7001_T001.zip");
    }

    #[test]
    fn test_corrupt_archive_is_listed_but_not_ready() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("6516_T002.zip"), b"not a zip").unwrap();

        let report = scanner_for(tmp.path()).scan(None, 15).unwrap();
        assert_eq!(report.total_found, 1);
        assert!(!report.files_found[0].is_valid_archive);
        assert!(!report.files_found[0].ready_for_processing);
        assert_eq!(report.ready_count, 0);
    }

    #[test]
    fn test_window_is_clamped() {
        let tmp = TempDir::new().unwrap();
        let report = scanner_for(tmp.path()).scan(None, 500).unwrap();
        assert_eq!(report.time_window_minutes, 120);
        let report = scanner_for(tmp.path()).scan(None, 0).unwrap();
        assert_eq!(report.time_window_minutes, 1);
    }

    #[test]
    fn test_missing_downloads_folder() {
        let mut config = PipelineConfig::default();
        config.downloads_dir = PathBuf::from("/nonexistent/downloads");
        let err = DownloadScanner::new(&config).scan(None, 15).unwrap_err();
        assert!(err.to_string().contains("Downloads folder not found"));
    }
}
