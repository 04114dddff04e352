use std::path::Path;

use chrono::{Datelike, Utc};

use super::{Confidence, DeliveryType, DetectorPatterns, IFA_KEYWORDS, IFF_KEYWORDS};
use crate::archive::ArchiveExtractor;
use crate::joblog::JobLog;
use crate::naming::normalize_name;

/// Metadata pulled from a transmittal archive before processing starts.
#[derive(Debug, Clone)]
pub struct DetectedMetadata {
    pub job_number: Option<String>,
    pub transmittal_number: Option<String>,
    pub delivery_type: DeliveryType,
}

impl DetectedMetadata {
    /// Confidence grows with the number of detected fields.
    pub fn confidence(&self) -> Confidence {
        let detected = self.job_number.is_some() as u32
            + self.transmittal_number.is_some() as u32
            + self.delivery_type.is_known() as u32;
        match detected {
            n if n >= 2 => Confidence::High,
            1 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

/// Detects job number, transmittal number and delivery type for an
/// archive. The archive's filename is consulted first; when it gives
/// nothing, entry names inside the archive are scanned.
pub struct MetadataDetector {
    patterns: DetectorPatterns,
    ifa_keywords: Vec<String>,
    iff_keywords: Vec<String>,
    current_year: String,
}

impl MetadataDetector {
    pub fn new() -> Self {
        Self {
            patterns: DetectorPatterns::new(),
            ifa_keywords: IFA_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            iff_keywords: IFF_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            current_year: Utc::now().year().to_string(),
        }
    }

    /// Full detection pass over an archive.
    pub fn detect(&self, zip_path: &Path, log: &JobLog) -> DetectedMetadata {
        let filename = zip_path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let normalized = normalize_name(filename.trim_end_matches(".zip"));

        let entries = || self.entry_names(zip_path, log);

        let job_number = self
            .patterns
            .job_number(&normalized, &self.current_year)
            .or_else(|| {
                let detected = self.scan_entries_for_job(&entries());
                log.info(format!(
                    "Job number detected via contents: {}",
                    detected.as_deref().unwrap_or("UNKNOWN")
                ));
                detected
            });

        let transmittal_number = self.patterns.transmittal_number(&normalized).or_else(|| {
            let detected = self.scan_entries_for_transmittal(&entries());
            log.info(format!(
                "Detected transmittal number from ZIP contents: {}",
                detected.as_deref().unwrap_or("UNKNOWN")
            ));
            detected
        });

        let delivery_type = self.detect_type(&filename, &entries, log);

        DetectedMetadata {
            job_number,
            transmittal_number,
            delivery_type,
        }
    }

    /// Filename-only detection, used by the download scanner where opening
    /// every archive would be too slow.
    pub fn detect_from_name(&self, filename: &str) -> DetectedMetadata {
        let lower = filename.to_lowercase();
        let normalized = normalize_name(lower.trim_end_matches(".zip"));

        DetectedMetadata {
            job_number: self.patterns.job_number(&normalized, &self.current_year),
            transmittal_number: self.patterns.transmittal_number(&normalized),
            delivery_type: self.type_from_name(&lower),
        }
    }

    /// The filename verdict wins outright; content scoring only runs when
    /// the filename carries no evidence at all.
    fn detect_type(
        &self,
        filename: &str,
        entries: &dyn Fn() -> Vec<String>,
        log: &JobLog,
    ) -> DeliveryType {
        let from_name = self.type_from_name(filename);
        if from_name.is_known() {
            log.success(format!("Detected type: {} from zip file name", from_name));
            return from_name;
        }

        let (ifa, iff) = entries().iter().fold((0, 0), |(ifa, iff), entry| {
            let lower = entry.to_lowercase();
            let (a, f) =
                self.patterns
                    .score_type(&lower, &self.ifa_keywords, &self.iff_keywords);
            (ifa + a, iff + f)
        });
        let detected = DetectorPatterns::resolve_scores(ifa, iff);
        log.info(format!(
            "Type detected via contents (IFA score={}, IFF score={}): {}",
            ifa, iff, detected
        ));
        detected
    }

    fn type_from_name(&self, lower_filename: &str) -> DeliveryType {
        if self
            .ifa_keywords
            .iter()
            .any(|k| lower_filename.contains(k.as_str()))
            || self.patterns.ifa_weak.is_match(lower_filename)
        {
            DeliveryType::Ifa
        } else if self
            .iff_keywords
            .iter()
            .any(|k| lower_filename.contains(k.as_str()))
            || self.patterns.iff_weak.is_match(lower_filename)
        {
            DeliveryType::Iff
        } else {
            DeliveryType::Unknown
        }
    }

    fn scan_entries_for_job(&self, entries: &[String]) -> Option<String> {
        entries
            .iter()
            .find_map(|e| self.patterns.job_number(&e.to_lowercase(), &self.current_year))
    }

    fn scan_entries_for_transmittal(&self, entries: &[String]) -> Option<String> {
        entries
            .iter()
            .find_map(|e| self.patterns.transmittal_number(&normalize_name(e)))
    }

    fn entry_names(&self, zip_path: &Path, log: &JobLog) -> Vec<String> {
        match ArchiveExtractor::new(zip_path).entry_names() {
            Ok(names) => names,
            Err(e) => {
                log.error(format!("Error scanning ZIP contents: {}", e));
                Vec::new()
            }
        }
    }
}

impl Default for MetadataDetector {
    fn default() -> Self {
        Self::new()
    }
}
