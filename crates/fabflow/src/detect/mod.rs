//! Transmittal metadata detection: job number, transmittal number and
//! delivery type, read from archive names, archive contents and emails.

mod email;
mod metadata;

pub use email::{Attachment, CloudLink, EmailAnalysis, EmailTriage, SourceDetection};
pub use metadata::{DetectedMetadata, MetadataDetector};

use regex::Regex;
use serde::Serialize;

/// How the drawings in a transmittal are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryType {
    #[serde(rename = "IFA")]
    Ifa,
    #[serde(rename = "IFF")]
    Iff,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Ifa => "IFA",
            DeliveryType::Iff => "IFF",
            DeliveryType::Unknown => "UNKNOWN",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, DeliveryType::Unknown)
    }
}

impl std::fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Keywords marking an approval issue. Underscore forms match raw
/// filenames; separator-normalized text is matched against the spaced
/// forms.
pub(crate) const IFA_KEYWORDS: [&str; 5] = [
    "ifa",
    "for_approval",
    "in_for_approval",
    "approval_dwg",
    "review_set",
];

pub(crate) const IFF_KEYWORDS: [&str; 7] = [
    "iff",
    "for_fabrication",
    "fabrication",
    "for_construction",
    "in_for_fabrication",
    "construction_set",
    "fabrication_set",
];

/// Regexes shared by the archive detector and the email triage.
pub(crate) struct DetectorPatterns {
    /// Letter revision marker, a weak approval hint.
    pub ifa_weak: Regex,
    /// Numeric revision marker, a weak fabrication hint.
    pub iff_weak: Regex,
    /// `transmittal 17` / `tr#9` / `t 077` with the significant digits
    /// captured.
    transmittal: Regex,
    digit_run: Regex,
}

impl DetectorPatterns {
    pub fn new() -> Self {
        Self {
            ifa_weak: Regex::new(r"(?i)\brev[\s_-]*[a-z]{1,2}\b").expect("static regex"),
            iff_weak: Regex::new(r"(?i)rev[\s_-]*\d+").expect("static regex"),
            transmittal: Regex::new(r"(?i)\b(?:transmittal|tr|t)[\s#]*0*(\d{1,3})(?:[^0-9]|$)")
                .expect("static regex"),
            digit_run: Regex::new(r"\d+").expect("static regex"),
        }
    }

    /// First 4-digit run that is not the current year. Longer runs never
    /// count, so `20250114` is not a job number.
    pub fn job_number(&self, text: &str, current_year: &str) -> Option<String> {
        self.digit_run
            .find_iter(text)
            .map(|m| m.as_str())
            .find(|run| run.len() == 4 && *run != current_year)
            .map(String::from)
    }

    /// Transmittal number formatted as `T###`.
    pub fn transmittal_number(&self, text: &str) -> Option<String> {
        self.transmittal
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .map(|n| format!("T{:03}", n))
    }

    /// Keyword and revision-marker evidence for each delivery type.
    /// A keyword is worth 2, a revision marker 1.
    pub fn score_type(&self, text: &str, ifa_keywords: &[String], iff_keywords: &[String]) -> (u32, u32) {
        let mut ifa = 0;
        let mut iff = 0;
        if ifa_keywords.iter().any(|k| text.contains(k.as_str())) {
            ifa += 2;
        }
        if self.ifa_weak.is_match(text) {
            ifa += 1;
        }
        if iff_keywords.iter().any(|k| text.contains(k.as_str())) {
            iff += 2;
        }
        if self.iff_weak.is_match(text) {
            iff += 1;
        }
        (ifa, iff)
    }

    /// Resolves a score pair: the strictly higher non-zero score wins.
    pub fn resolve_scores(ifa: u32, iff: u32) -> DeliveryType {
        if ifa > iff && ifa > 0 {
            DeliveryType::Ifa
        } else if iff > ifa && iff > 0 {
            DeliveryType::Iff
        } else {
            DeliveryType::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_number_skips_current_year() {
        let patterns = DetectorPatterns::new();
        assert_eq!(
            patterns.job_number("2025 6516 iff t077", "2025"),
            Some("6516".to_string())
        );
    }

    #[test]
    fn test_job_number_ignores_longer_runs() {
        let patterns = DetectorPatterns::new();
        assert_eq!(patterns.job_number("20250114 export", "2025"), None);
        assert_eq!(patterns.job_number("job 123", "2025"), None);
    }

    #[test]
    fn test_transmittal_number_formats() {
        let patterns = DetectorPatterns::new();
        assert_eq!(
            patterns.transmittal_number("6516 iff t077"),
            Some("T077".to_string())
        );
        assert_eq!(
            patterns.transmittal_number("transmittal #9 drawings"),
            Some("T009".to_string())
        );
        assert_eq!(
            patterns.transmittal_number("tr 120 set"),
            Some("T120".to_string())
        );
        assert_eq!(patterns.transmittal_number("no markers here"), None);
    }

    #[test]
    fn test_transmittal_requires_short_run() {
        let patterns = DetectorPatterns::new();
        // Five significant digits is not a transmittal number.
        assert_eq!(patterns.transmittal_number("t 12345 export"), None);
    }

    #[test]
    fn test_score_resolution() {
        assert_eq!(DetectorPatterns::resolve_scores(2, 1), DeliveryType::Ifa);
        assert_eq!(DetectorPatterns::resolve_scores(1, 3), DeliveryType::Iff);
        assert_eq!(DetectorPatterns::resolve_scores(2, 2), DeliveryType::Unknown);
        assert_eq!(DetectorPatterns::resolve_scores(0, 0), DeliveryType::Unknown);
    }
}
