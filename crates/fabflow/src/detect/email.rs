//! Email triage: deciding whether an inbound email carries a transmittal
//! and pulling job metadata out of its subject, body and attachments.

use chrono::{Datelike, Utc};
use regex::Regex;
use serde::Serialize;

use super::{Confidence, DeliveryType, DetectorPatterns, IFA_KEYWORDS, IFF_KEYWORDS};
use crate::naming::normalize_name;

/// Attachment gate: too small is a logo, too large never arrives by email.
pub const MIN_ATTACHMENT_SIZE: u64 = 10 * 1024;
pub const MAX_ATTACHMENT_SIZE: u64 = 500 * 1024 * 1024;

const ZIP_CONTENT_TYPES: [&str; 4] = [
    "application/zip",
    "application/x-zip-compressed",
    "application/x-zip",
    "application/octet-stream",
];

/// Subjects and bodies matching any of these are shop coordination, not
/// transmittals.
const EXCLUSION_PATTERNS: [&str; 23] = [
    r"\bproduction\s+note",
    r"\bprod\s+note",
    r"\bp\.n\.",
    r"\bcutlist",
    r"\bcut\s+list",
    r"\bmaterial\s+list",
    r"\bplease\s+issue\s+a\s+cut",
    r"\bissue\s+cut\s+list",
    r"\bpkg\s*#\s*\d+",
    r"\bpackage\s*#\s*\d+",
    r"\bsub.fabricator",
    r"\bsub#",
    r"\brfi\s*#?\s*\d+",
    r"\brequest\s+for\s+information",
    r"\bchange\s+order",
    r"\bco\s*#?\s*\d+",
    r"\baddendum",
    r"\braw\s+material",
    r"\bpick\s+up\s+from\s+sub",
    r"\bship\s+to\s+sub",
    r"\bbay\s+\d+\s+parts",
    r"\bdrawings\s+posted",
    r"\bbid\s+invitation",
];

/// Cloud storage providers and the link shapes they hand out.
const CLOUD_PROVIDERS: [(&str, &str); 15] = [
    ("sharepoint", r"(?:https?://)?[\w.-]*sharepoint\.com/[:\w/_?=&%-]+"),
    ("onedrive", r"(?:https?://)?1drv\.ms/[\w/_?=&%-]+"),
    ("onedrive", r"(?:https?://)?onedrive\.live\.com/[\w/_?=&%-]+"),
    (
        "wetransfer",
        r"(?:https?://)?(?:www\.)?wetransfer\.com/downloads/[\w/_?=&%-]+",
    ),
    ("wetransfer", r"(?:https?://)?we\.tl/[\w-]+"),
    ("dropbox", r"(?:https?://)?(?:www\.)?dropbox\.com/[\w/_?=&%-]+"),
    ("dropbox", r"(?:https?://)?db\.tt/[\w-]+"),
    ("google_drive", r"(?:https?://)?drive\.google\.com/[\w/_?=&%-]+"),
    ("google_drive", r"(?:https?://)?docs\.google\.com/[\w/_?=&%-]+"),
    ("box", r"(?:https?://)?(?:www\.)?box\.com/[\w/_?=&%-]+"),
    ("box", r"(?:https?://)?app\.box\.com/[\w/_?=&%-]+"),
    ("hightail", r"(?:https?://)?(?:www\.)?hightail\.com/[\w/_?=&%-]+"),
    ("hightail", r"(?:https?://)?(?:www\.)?yousendit\.com/[\w/_?=&%-]+"),
    ("egnyte", r"(?:https?://)?[\w.-]*egnyte\.com/[\w/_?=&%-]+"),
    ("sharefile", r"(?:https?://)?[\w.-]*sharefile\.com/[\w/_?=&%-]+"),
];

/// Security scanning services that wrap the real download link.
const SECURITY_SCANNERS: [&str; 7] = [
    "trustifi.com",
    "onclickscan.trustifi.com",
    "secure-web.cisco.com",
    "urldefense.proofpoint.com",
    "safelinks.protection.outlook.com",
    "clicktime.symantec.com",
    "urlscan.io",
];

const DOWNLOAD_EXTENSIONS: [&str; 6] = [".zip", ".rar", ".7z", ".pdf", ".dwg", ".dxf"];

const TRANSMITTAL_ANCHOR_KEYWORDS: [&str; 5] =
    ["transmittal", "tr#", "t#", "download", "click here to download"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub is_inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloudLink {
    pub link: String,
    pub provider: String,
    pub raw_match: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Detection result for a single source (subject, body or attachments).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceDetection {
    pub job_number: Option<String>,
    pub transmittal_number: Option<String>,
    pub delivery_type: Option<DeliveryType>,
    pub excluded: bool,
}

impl SourceDetection {
    fn detected_fields(&self) -> u32 {
        self.job_number.is_some() as u32
            + self.transmittal_number.is_some() as u32
            + self.delivery_type.is_some() as u32
    }

    pub fn confidence(&self) -> Confidence {
        match self.detected_fields() {
            n if n >= 2 => Confidence::High,
            1 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

/// Combined verdict for one email.
#[derive(Debug, Clone, Serialize)]
pub struct EmailAnalysis {
    pub job_number: Option<String>,
    pub transmittal_number: Option<String>,
    pub delivery_type: Option<DeliveryType>,
    pub confidence: Confidence,
    pub detected_from: Vec<String>,
    pub is_transmittal: bool,
    pub excluded: bool,
    pub exclusion_reason: Option<String>,
    pub cloud_links: Vec<CloudLink>,
}

/// Classifies inbound email as transmittal or noise and extracts metadata
/// from whatever sources it carries.
pub struct EmailTriage {
    patterns: DetectorPatterns,
    exclusions: Vec<Regex>,
    cloud_links: Vec<(&'static str, Regex)>,
    anchor: Regex,
    ifa_keywords: Vec<String>,
    iff_keywords: Vec<String>,
    current_year: String,
}

impl EmailTriage {
    pub fn new() -> Self {
        Self {
            patterns: DetectorPatterns::new(),
            exclusions: EXCLUSION_PATTERNS
                .iter()
                .map(|p| Regex::new(&format!("(?i){}", p)).expect("static regex"))
                .collect(),
            cloud_links: CLOUD_PROVIDERS
                .iter()
                .map(|(provider, pattern)| {
                    (
                        *provider,
                        Regex::new(&format!("(?i){}", pattern)).expect("static regex"),
                    )
                })
                .collect(),
            anchor: Regex::new(r#"(?is)<a[^>]*href=["']([^"']+)["'][^>]*>([^<]*)</a>"#)
                .expect("static regex"),
            // Email text is separator-normalized before matching, so the
            // keyword lists are normalized the same way.
            ifa_keywords: IFA_KEYWORDS.iter().map(|k| k.replace('_', " ")).collect(),
            iff_keywords: IFF_KEYWORDS.iter().map(|k| k.replace('_', " ")).collect(),
            current_year: Utc::now().year().to_string(),
        }
    }

    pub fn is_excluded(&self, text: &str) -> bool {
        let normalized = normalize_name(text);
        self.exclusions.iter().any(|re| re.is_match(&normalized))
    }

    pub fn detect_from_subject(&self, subject: &str) -> SourceDetection {
        if subject.is_empty() {
            return SourceDetection::default();
        }
        if self.is_excluded(subject) {
            return SourceDetection {
                excluded: true,
                ..SourceDetection::default()
            };
        }
        self.detect_from_text(subject)
    }

    pub fn detect_from_body(&self, body: &str) -> SourceDetection {
        if body.is_empty() {
            return SourceDetection::default();
        }
        let clean = strip_html_tags(body);
        self.detect_from_text(&clean)
    }

    pub fn detect_from_attachment_names(&self, attachments: &[Attachment]) -> SourceDetection {
        if attachments.is_empty() {
            return SourceDetection::default();
        }
        let all_names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
        self.detect_from_text(&all_names.join(" "))
    }

    fn detect_from_text(&self, text: &str) -> SourceDetection {
        let normalized = normalize_name(text);
        let (ifa, iff) =
            self.patterns
                .score_type(&normalized, &self.ifa_keywords, &self.iff_keywords);
        let delivery_type = match DetectorPatterns::resolve_scores(ifa, iff) {
            DeliveryType::Unknown => None,
            known => Some(known),
        };

        SourceDetection {
            job_number: self.patterns.job_number(&normalized, &self.current_year),
            transmittal_number: self.patterns.transmittal_number(&normalized),
            delivery_type,
            excluded: false,
        }
    }

    /// Cloud download links found in the body, deduplicated by normalized
    /// URL. Anchor tags are checked as well since security scanners often
    /// mangle the bare URL text.
    pub fn extract_cloud_links(&self, body: &str) -> Vec<CloudLink> {
        let mut found = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for (provider, pattern) in &self.cloud_links {
            for m in pattern.find_iter(body) {
                let raw = m.as_str().to_string();
                let normalized = normalize_link(&raw);
                if seen.insert(normalized.clone()) {
                    found.push(CloudLink {
                        link: normalized,
                        provider: provider.to_string(),
                        raw_match: raw,
                        anchor_text: None,
                        note: None,
                    });
                }
            }
        }

        for caps in self.anchor.captures_iter(body) {
            let url = caps[1].to_string();
            let anchor_text = caps[2].trim().to_string();

            let provider = self
                .cloud_links
                .iter()
                .find(|(_, pattern)| pattern.is_match(&url))
                .map(|(provider, _)| *provider);

            if let Some(provider) = provider {
                let normalized = normalize_link(&url);
                if seen.insert(normalized.clone()) {
                    found.push(CloudLink {
                        link: normalized,
                        provider: provider.to_string(),
                        raw_match: url,
                        anchor_text: (!anchor_text.is_empty()).then_some(anchor_text),
                        note: None,
                    });
                }
            } else if is_security_scanner_link(&url) && is_download_anchor(&anchor_text) {
                let normalized = normalize_link(&url);
                if seen.insert(normalized.clone()) {
                    found.push(CloudLink {
                        link: normalized,
                        provider: "security_scanner".to_string(),
                        raw_match: url,
                        anchor_text: Some(anchor_text),
                        note: Some(
                            "Link wrapped by email security scanner - opens in browser".to_string(),
                        ),
                    });
                }
            }
        }

        found
    }

    /// Whole-email analysis: exclusion gate, per-source detection merged
    /// first-wins in subject, body, attachments order, plus cloud links.
    pub fn analyze(&self, subject: &str, body: &str, attachments: &[Attachment]) -> EmailAnalysis {
        if self.is_excluded(&format!("{} {}", subject, body)) {
            return EmailAnalysis {
                job_number: None,
                transmittal_number: None,
                delivery_type: None,
                confidence: Confidence::Low,
                detected_from: Vec::new(),
                is_transmittal: false,
                excluded: true,
                exclusion_reason: Some(
                    "Matched exclusion pattern (cutlist, production note, RFI, etc.)".to_string(),
                ),
                cloud_links: Vec::new(),
            };
        }

        let cloud_links = self.extract_cloud_links(body);

        let detections = [
            ("subject", self.detect_from_subject(subject)),
            ("body", self.detect_from_body(body)),
            ("attachments", self.detect_from_attachment_names(attachments)),
        ];

        let mut job_number = None;
        let mut transmittal_number = None;
        let mut delivery_type = None;
        let mut detected_from: Vec<String> = Vec::new();
        let mut record = |source: &str, detected_from: &mut Vec<String>| {
            if !detected_from.iter().any(|s| s == source) {
                detected_from.push(source.to_string());
            }
        };

        for (source, detection) in &detections {
            if job_number.is_none() && detection.job_number.is_some() {
                job_number = detection.job_number.clone();
                record(source, &mut detected_from);
            }
            if transmittal_number.is_none() && detection.transmittal_number.is_some() {
                transmittal_number = detection.transmittal_number.clone();
                record(source, &mut detected_from);
            }
            if delivery_type.is_none() && detection.delivery_type.is_some() {
                delivery_type = detection.delivery_type;
                record(source, &mut detected_from);
            }
        }

        let mut confidence = self.calculate_confidence(detections.iter().map(|(_, d)| d));

        let has_detection =
            job_number.is_some() || transmittal_number.is_some() || delivery_type.is_some();
        if !cloud_links.is_empty() && has_detection {
            detected_from.push("cloud_links".to_string());
            confidence = Confidence::High;
        }

        let has_transmittal_attachment = attachments
            .iter()
            .any(|a| self.is_likely_transmittal_attachment(a));
        let is_transmittal =
            (has_transmittal_attachment || !cloud_links.is_empty()) && has_detection;

        EmailAnalysis {
            job_number,
            transmittal_number,
            delivery_type,
            confidence,
            detected_from,
            is_transmittal,
            excluded: false,
            exclusion_reason: None,
            cloud_links,
        }
    }

    /// Agreement across sources: conflicts drop to low, two fields each
    /// backed by two sources read as high, any detection at all as medium.
    fn calculate_confidence<'a>(
        &self,
        detections: impl Iterator<Item = &'a SourceDetection> + Clone,
    ) -> Confidence {
        let jobs: Vec<&String> = detections
            .clone()
            .filter_map(|d| d.job_number.as_ref())
            .collect();
        let trans: Vec<&String> = detections
            .clone()
            .filter_map(|d| d.transmittal_number.as_ref())
            .collect();
        let types: Vec<DeliveryType> = detections
            .clone()
            .filter_map(|d| d.delivery_type)
            .collect();

        let conflicts = |values: &[&String]| {
            values
                .windows(2)
                .any(|w| w[0] != w[1])
        };
        if conflicts(&jobs) || conflicts(&trans) || types.windows(2).any(|w| w[0] != w[1]) {
            return Confidence::Low;
        }

        let agreeing_fields = [jobs.len(), trans.len(), types.len()]
            .iter()
            .filter(|&&count| count >= 2)
            .count();
        if agreeing_fields >= 2 {
            return Confidence::High;
        }

        if jobs.len() + trans.len() + types.len() >= 1 {
            return Confidence::Medium;
        }
        Confidence::Low
    }

    /// Size-gated zip check with a transmittal-indicator pass over the
    /// name. Inline attachments (signatures, logos) never qualify.
    pub fn is_likely_transmittal_attachment(&self, attachment: &Attachment) -> bool {
        if attachment.is_inline {
            return false;
        }

        let name = attachment.name.to_lowercase();
        let content_type = attachment.content_type.to_lowercase();
        let is_zip =
            name.ends_with(".zip") || ZIP_CONTENT_TYPES.contains(&content_type.as_str());
        if !is_zip {
            return false;
        }

        (MIN_ATTACHMENT_SIZE..=MAX_ATTACHMENT_SIZE).contains(&attachment.size)
    }
}

impl Default for EmailTriage {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_html_tags(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_tag = false;
    for c in body.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn normalize_link(link: &str) -> String {
    if link.starts_with("https://") || link.starts_with("http://") {
        link.to_string()
    } else {
        format!("https://{}", link)
    }
}

fn is_security_scanner_link(url: &str) -> bool {
    let lower = url.to_lowercase();
    SECURITY_SCANNERS.iter().any(|s| lower.contains(s))
}

fn is_download_anchor(anchor_text: &str) -> bool {
    if anchor_text.is_empty() {
        return false;
    }
    let lower = anchor_text.to_lowercase();
    DOWNLOAD_EXTENSIONS.iter().any(|ext| lower.contains(ext))
        || TRANSMITTAL_ANCHOR_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, size: u64) -> Attachment {
        Attachment {
            name: name.to_string(),
            size,
            content_type: "application/zip".to_string(),
            is_inline: false,
        }
    }

    #[test]
    fn test_cutlist_email_is_excluded() {
        let triage = EmailTriage::new();
        let analysis = triage.analyze("Cut list request for 6509", "please issue a cut list", &[]);
        assert!(analysis.excluded);
        assert!(!analysis.is_transmittal);
        assert_eq!(analysis.confidence, Confidence::Low);
    }

    #[test]
    fn test_subject_detection() {
        let triage = EmailTriage::new();
        let detection = triage.detect_from_subject("Job 6509 Transmittal 22 IFF");
        assert_eq!(detection.job_number.as_deref(), Some("6509"));
        assert_eq!(detection.transmittal_number.as_deref(), Some("T022"));
        assert_eq!(detection.delivery_type, Some(DeliveryType::Iff));
    }

    #[test]
    fn test_subject_wins_over_body() {
        let triage = EmailTriage::new();
        let analysis = triage.analyze(
            "6509 T022 IFF",
            "see job 6444 attached",
            &[attachment("6509_T022.zip", 1024 * 1024)],
        );
        assert_eq!(analysis.job_number.as_deref(), Some("6509"));
        assert_eq!(analysis.detected_from[0], "subject");
    }

    #[test]
    fn test_conflicting_sources_drop_confidence() {
        let triage = EmailTriage::new();
        let analysis = triage.analyze(
            "Job 6509 drawings T01",
            "this covers job 6444",
            &[],
        );
        assert_eq!(analysis.confidence, Confidence::Low);
    }

    #[test]
    fn test_agreeing_sources_raise_confidence() {
        let triage = EmailTriage::new();
        let analysis = triage.analyze(
            "6509 T022",
            "transmittal 22 for job 6509",
            &[],
        );
        assert_eq!(analysis.confidence, Confidence::High);
    }

    #[test]
    fn test_cloud_link_extraction_and_dedupe() {
        let triage = EmailTriage::new();
        let body = concat!(
            "Download: https://we.tl/t-abc123 and also ",
            r#"<a href="https://we.tl/t-abc123">6509_T022.zip</a>"#
        );
        let links = triage.extract_cloud_links(body);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].provider, "wetransfer");
    }

    #[test]
    fn test_scanner_wrapped_link_needs_download_anchor() {
        let triage = EmailTriage::new();
        let body = concat!(
            r#"<a href="https://secure-web.cisco.com/xyz">transmittal T022.zip</a>"#,
            r#"<a href="https://secure-web.cisco.com/other">unsubscribe</a>"#
        );
        let links = triage.extract_cloud_links(body);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].provider, "security_scanner");
        assert!(links[0].note.is_some());
    }

    #[test]
    fn test_link_without_protocol_is_normalized() {
        let triage = EmailTriage::new();
        let links = triage.extract_cloud_links("grab it at we.tl/t-xyz789 today");
        assert_eq!(links.len(), 1);
        assert!(links[0].link.starts_with("https://"));
    }

    #[test]
    fn test_cloud_link_with_metadata_is_transmittal() {
        let triage = EmailTriage::new();
        let analysis = triage.analyze(
            "Job 6509 transmittal",
            "download from https://wetransfer.com/downloads/abc123",
            &[],
        );
        assert!(analysis.is_transmittal);
        assert_eq!(analysis.confidence, Confidence::High);
        assert!(analysis.detected_from.iter().any(|s| s == "cloud_links"));
    }

    #[test]
    fn test_attachment_gate() {
        let triage = EmailTriage::new();
        assert!(triage.is_likely_transmittal_attachment(&attachment("6509_T022.zip", 1024 * 1024)));
        // Tiny zips are signatures or icons.
        assert!(!triage.is_likely_transmittal_attachment(&attachment("logo.zip", 512)));
        // Non-zip attachments never qualify.
        let mut pdf = attachment("list.pdf", 1024 * 1024);
        pdf.content_type = "application/pdf".to_string();
        assert!(!triage.is_likely_transmittal_attachment(&pdf));
        // Inline images are skipped outright.
        let mut inline = attachment("embedded.zip", 1024 * 1024);
        inline.is_inline = true;
        assert!(!triage.is_likely_transmittal_attachment(&inline));
    }

    #[test]
    fn test_no_metadata_means_not_transmittal() {
        let triage = EmailTriage::new();
        let analysis = triage.analyze(
            "quick question",
            "see https://we.tl/t-abc123",
            &[],
        );
        assert!(!analysis.is_transmittal);
    }
}
