//! Filename rules shared by the layout builder and the cover-sheet
//! assembler: revision stripping, revision-bucket detection and natural
//! ordering.

use std::cmp::Ordering;

use regex::Regex;

/// Compiled filename rules. Built once per component that needs them.
pub struct NameRules {
    /// `prefix - DESCRIPTOR - Rev X` collapse, e.g. part drawings named
    /// `p698 - PLATE - Rev 0`.
    part_collapse: Regex,
    /// Attached revision tokens: `E101_Rev_A`, `FAB-203 rev2`.
    rev_token: Regex,
    /// Single trailing `_x` suffix.
    tail_suffix: Regex,
    /// `Rev A` / `Revision 1` / `R3` style tokens for bucket detection.
    bucket_word: Regex,
    /// 1-2 character `-A` / `_0` suffix at the end of a stem.
    bucket_tail: Regex,
}

impl NameRules {
    pub fn new() -> Self {
        Self {
            part_collapse: Regex::new(
                r"(?i)^(?P<prefix>.+?)\s*-\s*(?P<desc>[^-]+?)\s*-\s*(?P<rev>rev(?:ision)?[\s_-]?[a-z0-9]+)\s*$",
            )
            .expect("static regex"),
            rev_token: Regex::new(r"(?i)[_\s-]?rev[\s_-]?[a-z0-9]+").expect("static regex"),
            tail_suffix: Regex::new(r"(?i)_[a-z0-9]$").expect("static regex"),
            bucket_word: Regex::new(
                r"(?i)\b(?:rev(?:ision)?\s*[-_.:]*\s*|r\s*[-_.:]+\s*|r\s+)([a-z0-9]+)|\br([0-9][a-z0-9]*)",
            )
            .expect("static regex"),
            bucket_tail: Regex::new(r"(?i)[-_]([a-z0-9]{1,2})$").expect("static regex"),
        }
    }

    /// Strips revision markers from a drawing filename.
    ///
    /// Three-segment names whose middle segment carries no digits are
    /// collapsed to `prefix - rev` and kept in that form (the middle segment
    /// is a descriptor like PLATE or BEAM, not a part number). Everything
    /// else loses attached `rev<token>` markers and a single trailing `_x`
    /// suffix. The spaced `prefix - Rev X` form survives a second pass
    /// unchanged, so stripping is idempotent.
    pub fn strip_revision(&self, filename: &str) -> String {
        let (stem, ext) = split_extension(filename);

        if let Some(caps) = self.part_collapse.captures(stem) {
            let desc = caps.name("desc").map(|m| m.as_str().trim()).unwrap_or("");
            if !desc.is_empty() && !desc.chars().any(|c| c.is_ascii_digit()) {
                let prefix = caps.name("prefix").map(|m| m.as_str().trim()).unwrap_or("");
                let rev = caps.name("rev").map(|m| m.as_str()).unwrap_or("");
                return format!("{} - {}{}", prefix, rev, ext);
            }
        }

        let mut cleaned = String::with_capacity(stem.len());
        let mut last_end = 0;
        let mut removed = false;
        for m in self.rev_token.find_iter(stem) {
            // A token preceded by a spaced hyphen is the collapsed
            // `prefix - Rev X` form and must be kept.
            if stem[..m.start()].trim_end().ends_with('-') {
                continue;
            }
            cleaned.push_str(&stem[last_end..m.start()]);
            last_end = m.end();
            removed = true;
        }
        cleaned.push_str(&stem[last_end..]);

        let mut cleaned = self.tail_suffix.replace(&cleaned, "").into_owned();
        if removed {
            cleaned = cleaned.trim_matches(['_', '-', ' ']).to_string();
        }

        format!("{}{}", cleaned, ext)
    }

    /// Detects the revision bucket for an erection or field drawing.
    ///
    /// Supports `Rev A` / `Revision 1` / `R3` tokens as well as 1-2
    /// character `_A` / `-0` suffixes right before the extension. Returns
    /// `{prefix}{REV}` or `{prefix} - Unknown` when nothing matches.
    pub fn revision_bucket(&self, filename: &str, prefix: &str) -> String {
        let (stem, _ext) = split_extension(filename);

        let rev = self
            .bucket_word
            .captures(stem)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .or_else(|| self.bucket_tail.captures(stem).and_then(|c| c.get(1)))
            .map(|m| m.as_str());

        match rev {
            Some(rev) => {
                let rev = rev
                    .split(|c: char| c.is_whitespace() || c == '(' || c == '[')
                    .next()
                    .unwrap_or("")
                    .to_uppercase();
                format!("{}{}", prefix, rev)
            }
            None => format!("{} - Unknown", prefix),
        }
    }
}

impl Default for NameRules {
    fn default() -> Self {
        Self::new()
    }
}

fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    }
}

/// One run of a filename when split for natural ordering.
/// Numeric runs sort before and among themselves numerically, so `E2`
/// orders before `E10`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    Num(u64),
    Text(String),
}

/// Natural sort key for a filename stem: alternating text and numeric runs,
/// numeric runs compared as numbers, text case-insensitively.
pub fn natural_key(stem: &str) -> Vec<KeyPart> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut digits = String::new();

    let flush_text = |text: &mut String, parts: &mut Vec<KeyPart>| {
        if !text.is_empty() {
            parts.push(KeyPart::Text(std::mem::take(text).to_lowercase()));
        }
    };
    let flush_digits = |digits: &mut String, parts: &mut Vec<KeyPart>| {
        if !digits.is_empty() {
            let value = digits.parse::<u64>().unwrap_or(u64::MAX);
            digits.clear();
            parts.push(KeyPart::Num(value));
        }
    };

    for c in stem.chars() {
        if c.is_ascii_digit() {
            flush_text(&mut text, &mut parts);
            digits.push(c);
        } else {
            flush_digits(&mut digits, &mut parts);
            text.push(c);
        }
    }
    flush_text(&mut text, &mut parts);
    flush_digits(&mut digits, &mut parts);

    parts
}

/// Compare two filename stems using natural ordering.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// Normalizes a name for pattern matching: lowercase with `-`/`_` turned
/// into spaces.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['-', '_'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> NameRules {
        NameRules::new()
    }

    #[test]
    fn test_strip_collapses_part_descriptor() {
        assert_eq!(
            rules().strip_revision("p698 - PLATE - Rev 0.pdf"),
            "p698 - Rev 0.pdf"
        );
        assert_eq!(
            rules().strip_revision("698 - BEAM - Revision A.pdf"),
            "698 - Revision A.pdf"
        );
    }

    #[test]
    fn test_strip_keeps_descriptor_with_digits() {
        // Middle segment looks like a part number, not a descriptor.
        let stripped = rules().strip_revision("AB12 - 03B7 - Rev 2.pdf");
        assert!(!stripped.contains("03B7 - Rev 2") || stripped.contains("03B7"));
    }

    #[test]
    fn test_strip_attached_rev_tokens() {
        assert_eq!(rules().strip_revision("E101_Rev_A.pdf"), "E101.pdf");
        assert_eq!(rules().strip_revision("FAB-203 rev 2.pdf"), "FAB-203.pdf");
    }

    #[test]
    fn test_strip_trailing_suffix() {
        assert_eq!(rules().strip_revision("B12_a.pdf"), "B12.pdf");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let rules = rules();
        for name in [
            "p698 - PLATE - Rev 0.pdf",
            "E101_Rev_A.pdf",
            "plain-name.pdf",
            "B12_a.pdf",
        ] {
            let once = rules.strip_revision(name);
            let twice = rules.strip_revision(&once);
            assert_eq!(once, twice, "not idempotent for {}", name);
        }
    }

    #[test]
    fn test_strip_leaves_plain_names_alone() {
        assert_eq!(rules().strip_revision("E-Sheet 12.pdf"), "E-Sheet 12.pdf");
    }

    #[test]
    fn test_bucket_from_rev_word() {
        assert_eq!(rules().revision_bucket("E-Sheet_Rev_A.pdf", "E"), "EA");
        assert_eq!(rules().revision_bucket("FW-2160-Rev_0.pdf", "F"), "F0");
        assert_eq!(rules().revision_bucket("Sheet Revision 3.pdf", "E"), "E3");
    }

    #[test]
    fn test_bucket_from_r_digit() {
        assert_eq!(rules().revision_bucket("E101-R3.pdf", "E"), "E3");
    }

    #[test]
    fn test_bucket_from_tail_suffix() {
        assert_eq!(rules().revision_bucket("E101_B.pdf", "E"), "EB");
        assert_eq!(rules().revision_bucket("FW-21-1.pdf", "F"), "F1");
    }

    #[test]
    fn test_bucket_unknown() {
        assert_eq!(rules().revision_bucket("FW 2031.pdf", "F"), "F - Unknown");
    }

    #[test]
    fn test_natural_order_numeric_runs() {
        let mut names = vec!["E10", "E2", "E1"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["E1", "E2", "E10"]);
    }

    #[test]
    fn test_natural_order_mixed() {
        let mut names = vec!["FW002", "E001", "1234", "e005"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["1234", "E001", "e005", "FW002"]);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("6516_IFF-T077"), "6516 iff t077");
    }
}
