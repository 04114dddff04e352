use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use super::{Category, Classified};
use crate::joblog::JobLog;

/// Folder name components that act as generic containers rather than
/// category folders.
const CONTAINER_FOLDERS: [&str; 3] = ["drawings", "pdf assemblies", "ifc package"];

/// Path fragments marking duplicate render folders that fab rules skip.
const DUPLICATE_RENDER_TOKENS: [&str; 3] = ["pdf assemblies", "pdf parts", "ifc package"];

/// Keywords that make a top-level folder read as category content rather
/// than a transmittal container.
const ROOT_CATEGORY_KEYWORDS: [&str; 14] = [
    "fw",
    "fwd",
    "field",
    "fab",
    "fabrication",
    "e-dwg",
    "edwg",
    "erection",
    "shop",
    "nc1",
    "nc",
    "dxf",
    "parts",
    "zeman",
];

/// Paper sizes and plain content words. These mark simple content folders,
/// not structured transmittal names.
const SIMPLE_CONTENT_INDICATORS: [&str; 5] = ["11x17", "16x24", "24x36", "drawing", "drawings"];

/// Extensions never copied anywhere.
const OTHER_EXCLUSIONS: [&str; 2] = ["db", "db1"];

/// Sorts an extracted transmittal into categories.
///
/// Folder rules claim PDFs beneath matching folders; a file-level pass
/// routes CNC data, models and import files by extension; a residual pass
/// sweeps the rest into `Other`. Zeman exports are discovered first and
/// kept disjoint from every other category.
pub struct FileClassifier {
    zeman: Regex,
    zeman_child_numeric: Regex,
    zeman_child_coded: Regex,
    fab_dwgs: Regex,
    fab_folder: Regex,
    parts: Regex,
    erection: Regex,
    erection_overlay: Regex,
    field: Regex,
    void: Regex,
    list_cover: Regex,
    drawing_code: Regex,
    tr_token: Regex,
    issue_code: Regex,
    job_prefix: Regex,
    date_token: Regex,
    company_prefix: Regex,
    four_digits: Regex,
}

impl FileClassifier {
    pub fn new() -> Self {
        Self {
            zeman: Regex::new(r"(?i)(?:\d+\.\s*)?\bzeman([\s_-]?(files?|reports?|exports?))?\b")
                .expect("static regex"),
            zeman_child_numeric: Regex::new(r"(?i)^\d+[a-z]*$").expect("static regex"),
            zeman_child_coded: Regex::new(r"(?i)^[a-z]{1,3}\d+[a-z]*$").expect("static regex"),
            // Names containing "part" are rejected in code before these run.
            fab_dwgs: Regex::new(
                r"(?i)^(?:\d+\.\s*)?(fab|assembly)[\s_-]?(11x17|16x24|24x36|dwg(s)?|drawings?)?",
            )
            .expect("static regex"),
            fab_folder: Regex::new(
                r"(?i)^(?:\d+\.\s*)?(shop|fab(rication)?)[\s_-]?(drawings?|dwg(s)?)?",
            )
            .expect("static regex"),
            parts: Regex::new(
                r"(?i)\b((?:part|single[\s_-]?part|gather)s?[\s_-]?(?:dwg(s)?|drawings?|sheet(s)?)?)\b",
            )
            .expect("static regex"),
            erection: Regex::new(
                r"(?i)\b(e[\s_-]*(sheet(s)?|dwg(s)?|drawings?)|erection([\s_-]?(drawings?|dwg(s)?|sheet(s)?))?)\b",
            )
            .expect("static regex"),
            erection_overlay: Regex::new(r"(?i)^\s*e[\s_-]*plans?\b").expect("static regex"),
            field: Regex::new(
                r"(?i)\b((field[\s_-]?work?)|fw)[\s_-]*(drawings?|dwg(s)?|sheet(s)?)?\b",
            )
            .expect("static regex"),
            void: Regex::new(r"(?i)void").expect("static regex"),
            list_cover: Regex::new(
                r"(?i)transmittal(?:[\s_#-]*t?\s*#?\d+)?(?:[\s_-]?(?:list|cover(?:ing)?[\s_-]?letter|sheet|summary|pkg|package|info|record))?",
            )
            .expect("static regex"),
            // First token checked against "fw" in code.
            drawing_code: Regex::new(r"(?i)\b([a-z]{2,4})(?:[-_][a-z0-9]{2,4}){2,}(?:[-_]\d+)+")
                .expect("static regex"),
            tr_token: Regex::new(r"\btr#\d+|\bt#\d+").expect("static regex"),
            issue_code: Regex::new(r"\b(iff|ifa|rff|rfa|ifc)\b").expect("static regex"),
            job_prefix: Regex::new(r"^\d{4}[_\-\s#]").expect("static regex"),
            date_token: Regex::new(r"\d{1,2}[-.]\d{1,2}[-.]\d{2,4}").expect("static regex"),
            company_prefix: Regex::new(r"^[a-z]+_\d{4}").expect("static regex"),
            four_digits: Regex::new(r"\d{4}").expect("static regex"),
        }
    }

    /// Classifies everything under `work_dir`. Unreadable entries are
    /// logged and skipped; classification itself never fails.
    pub fn classify(&self, work_dir: &Path, log: &JobLog) -> Classified {
        let mut result = Classified::new();

        self.collect_zeman_folders(work_dir, &mut result);
        self.collect_originals(work_dir, &mut result, log);
        self.classify_folders(work_dir, &mut result, log);

        log.info("Classified all folders");
        log.info("Starting file level classification..");
        self.classify_files_by_extension(work_dir, &mut result);

        log.info("Collecting other files..");
        self.collect_other_files(work_dir, &mut result);
        self.fab_fallback(work_dir, &mut result, log);

        log.success(format!(
            "Classified {} files into {} categories",
            result.total(),
            Category::ALL.len()
        ));
        self.warn_field_drawings_in_fab(&result, log);

        result
    }

    fn collect_zeman_folders(&self, work_dir: &Path, result: &mut Classified) {
        for dir in sorted_dirs(work_dir) {
            let name = file_name(&dir);
            if !self.zeman.is_match(&name) {
                continue;
            }
            // Zeman exports are the machine-coded child folders, not the
            // parent itself.
            for child in sorted_dirs_shallow(&dir) {
                let child_name = file_name(&child);
                if self.zeman_child_numeric.is_match(&child_name)
                    || self.zeman_child_coded.is_match(&child_name)
                {
                    result.push(Category::Zeman, child);
                }
            }
        }
    }

    fn collect_originals(&self, work_dir: &Path, result: &mut Classified, log: &JobLog) {
        let entries = match std::fs::read_dir(work_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log.warning(format!("Could not list {}: {}", work_dir.display(), e));
                return;
            }
        };
        let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();
        for path in paths {
            result.push(Category::Original, path);
        }
    }

    fn classify_folders(&self, work_dir: &Path, result: &mut Classified, log: &JobLog) {
        for folder in sorted_dirs(work_dir) {
            if self.is_ignored_folder(work_dir, &folder) {
                continue;
            }
            if self.is_root_transmittal_folder(work_dir, &folder) {
                log.info(format!(
                    "Skipping root transmittal folder: {}",
                    folder.display()
                ));
                continue;
            }
            let zeman_overlap = result
                .paths(Category::Zeman)
                .iter()
                .any(|z| folder.starts_with(z) || z.starts_with(&folder));
            if zeman_overlap {
                continue;
            }

            log.info(format!("Classifying {}", folder.display()));
            let name = file_name(&folder);

            if let Some(category) = self.folder_category(&name) {
                let skip_duplicates = matches!(category, Category::Fab);
                for pdf in pdfs_beneath(&folder) {
                    if skip_duplicates && self.is_duplicate_render(&pdf) {
                        continue;
                    }
                    result.push(category, pdf);
                }
            }
        }
    }

    /// First matching folder rule wins. Rule order mirrors the precedence
    /// of the folder names seen in real transmittals.
    fn folder_category(&self, name: &str) -> Option<Category> {
        let lower = name.to_lowercase();
        let fab_eligible = !lower.contains("part");

        if fab_eligible && self.fab_dwgs.is_match(name) {
            return Some(Category::Fab);
        }
        if fab_eligible && self.fab_folder.is_match(name) {
            return Some(Category::Fab);
        }
        if self.parts.is_match(name) {
            return Some(Category::Parts);
        }
        if self.erection.is_match(name) || self.erection_overlay.is_match(name) {
            return Some(Category::Erection);
        }
        if self.field.is_match(name) {
            return Some(Category::Field);
        }
        if self.void.is_match(name) {
            return Some(Category::Void);
        }
        None
    }

    fn classify_files_by_extension(&self, work_dir: &Path, result: &mut Classified) {
        for file in sorted_files(work_dir) {
            if result.in_zeman(&file) {
                continue;
            }

            let ext = extension(&file);
            let category = match ext.as_str() {
                "xml" | "kss" => Some(Category::Import),
                "dxf" => Some(Category::Dxf),
                "nc1" => Some(Category::Nc1),
                "ifc" | "trb" | "dwg" => Some(Category::Model),
                "zip" => Some(Category::Zips),
                "enc" => Some(Category::Enc),
                _ => None,
            };
            if let Some(category) = category {
                result.push(category, file);
                continue;
            }

            // Transmittal lists and cover letters land in the misc folder.
            let name = file_name(&file);
            if self.list_cover.is_match(&name) || self.is_drawing_code(&name) {
                result.push(Category::Other, file);
            }
        }
    }

    /// Structured drawing codes like `ABC-D12-EF34-01`, excluding field
    /// work prefixes.
    fn is_drawing_code(&self, name: &str) -> bool {
        self.drawing_code
            .captures_iter(name)
            .any(|caps| !caps[1].eq_ignore_ascii_case("fw"))
    }

    fn collect_other_files(&self, work_dir: &Path, result: &mut Classified) {
        let classified: HashSet<PathBuf> = result.all_paths().cloned().collect();

        for file in sorted_files(work_dir) {
            if classified.contains(&file) {
                continue;
            }
            if OTHER_EXCLUSIONS.contains(&extension(&file).as_str()) {
                continue;
            }
            if result.in_zeman(&file) {
                continue;
            }

            let parent_name = file
                .parent()
                .map(|p| file_name(p).to_lowercase())
                .unwrap_or_default();
            // PDFs under catch-all render folders duplicate drawings
            // already claimed elsewhere.
            if parent_name == "drawings" && extension(&file) == "pdf" {
                continue;
            }
            if parent_name == "pdf parts" || parent_name == "pdf assemblies" {
                continue;
            }
            if self.is_ignored_folder(work_dir, &file) {
                continue;
            }

            // Stray .nc files outside Zeman exports signal a naming problem
            // upstream.
            if extension(&file) == "nc" && !self.zeman.is_match(&parent_name) {
                result.push(Category::NcIssue, file);
                continue;
            }

            result.push(Category::Other, file);
        }
    }

    /// When no folder matched the fab rules, fall back to the duplicate
    /// render folder the detailing software always emits.
    fn fab_fallback(&self, work_dir: &Path, result: &mut Classified, log: &JobLog) {
        if !result.is_empty(Category::Fab) {
            return;
        }
        log.info("No fab/shop drawings found; checking PDF Assemblies as fallback...");

        for folder in sorted_dirs(work_dir) {
            if !file_name(&folder).eq_ignore_ascii_case("pdf assemblies") {
                continue;
            }
            if result.in_zeman(&folder) {
                continue;
            }
            for pdf in pdfs_beneath(&folder) {
                if result.in_zeman(&pdf) {
                    continue;
                }
                result.push(Category::Fab, pdf);
            }
        }

        log.info(format!(
            "Added {} drawings from PDF Assemblies to fab category (fallback).",
            result.count(Category::Fab)
        ));
    }

    fn warn_field_drawings_in_fab(&self, result: &Classified, log: &JobLog) {
        let suspects: Vec<&PathBuf> = result
            .paths(Category::Fab)
            .iter()
            .filter(|p| file_name(p).to_lowercase().contains("fw"))
            .collect();
        if suspects.is_empty() {
            return;
        }
        log.warning(format!(
            "Found {} drawings with FW in the fab folder. Please inspect:",
            suspects.len()
        ));
        for path in suspects {
            log.warning(format!("  - {}", file_name(path)));
        }
    }

    /// Fab rules skip PDFs that live under duplicate render folders.
    fn is_duplicate_render(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().to_lowercase();
        DUPLICATE_RENDER_TOKENS.iter().any(|t| path_str.contains(t))
    }

    /// True when any component between the work root and the path is a
    /// generic container folder.
    fn is_ignored_folder(&self, work_dir: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(work_dir).unwrap_or(path);
        relative.components().any(|c| {
            let name = c.as_os_str().to_string_lossy().to_lowercase();
            CONTAINER_FOLDERS.contains(&name.as_str())
        })
    }

    /// Detects top-level folders that are just the transmittal's own
    /// container from the zip extraction, not category content.
    fn is_root_transmittal_folder(&self, work_dir: &Path, folder: &Path) -> bool {
        if folder.parent() != Some(work_dir) {
            return false;
        }

        let name = file_name(folder).to_lowercase();

        if name.contains("transmittal") {
            return true;
        }
        if self.tr_token.is_match(&name) {
            return true;
        }
        if name.contains("seq.") || name.contains("sequence") {
            return true;
        }
        if self.issue_code.is_match(&name) {
            return true;
        }
        if self.job_prefix.is_match(&name) && self.date_token.is_match(&name) {
            return true;
        }
        if self.company_prefix.is_match(&name) {
            return true;
        }

        let segment_count = name.matches(['_', '-']).count();
        if segment_count >= 3 {
            return true;
        }

        let has_category_keyword = ROOT_CATEGORY_KEYWORDS.iter().any(|kw| name.contains(kw));
        if has_category_keyword {
            let has_simple_indicator = SIMPLE_CONTENT_INDICATORS
                .iter()
                .any(|word| name.contains(word));
            if segment_count <= 1 && has_simple_indicator {
                return false;
            }
            if segment_count <= 1 && !self.four_digits.is_match(&name) {
                return false;
            }
            return true;
        }

        false
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn sorted_dirs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

fn sorted_dirs_shallow(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

fn sorted_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| {
            if let Err(ref err) = e {
                debug!("skipping unreadable entry: {}", err);
            }
            e.ok()
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn pdfs_beneath(folder: &Path) -> Vec<PathBuf> {
    sorted_files(folder)
        .into_iter()
        .filter(|f| extension(f) == "pdf")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn classify(root: &Path) -> Classified {
        FileClassifier::new().classify(root, &JobLog::new())
    }

    #[test]
    fn test_fab_folder_claims_pdfs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("Fab Drawings/B101.pdf"));
        touch(&root.join("Fab Drawings/B102.pdf"));

        let result = classify(root);
        assert_eq!(result.count(Category::Fab), 2);
    }

    #[test]
    fn test_part_folder_never_matches_fab() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("Fab Part Drawings/p1.pdf"));

        let result = classify(root);
        assert_eq!(result.count(Category::Fab), 0);
        assert_eq!(result.count(Category::Parts), 1);
    }

    #[test]
    fn test_erection_and_field_folders() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("E-Sheets/E1.pdf"));
        touch(&root.join("Field Work/FW1.pdf"));
        touch(&root.join("E-Plans/EP1.pdf"));

        let result = classify(root);
        assert_eq!(result.count(Category::Erection), 2);
        assert_eq!(result.count(Category::Field), 1);
    }

    #[test]
    fn test_extension_routing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("data/import.xml"));
        touch(&root.join("data/beam.nc1"));
        touch(&root.join("data/plate.dxf"));
        touch(&root.join("data/model.ifc"));
        touch(&root.join("data/nested.zip"));
        touch(&root.join("data/stairs.enc"));

        let result = classify(root);
        assert_eq!(result.count(Category::Import), 1);
        assert_eq!(result.count(Category::Nc1), 1);
        assert_eq!(result.count(Category::Dxf), 1);
        assert_eq!(result.count(Category::Model), 1);
        assert_eq!(result.count(Category::Zips), 1);
        assert_eq!(result.count(Category::Enc), 1);
    }

    #[test]
    fn test_zeman_children_are_disjoint() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("Zeman Files/101/run.nc"));
        touch(&root.join("Zeman Files/AB12/part.nc1"));
        touch(&root.join("Zeman Files/readme.txt"));

        let result = classify(root);
        assert_eq!(result.count(Category::Zeman), 2);
        // Files inside zeman exports stay out of every other category.
        assert_eq!(result.count(Category::Nc1), 0);
        assert_eq!(result.count(Category::NcIssue), 0);
        for category in Category::ALL {
            if matches!(category, Category::Zeman | Category::Original) {
                continue;
            }
            for path in result.paths(category) {
                assert!(!result.in_zeman(path), "{:?} leaked into {:?}", path, category);
            }
        }
    }

    #[test]
    fn test_stray_nc_outside_zeman_flagged() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("loose/run.nc"));

        let result = classify(root);
        assert_eq!(result.count(Category::NcIssue), 1);
    }

    #[test]
    fn test_root_transmittal_container_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        // Container carries an issue code, so its own name never claims
        // the drawings; the nested category folder does.
        touch(&root.join("6516_IFF_T077/Fab Drawings/B1.pdf"));

        let result = classify(root);
        assert_eq!(result.count(Category::Fab), 1);
    }

    #[test]
    fn test_simple_content_folder_not_a_container() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("Fab 11x17/B1.pdf"));

        let result = classify(root);
        assert_eq!(result.count(Category::Fab), 1);
    }

    #[test]
    fn test_fab_fallback_to_pdf_assemblies() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("job/PDF Assemblies/B1.pdf"));
        touch(&root.join("job/PDF Assemblies/B2.pdf"));

        let result = classify(root);
        assert_eq!(result.count(Category::Fab), 2);
    }

    #[test]
    fn test_pdf_assemblies_skipped_when_fab_exists() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("Shop Drawings/B1.pdf"));
        touch(&root.join("job/PDF Assemblies/B1.pdf"));

        let result = classify(root);
        assert_eq!(result.count(Category::Fab), 1);
    }

    #[test]
    fn test_transmittal_list_goes_to_other() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("docs/Transmittal List T77.pdf"));

        let result = classify(root);
        assert!(result
            .paths(Category::Other)
            .iter()
            .any(|p| file_name(p).contains("Transmittal")));
    }

    #[test]
    fn test_drawing_code_fw_prefix_excluded() {
        let classifier = FileClassifier::new();
        assert!(classifier.is_drawing_code("ABC-D12-EF34-01.pdf"));
        assert!(!classifier.is_drawing_code("FW-D12-EF34-01.pdf"));
    }

    #[test]
    fn test_db_files_never_collected() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("misc/Thumbs.db"));

        let result = classify(root);
        assert_eq!(result.count(Category::Other), 0);
    }

    #[test]
    fn test_originals_are_top_level_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("Fab Drawings/B1.pdf"));
        touch(&root.join("readme.txt"));

        let result = classify(root);
        assert_eq!(result.count(Category::Original), 2);
    }
}
