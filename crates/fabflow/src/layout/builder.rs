use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

use super::OutputLayout;
use crate::classify::{Category, Classified};
use crate::error::BuildError;
use crate::joblog::JobLog;
use crate::naming::NameRules;

/// Copies classified files into the output layout.
///
/// Directory creation failures abort the build; individual file copies are
/// logged and skipped so one unreadable drawing never sinks a whole
/// transmittal.
pub struct LayoutBuilder<'a> {
    layout: &'a OutputLayout,
    rules: NameRules,
}

impl<'a> LayoutBuilder<'a> {
    pub fn new(layout: &'a OutputLayout) -> Self {
        Self {
            layout,
            rules: NameRules::new(),
        }
    }

    pub fn build(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        create_dir(self.layout.base())?;

        self.copy_originals(classified, log)?;
        self.copy_revisions(classified, log)?;
        self.copy_drawings(classified, log)?;
        self.copy_data_files(classified, log)?;
        self.copy_stray_nc_files(classified, log)?;
        self.copy_import_files(classified, log)?;
        self.copy_zeman_folders(classified, log)?;
        self.copy_model_files(classified, log)?;
        self.copy_other_files(classified, log)?;

        log.success("Folder structure built successfully");
        log.set_status("Folder structure built successfully");
        log.success(format!(
            "Files:\n    NC: {}\n    DXF: {}\n    Fabrication: {}\n    Erection: {}\n    Field Work: {}\n    Parts: {}\n    Zeman Folders: {}\n    Other: {}",
            classified.count(Category::Nc1),
            classified.count(Category::Dxf),
            classified.count(Category::Fab),
            classified.count(Category::Erection),
            classified.count(Category::Field),
            classified.count(Category::Parts),
            classified.count(Category::Zeman),
            classified.count(Category::Other),
        ));
        Ok(())
    }

    /// Snapshot of the extraction root. Zips found here are copied and
    /// additionally unpacked flat into the originals folder.
    fn copy_originals(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        let originals = existing(classified.paths(Category::Original));
        if originals.is_empty() {
            return Ok(());
        }

        let original_dir = self.layout.category_dir(Category::Original);
        create_dir(&original_dir)?;

        for src in originals {
            let dest = original_dir.join(name_of(&src));
            if src.is_dir() {
                safe_copy_dir(&src, &dest, log);
                continue;
            }

            safe_copy(&src, &dest, log);
            if extension(&src) == "zip" {
                match unpack_flat(&src, &original_dir) {
                    Ok(()) => log.success(format!("Extracted nested zip: {}", src.display())),
                    Err(e) => log.error(format!(
                        "Error extracting nested zip: {}: {}",
                        src.display(),
                        e
                    )),
                }
            }
        }

        log.success("Copied all original files");
        log.set_status("Original Files Backup - Complete");
        Ok(())
    }

    /// Unmodified PDF copies of every drawing, bucketed by category.
    fn copy_revisions(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        let revision_dir = self.layout.revisions_dir();
        create_dir(&revision_dir)?;

        for category in OutputLayout::drawing_categories() {
            let files = existing(classified.paths(category));
            if files.is_empty() {
                continue;
            }

            let subdir = OutputLayout::revision_subdir(category).unwrap_or(category.key());
            let target_dir = revision_dir.join(subdir);
            create_dir(&target_dir)?;

            for src in &files {
                if extension(src) != "pdf" {
                    continue;
                }
                safe_copy(src, &target_dir.join(name_of(src)), log);
            }
            log.success(format!(
                "Copied {} {} drawings to {}",
                files.len(),
                category.key(),
                target_dir.display()
            ));
        }

        log.success("Copied all revisions");
        log.set_status("Revisions Backup - Complete");
        Ok(())
    }

    /// Working copies with revision markers stripped. Erection and field
    /// drawings are additionally grouped into revision buckets.
    fn copy_drawings(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        for category in OutputLayout::drawing_categories() {
            let files = existing(classified.paths(category));
            if files.is_empty() {
                log.info(format!("No files to copy for {}", category.key()));
                continue;
            }

            let category_dir = self.layout.category_dir(category);
            for src in &files {
                if extension(src) != "pdf" {
                    continue;
                }
                create_dir(&category_dir)?;

                let mut target_dir = category_dir.clone();
                let bucket_prefix = match category {
                    Category::Erection => Some("E"),
                    Category::Field => Some("F"),
                    _ => None,
                };
                if let Some(prefix) = bucket_prefix {
                    let bucket = self.rules.revision_bucket(&name_of(src), prefix);
                    target_dir = target_dir.join(bucket);
                    create_dir(&target_dir)?;
                }

                let clean_name = self.rules.strip_revision(&name_of(src));
                let dest = target_dir.join(clean_name);
                if dest.exists() {
                    log.warning("Skipping: File already exists");
                }
                safe_copy(src, &dest, log);
            }

            log.success(format!(
                "Copied {} {} drawings to {}",
                files.len(),
                category.key(),
                category_dir.display()
            ));
        }
        Ok(())
    }

    /// NC1 and DXF files land in their own folders and are mirrored into
    /// the combined folder the import software reads.
    fn copy_data_files(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        let nc_files = existing(classified.paths(Category::Nc1));
        let dxf_files = existing(classified.paths(Category::Dxf));
        let enc_files = existing(classified.paths(Category::Enc));

        if nc_files.is_empty() && dxf_files.is_empty() && enc_files.is_empty() {
            log.info("No Data files to copy");
            return Ok(());
        }

        if !nc_files.is_empty() {
            let nc_dir = self.layout.category_dir(Category::Nc1);
            let combined_dir = self.layout.combined_cnc_dir();
            create_dir(&nc_dir)?;
            create_dir(&combined_dir)?;
            for src in &nc_files {
                safe_copy(src, &nc_dir.join(name_of(src)), log);
                safe_copy(src, &combined_dir.join(name_of(src)), log);
            }
        }

        if !dxf_files.is_empty() {
            let dxf_dir = self.layout.category_dir(Category::Dxf);
            let combined_dir = self.layout.combined_cnc_dir();
            create_dir(&dxf_dir)?;
            create_dir(&combined_dir)?;
            for src in &dxf_files {
                safe_copy(src, &dxf_dir.join(name_of(src)), log);
                safe_copy(src, &combined_dir.join(name_of(src)), log);
            }
        }

        if !enc_files.is_empty() {
            let enc_dir = self.layout.category_dir(Category::Enc);
            create_dir(&enc_dir)?;
            for src in &enc_files {
                safe_copy(src, &enc_dir.join(name_of(src)), log);
            }
            log.success(format!(
                "Copied {} ENC files to \\CNC Data folder",
                enc_files.len()
            ));
        } else {
            log.info("No ENC files to copy");
        }

        match (nc_files.len(), dxf_files.len()) {
            (0, 0) => {}
            (nc, 0) => log.success(format!("Copied {} NC1 to \\CNC Data folder", nc)),
            (0, dxf) => log.success(format!("Copied {} DXF to \\CNC Data folder", dxf)),
            (nc, dxf) => log.success(format!(
                "Copied {} NC1 and {} DXF to \\CNC Data folder",
                nc, dxf
            )),
        }
        Ok(())
    }

    fn copy_stray_nc_files(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        let files = existing(classified.paths(Category::NcIssue));
        if files.is_empty() {
            return Ok(());
        }

        let dir = self.layout.category_dir(Category::NcIssue);
        create_dir(&dir)?;
        for src in &files {
            safe_copy(src, &dir.join(name_of(src)), log);
        }
        log.success(format!(
            "Copied {} NC Error files to /CNC Data - NC files found outside of zeman folders",
            files.len()
        ));
        log.set_status("NC Error files copied successfully - Please see log for details");
        Ok(())
    }

    fn copy_import_files(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        let files = existing(classified.paths(Category::Import));
        if files.is_empty() {
            log.error("No import files to copy");
            return Ok(());
        }

        let dir = self.layout.category_dir(Category::Import);
        create_dir(&dir)?;
        for src in &files {
            safe_copy(src, &dir.join(name_of(src)), log);
        }
        log.success("Copied all import files");
        log.set_status("All import files copied successfully");
        Ok(())
    }

    /// Zeman export directories are copied wholesale. A stale destination
    /// from an earlier run is removed first so the copy is exact.
    fn copy_zeman_folders(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        let folders = existing(classified.paths(Category::Zeman));
        if folders.is_empty() {
            log.info("No Zeman reports to copy");
            return Ok(());
        }

        let zeman_dir = self.layout.category_dir(Category::Zeman);
        create_dir(&zeman_dir)?;

        let mut copied = 0;
        for folder in &folders {
            let dest = zeman_dir.join(name_of(folder));
            if dest.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dest) {
                    log.error(format!(
                        "Error copying Zeman folder {}: {}",
                        folder.display(),
                        e
                    ));
                    continue;
                }
            }
            safe_copy_dir(folder, &dest, log);
            copied += 1;
        }

        log.success(format!("Copied {} Zeman folders", copied));
        log.set_status(format!("Copied {} Zeman folders", copied));
        Ok(())
    }

    fn copy_model_files(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        let files = existing(classified.paths(Category::Model));
        if files.is_empty() {
            return Ok(());
        }

        let dir = self.layout.category_dir(Category::Model);
        create_dir(&dir)?;
        for src in &files {
            safe_copy(src, &dir.join(name_of(src)), log);
        }
        log.success(format!("Copied {} model files", files.len()));
        log.set_status("Copied model files");
        Ok(())
    }

    /// Lists, covers and leftovers. XSR exports get their own subfolder,
    /// nested zips a folder of their own.
    fn copy_other_files(&self, classified: &Classified, log: &JobLog) -> Result<(), BuildError> {
        let files = existing(classified.paths(Category::Other));
        if files.is_empty() {
            log.info("No Other/List files to copy");
        } else {
            let other_dir = self.layout.category_dir(Category::Other);
            create_dir(&other_dir)?;

            for src in &files {
                if extension(src) == "xsr" {
                    let xsr_dir = other_dir.join("XSR Files");
                    create_dir(&xsr_dir)?;
                    safe_copy(src, &xsr_dir.join(name_of(src)), log);
                    continue;
                }
                safe_copy(src, &other_dir.join(name_of(src)), log);
            }
            log.success(format!("Copied {} List/Other files", files.len()));
        }

        let zips = existing(classified.paths(Category::Zips));
        if !zips.is_empty() {
            let zip_dir = self.layout.category_dir(Category::Zips);
            create_dir(&zip_dir)?;
            for src in &zips {
                safe_copy(src, &zip_dir.join(name_of(src)), log);
            }
            log.success(format!(
                "Copied {} zip files to /Lists & Misc",
                zips.len()
            ));
        }
        Ok(())
    }
}

/// Drops classified paths that disappeared between classification and
/// the copy pass.
fn existing(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths.iter().filter(|p| p.exists()).cloned().collect()
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn create_dir(path: &Path) -> Result<(), BuildError> {
    std::fs::create_dir_all(path).map_err(|source| BuildError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

fn safe_copy(src: &Path, dest: &Path, log: &JobLog) {
    if !src.is_file() {
        return;
    }
    if let Err(e) = std::fs::copy(src, dest) {
        log.error(format!("Error copying file {}: {}", src.display(), e));
    }
}

fn safe_copy_dir(src: &Path, dest: &Path, log: &JobLog) {
    if !src.is_dir() || dest.starts_with(src) {
        return;
    }
    for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        let relative = match entry.path().strip_prefix(src) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            if let Err(e) = std::fs::create_dir_all(&target) {
                log.error(format!("Error copying folder {}: {}", src.display(), e));
                return;
            }
        } else if let Err(e) = std::fs::copy(entry.path(), &target) {
            log.error(format!(
                "Error copying file {}: {}",
                entry.path().display(),
                e
            ));
        }
    }
}

fn unpack_flat(zip_path: &Path, dest: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)?;
    archive.extract(dest)?;
    debug!("unpacked {} into {}", zip_path.display(), dest.display());
    Ok(())
}
