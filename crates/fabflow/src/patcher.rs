//! Rewrites directory references inside import XML files so the downstream
//! import software reads from the built output tree instead of the layout
//! the detailing office exported against.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::joblog::JobLog;

const CNC_DIR_OLD: &str = "<CNCDirectory>\\CNC</CNCDirectory>";
const CNC_DIR_NEW: &str = "<CNCDirectory>\\CNC Data\\NC-DXF Combined</CNCDirectory>";
const DRAWING_DIR_OLD: &str = "<DrawingDirectory>\\Drawings</DrawingDirectory>";
const DRAWING_DIR_NEW: &str = "<DrawingDirectory>\\Drawings\\Fabrication</DrawingDirectory>";

/// Patches `CNCDirectory` and `DrawingDirectory` elements in every XML file
/// under the import directory.
#[derive(Debug, Default)]
pub struct XmlPatcher;

impl XmlPatcher {
    pub fn new() -> Self {
        Self
    }

    /// Patch all XML files directly under `import_dir`. Failures on a single
    /// file are logged and do not stop the rest.
    pub fn patch_import_dir(&self, import_dir: &Path, log: &JobLog) -> usize {
        if !import_dir.is_dir() {
            log.info("No import directory to patch");
            return 0;
        }

        let mut patched = 0;
        for entry in WalkDir::new(import_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let is_xml = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("xml"))
                .unwrap_or(false);
            if !is_xml {
                continue;
            }
            if self.patch_file(path, log) {
                patched += 1;
            }
        }
        patched
    }

    /// Returns true if the file was rewritten.
    pub fn patch_file(&self, xml_file: &Path, log: &JobLog) -> bool {
        let name = xml_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let text = match fs::read_to_string(xml_file) {
            Ok(text) => text,
            Err(err) => {
                log.error(format!(
                    "Error patching XML {}: {}",
                    xml_file.display(),
                    err
                ));
                return false;
            }
        };

        let replaced = text
            .replace(CNC_DIR_OLD, CNC_DIR_NEW)
            .replace(DRAWING_DIR_OLD, DRAWING_DIR_NEW);

        if replaced == text {
            log.info(format!("No directory references to patch in {}", name));
            return false;
        }

        match fs::write(xml_file, replaced) {
            Ok(()) => {
                log.success(format!("Patched XML: {}", name));
                true
            }
            Err(err) => {
                log.error(format!(
                    "Error patching XML {}: {}",
                    xml_file.display(),
                    err
                ));
                false
            }
        }
    }
}
