//! Output folder layout for a processed transmittal and the builder that
//! fills it from classified files.

mod builder;

pub use builder::LayoutBuilder;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::classify::Category;
use crate::detect::DeliveryType;

/// Job bucket used when no job number could be resolved.
pub const UNKNOWN_JOB_BUCKET: &str = "Unknown Job Number";

/// The dated output tree for one transmittal:
/// `{root}/{job}/{YYMMDD} - {T###}[ IFA]/...`
#[derive(Debug, Clone)]
pub struct OutputLayout {
    base: PathBuf,
}

impl OutputLayout {
    pub fn new(
        output_root: &Path,
        job_number: Option<&str>,
        transmittal_number: &str,
        delivery_type: DeliveryType,
        date: NaiveDate,
    ) -> Self {
        let job_bucket = job_number.unwrap_or(UNKNOWN_JOB_BUCKET);
        let mut folder_name = format!("{} - {}", date.format("%y%m%d"), transmittal_number);
        if delivery_type == DeliveryType::Ifa {
            folder_name.push_str(" IFA");
        }

        Self {
            base: output_root.join(job_bucket).join(folder_name),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Destination directory for a category's files.
    pub fn category_dir(&self, category: Category) -> PathBuf {
        let relative = match category {
            Category::Fab => "Drawings/Fabrication Drawings",
            Category::Erection => "Drawings/Erection Drawings",
            Category::Field => "Drawings/Field Work",
            Category::Parts => "Drawings/Part Drawings",
            Category::Void => "Drawings/Void Drawings",
            Category::Nc1 => "CNC Data/NC1",
            Category::NcIssue => "CNC Data/NC Error - See import log for details",
            Category::Dxf => "CNC Data/DXF",
            Category::Enc => "CNC Data/ENC",
            Category::Zeman => "Zeman Folders",
            Category::Model => "Model",
            Category::Import => "Import Files",
            Category::Zips => "Lists & Misc/Nested Zips",
            Category::Other => "Lists & Misc",
            Category::Original => "Original Files",
        };
        self.base.join(relative)
    }

    /// NC1 and DXF files are mirrored here for the import software.
    pub fn combined_cnc_dir(&self) -> PathBuf {
        self.base.join("CNC Data/NC-DXF Combined")
    }

    pub fn revisions_dir(&self) -> PathBuf {
        self.base.join("Revisions")
    }

    /// Subfolder under `Revisions/` for a drawing category.
    pub fn revision_subdir(category: Category) -> Option<&'static str> {
        match category {
            Category::Fab => Some("Fabrication"),
            Category::Erection => Some("Erection"),
            Category::Field => Some("Field"),
            Category::Parts => Some("Parts"),
            Category::Void => Some("Void"),
            _ => None,
        }
    }

    /// Categories that hold drawings and take part in revision backup and
    /// revision stripping.
    pub fn drawing_categories() -> [Category; 5] {
        [
            Category::Fab,
            Category::Erection,
            Category::Field,
            Category::Parts,
            Category::Void,
        ]
    }
}
