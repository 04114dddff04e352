use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use regex::Regex;

use crate::classify::{Category, Classified};
use crate::detect::DeliveryType;
use crate::error::PdfError;
use crate::joblog::JobLog;
use crate::naming::natural_cmp;

/// Categories merged into the cover sheet, in reading order.
const COVER_ORDER: [Category; 4] = [
    Category::Erection,
    Category::Field,
    Category::Fab,
    Category::Void,
];

/// Builds the merged cover-sheet PDF for a transmittal and runs the fab
/// folder suffix-merge check.
pub struct CoverSheetAssembler {
    job_number: String,
    transmittal_number: String,
    delivery_type: DeliveryType,
    fab_suffix: Regex,
}

impl CoverSheetAssembler {
    pub fn new(
        job_number: impl Into<String>,
        transmittal_number: impl Into<String>,
        delivery_type: DeliveryType,
    ) -> Self {
        Self {
            job_number: job_number.into(),
            transmittal_number: transmittal_number.into(),
            delivery_type,
            fab_suffix: Regex::new(r" - (\d+)\.pdf$").expect("static regex"),
        }
    }

    /// Filename the cover sheet is written under.
    pub fn output_name(&self) -> String {
        if self.delivery_type == DeliveryType::Ifa {
            format!("{} - {} IFA.pdf", self.job_number, self.transmittal_number)
        } else {
            format!("{} - {}.pdf", self.job_number, self.transmittal_number)
        }
    }

    /// Merges every drawing PDF into one cover sheet under `output_dir`.
    ///
    /// Drawings keep category order (erection, field, fab, void) and are
    /// naturally sorted within each category. Each source file's first
    /// page gets a page label carrying the file stem. Returns `None` when
    /// there are no drawings to merge.
    pub fn assemble(
        &self,
        classified: &Classified,
        output_dir: &Path,
        log: &JobLog,
    ) -> Result<Option<PathBuf>, PdfError> {
        let mut sources = Vec::new();
        for category in COVER_ORDER {
            let mut files: Vec<PathBuf> = classified
                .paths(category)
                .iter()
                .filter(|p| {
                    p.extension()
                        .map(|e| e.eq_ignore_ascii_case("pdf"))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            files.sort_by(|a, b| natural_cmp(&stem_of(a), &stem_of(b)));
            sources.extend(files);
        }

        if sources.is_empty() {
            log.info("No drawings to merge into a cover sheet");
            return Ok(None);
        }

        let mut documents = Vec::new();
        for path in &sources {
            match Document::load(path) {
                Ok(doc) => documents.push((stem_of(path), doc)),
                Err(e) => log.error(format!("Error merging {}: {}", path.display(), e)),
            }
        }
        if documents.is_empty() {
            return Err(PdfError::EmptyMerge);
        }

        let output_path = output_dir.join(self.output_name());
        let mut merged = merge_documents(documents)?;
        merged
            .save(&output_path)
            .map_err(|e| PdfError::Save {
                path: output_path.clone(),
                message: e.to_string(),
            })?;

        log.success(format!("Cover sheet created: {}", output_path.display()));
        Ok(Some(output_path))
    }

    /// Merges fabrication drawings split by the detailing software into
    /// ` - 1.pdf` / ` - 2.pdf` continuation files back into their base
    /// file. The continuation file is deleted once the merge lands.
    pub fn final_fab_check(&self, fab_dir: &Path, log: &JobLog) {
        let mut pdfs: BTreeMap<String, PathBuf> = BTreeMap::new();
        let entries = match std::fs::read_dir(fab_dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file()
                && path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
            {
                pdfs.insert(name_of(&path), path);
            }
        }

        for (name, path) in pdfs.clone() {
            let Some(caps) = self.fab_suffix.captures(&name) else {
                continue;
            };
            let suffix: u32 = match caps[1].parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if !(1..=9).contains(&suffix) {
                continue;
            }

            let base_name = self.fab_suffix.replace(&name, ".pdf").into_owned();
            let Some(base_path) = pdfs.get(&base_name) else {
                continue;
            };
            if !base_path.exists() {
                continue;
            }

            match self.merge_pair(base_path, &path) {
                Ok(()) => {
                    if let Err(e) = std::fs::remove_file(&path) {
                        log.error(format!("Error merging {}: {}", name, e));
                        continue;
                    }
                    log.success(format!(
                        "Merged {} + {}\nMerged to: {}",
                        base_name,
                        name,
                        base_path.display()
                    ));
                    log.set_status("Merged PDFs");
                }
                Err(e) => {
                    log.error(format!("Error merging {}: {}", name, e));
                    log.set_status("Error merging PDFs");
                }
            }
        }
    }

    fn merge_pair(&self, base: &Path, continuation: &Path) -> Result<(), PdfError> {
        let load = |path: &Path| {
            Document::load(path).map_err(|e| PdfError::Load {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        };
        let documents = vec![
            (stem_of(base), load(base)?),
            (stem_of(continuation), load(continuation)?),
        ];

        let mut merged = merge_documents(documents)?;
        merged.save(base).map_err(|e| PdfError::Save {
            path: base.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

/// Merges documents into one, labelling the first page contributed by
/// each source with its name.
fn merge_documents(inputs: Vec<(String, Document)>) -> Result<Document, PdfError> {
    let mut max_id = 1;
    let mut page_count = 0u32;
    let mut labels: Vec<(u32, String)> = Vec::new();
    let mut all_pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut all_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (label, mut doc) in inputs {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages = doc.get_pages();
        labels.push((page_count, label));
        page_count += pages.len() as u32;

        for (_, object_id) in pages {
            if let Ok(object) = doc.get_object(object_id) {
                all_pages.push((object_id, object.to_owned()));
            }
        }
        all_objects.append(&mut doc.objects);
    }

    if all_pages.is_empty() {
        return Err(PdfError::EmptyMerge);
    }

    // Find one Pages root and one Catalog to carry over; drop the rest.
    let mut pages_object: Option<(ObjectId, Dictionary)> = None;
    let mut catalog_object: Option<(ObjectId, Dictionary)> = None;
    let mut document = Document::with_version("1.5");

    for (object_id, object) in all_objects {
        match object.type_name().unwrap_or(b"") {
            b"Catalog" => {
                if catalog_object.is_none() {
                    if let Ok(dict) = object.as_dict() {
                        catalog_object = Some((object_id, dict.clone()));
                    }
                }
            }
            b"Pages" => {
                if let Ok(dict) = object.as_dict() {
                    if let Some((_, existing)) = pages_object.as_mut() {
                        existing.extend(dict);
                    } else {
                        pages_object = Some((object_id, dict.clone()));
                    }
                }
            }
            b"Page" | b"Outlines" | b"Outline" => {}
            _ => {
                document.objects.insert(object_id, object);
            }
        }
    }

    let (pages_id, mut pages_dict) =
        pages_object.ok_or(PdfError::EmptyMerge)?;
    let (catalog_id, mut catalog_dict) =
        catalog_object.ok_or(PdfError::EmptyMerge)?;

    for (object_id, object) in &all_pages {
        if let Ok(dict) = object.as_dict() {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            document
                .objects
                .insert(*object_id, Object::Dictionary(dict));
        }
    }

    pages_dict.set("Count", all_pages.len() as i64);
    pages_dict.set(
        "Kids",
        all_pages
            .iter()
            .map(|(id, _)| Object::Reference(*id))
            .collect::<Vec<_>>(),
    );
    document
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    let mut nums: Vec<Object> = Vec::with_capacity(labels.len() * 2);
    for (start, label) in labels {
        nums.push((start as i64).into());
        nums.push(Object::Dictionary(dictionary! {
            "P" => Object::string_literal(label),
        }));
    }

    catalog_dict.set("Pages", pages_id);
    catalog_dict.set("PageLabels", dictionary! { "Nums" => nums });
    catalog_dict.remove(b"Outlines");
    document
        .objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));

    document.trailer.set("Root", catalog_id);
    document.max_id = document.objects.len() as u32;
    document.renumber_objects();
    document.compress();

    Ok(document)
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
