//! Shared helpers for fabflow integration tests: building transmittal
//! archives and minimal PDF fixtures.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use lopdf::{dictionary, Document, Object};
use zip::write::SimpleFileOptions;

/// A valid single-page PDF, enough for load/merge round trips.
pub fn minimal_pdf_bytes() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Builds a transmittal ZIP entry by entry.
pub struct TransmittalBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl TransmittalBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn file(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.entries.push((name.to_string(), data.into()));
        self
    }

    pub fn pdf(self, name: &str) -> Self {
        let bytes = minimal_pdf_bytes();
        self.file(name, bytes)
    }

    pub fn write_to(self, path: &Path) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, data) in self.entries {
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&data).unwrap();
        }
        writer.finish().unwrap();
    }
}
