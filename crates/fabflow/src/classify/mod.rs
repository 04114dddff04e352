//! File classification: sorting an extracted transmittal into the
//! categories the output layout and distribution stages operate on.

mod classifier;

pub use classifier::FileClassifier;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Categories a transmittal's contents are sorted into.
///
/// `Zeman` entries are directories (copied wholesale); `Original` entries
/// are the direct children of the extraction root; everything else is a
/// file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Fab,
    Erection,
    Field,
    Parts,
    Nc1,
    Dxf,
    Enc,
    Zeman,
    Void,
    Import,
    Model,
    NcIssue,
    Other,
    Zips,
    Original,
}

impl Category {
    pub const ALL: [Category; 15] = [
        Category::Fab,
        Category::Erection,
        Category::Field,
        Category::Parts,
        Category::Nc1,
        Category::Dxf,
        Category::Enc,
        Category::Zeman,
        Category::Void,
        Category::Import,
        Category::Model,
        Category::NcIssue,
        Category::Other,
        Category::Zips,
        Category::Original,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::Fab => "fab",
            Category::Erection => "erection",
            Category::Field => "field",
            Category::Parts => "parts",
            Category::Nc1 => "nc1",
            Category::Dxf => "dxf",
            Category::Enc => "enc",
            Category::Zeman => "zeman",
            Category::Void => "void",
            Category::Import => "import",
            Category::Model => "model",
            Category::NcIssue => "nc_issue",
            Category::Other => "other",
            Category::Zips => "zips",
            Category::Original => "original",
        }
    }
}

/// Result of a classification pass over an extracted transmittal.
#[derive(Debug, Default)]
pub struct Classified {
    buckets: BTreeMap<Category, Vec<PathBuf>>,
}

impl Classified {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a path, skipping duplicates within the same category.
    pub fn push(&mut self, category: Category, path: PathBuf) {
        let bucket = self.buckets.entry(category).or_default();
        if !bucket.contains(&path) {
            bucket.push(path);
        }
    }

    pub fn paths(&self, category: Category) -> &[PathBuf] {
        self.buckets
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, category: Category) -> usize {
        self.paths(category).len()
    }

    pub fn is_empty(&self, category: Category) -> bool {
        self.count(category) == 0
    }

    pub fn contains(&self, category: Category, path: &Path) -> bool {
        self.paths(category).iter().any(|p| p == path)
    }

    /// True when the path sits inside (or is) one of the zeman directories.
    pub fn in_zeman(&self, path: &Path) -> bool {
        self.paths(Category::Zeman)
            .iter()
            .any(|z| path.starts_with(z))
    }

    /// Every classified path, across all categories.
    pub fn all_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.buckets.values().flatten()
    }

    pub fn total(&self) -> usize {
        self.buckets.values().map(|v| v.len()).sum()
    }

    /// Per-category counts keyed by the category's snake_case name.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        Category::ALL
            .iter()
            .map(|c| (c.key().to_string(), self.count(*c)))
            .collect()
    }
}
