//! Transmittal archive handling: validation, extraction into a temporary
//! working directory and recursive extraction of nested archives.

mod extractor;

pub use extractor::{ArchiveExtractor, WorkDir};
