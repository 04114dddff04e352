use std::path::PathBuf;

use thiserror::Error;

use crate::error::{BuildError, ExtractError, PdfError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("ZIP file not found: {0}")]
    ArchiveNotFound(PathBuf),

    #[error("Input file must be a ZIP archive: {0}")]
    NotAnArchive(PathBuf),

    #[error(
        "Job number could not be detected from ZIP filename or contents. \
         Please provide a job number."
    )]
    MissingJobNumber,

    #[error("Failed to create output directory '{path}': {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Pdf(#[from] PdfError),
}
