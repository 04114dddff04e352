use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FabflowError {
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Scan error: {0}")]
    Scan(#[from] crate::scan::ScanError),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Not a valid archive '{path}': {source}")]
    InvalidArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to read archive '{path}': {source}")]
    ReadArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Expected an archive file, got a directory: {0}")]
    IsDirectory(PathBuf),

    #[error("Failed to create working directory '{path}': {source}")]
    CreateWorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to unpack archive into '{path}': {source}")]
    Unpack {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to load PDF '{path}': {message}")]
    Load { path: PathBuf, message: String },

    #[error("Failed to save merged PDF '{path}': {message}")]
    Save { path: PathBuf, message: String },

    #[error("Merge produced no pages")]
    EmptyMerge,
}

pub type Result<T> = std::result::Result<T, FabflowError>;
