//! End-to-end orchestration of transmittal processing.
//!
//! A [`Pipeline`] owns the configuration and runs one archive at a time:
//! extract, detect metadata, classify, build the output tree, assemble the
//! cover sheet, finalize, optionally distribute, and clean up. The outcome
//! is always a [`PipelineReport`]; errors are folded into it rather than
//! bubbled to the caller.

mod config;
mod error;
mod report;
mod runner;

pub use config::{PipelineConfig, MAX_TRANSMITTAL_SIZE};
pub use error::PipelineError;
pub use report::PipelineReport;
pub use runner::Pipeline;

use std::path::PathBuf;

/// Per-run inputs for [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// The transmittal archive to process.
    pub archive_path: PathBuf,
    /// Overrides the configured output root when set.
    pub output_root: Option<PathBuf>,
    /// Overrides (or supplies, when detection fails) the job number.
    pub job_number: Option<String>,
    /// Distribute to network destinations after building. Also requires
    /// distribution to be enabled in the configuration.
    pub distribute: bool,
}

impl PipelineOptions {
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            output_root: None,
            job_number: None,
            distribute: true,
        }
    }
}
