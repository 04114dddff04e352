//! Transmittal processing for steel fabrication drawings.
//!
//! Takes the ZIP archives a detailing office sends out, works out which job
//! and transmittal they belong to, sorts every file into the shop's folder
//! conventions, assembles a cover-sheet PDF, and optionally distributes the
//! result onto the shared network volumes.

pub mod archive;
pub mod classify;
pub mod coversheet;
pub mod detect;
pub mod distribute;
pub mod error;
pub mod joblog;
pub mod layout;
pub mod naming;
pub mod patcher;
pub mod pipeline;
pub mod scan;

pub use archive::{ArchiveExtractor, WorkDir};
pub use classify::{Category, Classified, FileClassifier};
pub use coversheet::CoverSheetAssembler;
pub use detect::{
    Attachment, Confidence, DeliveryType, DetectedMetadata, EmailAnalysis, EmailTriage,
    MetadataDetector,
};
pub use distribute::{DistributionPlan, DistributionReport, Distributor};
pub use error::{BuildError, ExtractError, FabflowError, PdfError, Result};
pub use joblog::{JobLog, LogLevel, LogSummary};
pub use layout::{LayoutBuilder, OutputLayout};
pub use patcher::XmlPatcher;
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineOptions, PipelineReport};
pub use scan::{DownloadScanner, ScanReport};
