use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::detect::DeliveryType;
use crate::joblog::LogSummary;

/// Result of one pipeline run, shaped for callers that render or persist it.
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub success: bool,
    pub job_number: Option<String>,
    pub transmittal_number: Option<String>,
    pub delivery_type: DeliveryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<PathBuf>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub file_counts: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub distribution: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    pub logs: LogSummary,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
