use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info_span;

use crate::archive::{ArchiveExtractor, WorkDir};
use crate::classify::{Category, FileClassifier};
use crate::coversheet::CoverSheetAssembler;
use crate::detect::{DeliveryType, MetadataDetector};
use crate::distribute::{DistributionPlan, Distributor};
use crate::joblog::JobLog;
use crate::layout::{LayoutBuilder, OutputLayout};
use crate::patcher::XmlPatcher;

use super::{PipelineConfig, PipelineError, PipelineOptions, PipelineReport};

/// Runs a transmittal archive through extraction, detection, classification,
/// output building, cover sheet assembly, finalization and distribution.
pub struct Pipeline {
    config: PipelineConfig,
}

struct Outcome {
    job_number: String,
    transmittal_number: String,
    delivery_type: DeliveryType,
    output_folder: PathBuf,
    file_counts: BTreeMap<String, usize>,
    distribution: BTreeMap<String, usize>,
    log_file: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Process one archive end to end. Never panics and never returns an
    /// `Err`; failures come back as a report with `success: false` and a
    /// summarized log.
    pub fn run(&self, options: &PipelineOptions) -> PipelineReport {
        let span = info_span!("pipeline", archive = %options.archive_path.display());
        let _guard = span.enter();

        let log = JobLog::new();
        let mut work: Option<WorkDir> = None;

        match self.run_inner(options, &log, &mut work) {
            Ok(outcome) => {
                log.success("Transmittal processing complete!");
                log.set_status("Processing completed successfully");
                PipelineReport {
                    success: true,
                    job_number: Some(outcome.job_number),
                    transmittal_number: Some(outcome.transmittal_number),
                    delivery_type: outcome.delivery_type,
                    output_folder: Some(outcome.output_folder),
                    file_counts: outcome.file_counts,
                    distribution: outcome.distribution,
                    log_file: outcome.log_file,
                    logs: log.success_summary(),
                    status: log.status(),
                    error: None,
                }
            }
            Err(err) => {
                log.error(format!("Pipeline failed: {}", err));
                log.set_status(format!("Processing failed: {}", err));
                if let Some(work_dir) = work.take() {
                    work_dir.cleanup(&log);
                }
                PipelineReport {
                    success: false,
                    job_number: options.job_number.clone(),
                    transmittal_number: None,
                    delivery_type: DeliveryType::Unknown,
                    output_folder: None,
                    file_counts: BTreeMap::new(),
                    distribution: BTreeMap::new(),
                    log_file: None,
                    logs: log.failure_summary(),
                    status: log.status(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn run_inner(
        &self,
        options: &PipelineOptions,
        log: &JobLog,
        work: &mut Option<WorkDir>,
    ) -> Result<Outcome, PipelineError> {
        log.info("Starting transmittal processing pipeline");

        let archive_path = &options.archive_path;
        if !archive_path.is_file() {
            return Err(PipelineError::ArchiveNotFound(archive_path.clone()));
        }
        let is_zip = archive_path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if !is_zip {
            return Err(PipelineError::NotAnArchive(archive_path.clone()));
        }

        let output_root = match &options.output_root {
            Some(root) => {
                log.info(format!("Using provided output path: {}", root.display()));
                root.clone()
            }
            None => {
                log.info(format!(
                    "No output path provided, using default: {}",
                    self.config.output_root.display()
                ));
                self.config.output_root.clone()
            }
        };
        fs::create_dir_all(&output_root).map_err(|source| PipelineError::CreateOutputDir {
            path: output_root.clone(),
            source,
        })?;
        log.info(format!("Output directory ready: {}", output_root.display()));

        log.info("Step 1: Extracting ZIP");
        log.set_status("Extracting");
        let extractor = ArchiveExtractor::new(archive_path.clone());
        let work_dir = extractor.extract(log)?;
        let work_path = work_dir.path().to_path_buf();
        *work = Some(work_dir);

        log.info("Step 2: Detecting transmittal metadata");
        log.set_status("Detecting metadata");
        let detected = MetadataDetector::new().detect(archive_path, log);

        let job_number = match &options.job_number {
            Some(provided) => {
                log.info(format!("Using provided job number: {}", provided));
                provided.clone()
            }
            None => detected
                .job_number
                .clone()
                .ok_or(PipelineError::MissingJobNumber)?,
        };
        let transmittal_number = match &detected.transmittal_number {
            Some(number) => number.clone(),
            None => {
                log.warning("Transmittal number could not be detected. Using 'UNKNOWN'.");
                "UNKNOWN".to_string()
            }
        };
        let delivery_type = detected.delivery_type;

        log.info("Step 3: Classifying files");
        log.set_status("Classifying");
        let classified = FileClassifier::new().classify(&work_path, log);

        log.info("Step 4: Building output folder structure");
        log.set_status("Building output");
        let layout = OutputLayout::new(
            &output_root,
            Some(&job_number),
            &transmittal_number,
            delivery_type,
            Local::now().date_naive(),
        );
        LayoutBuilder::new(&layout).build(&classified, log)?;

        log.info("Step 5: Creating cover sheet PDF");
        log.set_status("Creating cover sheet");
        let assembler =
            CoverSheetAssembler::new(&job_number, &transmittal_number, delivery_type);
        if assembler.assemble(&classified, layout.base(), log)?.is_some() {
            log.success("Created Cover Sheet");
        }

        log.info("Step 6: Finalizing output");
        log.set_status("Finalizing");
        self.finalize(&assembler, &layout, log);

        let distribution = if options.distribute && self.config.distribution_enabled {
            log.info("Step 7: Distributing files to destinations");
            log.set_status("Distributing");
            self.distribute(&job_number, delivery_type, layout.base(), log)
        } else if options.distribute {
            log.info("Distribution disabled via config");
            BTreeMap::new()
        } else {
            log.info("Skipping file distribution (user request)");
            BTreeMap::new()
        };

        log.info("Step 8: Cleaning up temporary files");
        if let Some(work_dir) = work.take() {
            work_dir.cleanup(log);
        }

        let log_file = self.persist_log(layout.base(), log);

        Ok(Outcome {
            job_number,
            transmittal_number,
            delivery_type,
            output_folder: layout.base().to_path_buf(),
            file_counts: classified.counts(),
            distribution,
            log_file,
        })
    }

    /// Merge split fabrication drawings and patch import XML references.
    fn finalize(&self, assembler: &CoverSheetAssembler, layout: &OutputLayout, log: &JobLog) {
        let fab_dir = layout.category_dir(Category::Fab);
        if fab_dir.is_dir() {
            log.info("Running final fabrication drawing check..");
            assembler.final_fab_check(&fab_dir, log);
        }

        let import_dir = layout.category_dir(Category::Import);
        if import_dir.is_dir() {
            let patched = XmlPatcher::new().patch_import_dir(&import_dir, log);
            log.success(format!("XML patching complete ({} files patched)", patched));
        } else {
            log.info("No 'Import Files' folder - skipping XML patching");
        }

        log.success("Output Finalized..");
    }

    fn distribute(
        &self,
        job_number: &str,
        delivery_type: DeliveryType,
        built_root: &Path,
        log: &JobLog,
    ) -> BTreeMap<String, usize> {
        let plan = DistributionPlan::discover(
            &self.config.sd_root,
            &self.config.nc_root,
            job_number,
            log,
        );
        let report = Distributor::new(plan, built_root, delivery_type).distribute(log);
        log.success(format!("Distribution complete: {:?}", report.counts));
        report.counts
    }

    /// Full log entries can run long for a large transmittal, so the raw log
    /// is written next to the output instead of being returned whole.
    fn persist_log(&self, output_folder: &Path, log: &JobLog) -> Option<PathBuf> {
        let log_path = output_folder.join("processing_log.json");
        let payload = match serde_json::to_string_pretty(&log.to_json()) {
            Ok(payload) => payload,
            Err(err) => {
                log.warning(format!("Could not save log file: {}", err));
                return None;
            }
        };
        match fs::write(&log_path, payload) {
            Ok(()) => {
                log.info(format!("Detailed logs saved to: {}", log_path.display()));
                Some(log_path)
            }
            Err(err) => {
                log.warning(format!("Could not save log file: {}", err));
                None
            }
        }
    }
}
