use std::path::PathBuf;

/// Maximum transmittal archive size (1.5 GB). Larger archives are flagged
/// rather than rejected outright.
pub const MAX_TRANSMITTAL_SIZE: u64 = 1024 * 1024 * 1024 * 3 / 2;

/// Runtime settings for the processing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where built transmittal trees are written.
    pub output_root: PathBuf,
    /// Folder scanned for freshly downloaded archives.
    pub downloads_dir: PathBuf,
    /// Shop drawings volume, one folder per job.
    pub sd_root: PathBuf,
    /// CNC volume, one folder per job.
    pub nc_root: PathBuf,
    /// Distribution can be switched off globally while keeping the rest of
    /// the pipeline intact.
    pub distribution_enabled: bool,
    /// Archives above this size get a size warning.
    pub max_archive_size: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let downloads_dir = dirs::download_dir().unwrap_or_else(|| home.join("Downloads"));
        let desktop = dirs::desktop_dir().unwrap_or_else(|| home.join("Desktop"));

        Self {
            output_root: desktop.join("Fabflow").join("Output"),
            downloads_dir,
            sd_root: desktop.join("Shop Drawings").join("Jobs"),
            nc_root: desktop.join("NC Files"),
            distribution_enabled: false,
            max_archive_size: MAX_TRANSMITTAL_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(!config.distribution_enabled);
        assert_eq!(config.max_archive_size, 1_610_612_736);
        assert!(config.output_root.ends_with("Fabflow/Output"));
    }
}
