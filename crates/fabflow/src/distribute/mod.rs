//! Distribution of a built transmittal to the shared network volumes.
//!
//! Destination roots are discovered by matching the job number against
//! existing folder names. Discovery is read-only; a proposed default
//! destination is only created once there is something to write into it.

mod router;

pub use router::Distributor;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::joblog::JobLog;

/// One routed category of distributed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Route {
    Fab,
    Erection,
    Field,
    Parts,
    Void,
    Nc1,
    Dxf,
    NcDxf,
    Enc,
    Zeman,
}

impl Route {
    pub const ALL: [Route; 10] = [
        Route::Fab,
        Route::Erection,
        Route::Field,
        Route::Parts,
        Route::Void,
        Route::Nc1,
        Route::Dxf,
        Route::NcDxf,
        Route::Enc,
        Route::Zeman,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Route::Fab => "fab",
            Route::Erection => "erection",
            Route::Field => "field",
            Route::Parts => "parts",
            Route::Void => "void",
            Route::Nc1 => "nc1",
            Route::Dxf => "dxf",
            Route::NcDxf => "nc_dxf",
            Route::Enc => "enc",
            Route::Zeman => "zeman",
        }
    }

    /// Where this category's files live inside the built output tree.
    pub fn source_dir(self, built_root: &Path) -> PathBuf {
        let relative = match self {
            Route::Fab => "Drawings/Fabrication Drawings",
            Route::Erection => "Drawings/Erection Drawings",
            Route::Field => "Drawings/Field Work",
            Route::Parts => "Drawings/Part Drawings",
            Route::Void => "Drawings/Void Drawings",
            Route::Nc1 => "CNC Data/NC1",
            Route::Dxf => "CNC Data/DXF",
            Route::NcDxf => "CNC Data/NC-DXF Combined",
            Route::Enc => "CNC Data/ENC",
            Route::Zeman => "Zeman Folders",
        };
        built_root.join(relative)
    }
}

/// Resolved network destinations for one job.
#[derive(Debug, Clone)]
pub struct DistributionPlan {
    pub sd_dest: PathBuf,
    pub nc_dest: PathBuf,
    pub enc_dest: PathBuf,
    pub zeman_dest: PathBuf,
}

impl DistributionPlan {
    /// Match the job number against existing folders on the shop drawings and
    /// NC volumes. Nothing is created here; unmatched destinations come back
    /// as proposed defaults.
    pub fn discover(sd_root: &Path, nc_root: &Path, job_number: &str, log: &JobLog) -> Self {
        log.info(format!(
            "Searching for SD folder for job {}...",
            job_number
        ));
        let sd_dest = find_job_folder(sd_root, job_number, None)
            .unwrap_or_else(|| sd_root.join(job_number));

        log.info(format!(
            "Searching for NC folder for job {}...",
            job_number
        ));
        let nc_dest = find_job_folder(nc_root, job_number, None)
            .unwrap_or_else(|| nc_root.join(job_number));

        log.info(format!(
            "Searching for ENC folder for job {}...",
            job_number
        ));
        let enc_dest = discover_enc_dest(&nc_dest, job_number);

        log.info(format!(
            "Searching for Zeman folder for job {}...",
            job_number
        ));
        let zeman_dest = find_job_folder(nc_root, job_number, Some("zeman"))
            .unwrap_or_else(|| nc_root.join(format!("{} - Zeman", job_number)));

        Self {
            sd_dest,
            nc_dest,
            enc_dest,
            zeman_dest,
        }
    }

    /// Network destination for a route.
    pub fn dest(&self, route: Route) -> PathBuf {
        match route {
            Route::Fab => self.sd_dest.join("Drawings/Fabrication"),
            Route::Erection => self.sd_dest.join("Drawings/ESheets"),
            Route::Field => self.sd_dest.join("Drawings/Field Work"),
            Route::Parts => self.sd_dest.join("Drawings/Parts"),
            Route::Void => self.sd_dest.join("Drawings/Void"),
            Route::Nc1 | Route::Dxf | Route::NcDxf => self.nc_dest.clone(),
            Route::Enc => self.enc_dest.clone(),
            Route::Zeman => self.zeman_dest.clone(),
        }
    }
}

/// First existing child directory whose name contains the job number,
/// case-insensitively, and the extra keyword when one is required.
fn find_job_folder(root: &Path, job_number: &str, keyword: Option<&str>) -> Option<PathBuf> {
    let job_lower = job_number.to_lowercase();
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    dirs.into_iter().find(|dir| {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        name.contains(&job_lower) && keyword.map(|k| name.contains(k)).unwrap_or(true)
    })
}

/// The ENC destination lives inside the job's NC folder. A folder naming the
/// job plus a stairs/rails/enc marker wins over a plain "enc" folder.
fn discover_enc_dest(nc_job_dir: &Path, job_number: &str) -> PathBuf {
    let job_lower = job_number.to_lowercase();

    let mut dirs: Vec<PathBuf> = fs::read_dir(nc_job_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default();
    dirs.sort();

    let named = dirs.iter().find(|dir| {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        name.contains(&job_lower)
            && (name.contains("stairs") || name.contains("rails") || name.contains("enc"))
    });
    if let Some(dir) = named {
        return dir.clone();
    }

    let plain = dirs.iter().find(|dir| {
        dir.file_name()
            .map(|n| n.to_string_lossy().to_lowercase().contains("enc"))
            .unwrap_or(false)
    });
    if let Some(dir) = plain {
        return dir.clone();
    }

    nc_job_dir.join("ENC")
}

/// Outcome of a distribution pass.
#[derive(Debug, Default, Serialize)]
pub struct DistributionReport {
    /// Per-category counts. NC1 and DXF count distinct part stems rather than
    /// raw files so the combined mirror does not double the totals.
    pub counts: BTreeMap<String, usize>,
    /// Per-category list of distributed source paths.
    pub distributed: BTreeMap<String, Vec<PathBuf>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discovery_matches_existing_folders() {
        let tmp = TempDir::new().unwrap();
        let sd = tmp.path().join("sd");
        let nc = tmp.path().join("nc");
        fs::create_dir_all(sd.join("6516 - Riverside Tower")).unwrap();
        fs::create_dir_all(nc.join("6516 Steel")).unwrap();
        fs::create_dir_all(nc.join("6516 Steel/6516 Stairs and Rails")).unwrap();
        fs::create_dir_all(nc.join("6516 - Zeman Import")).unwrap();

        let log = JobLog::new();
        let plan = DistributionPlan::discover(&sd, &nc, "6516", &log);

        assert_eq!(plan.sd_dest, sd.join("6516 - Riverside Tower"));
        assert_eq!(plan.nc_dest, nc.join("6516 Steel"));
        assert_eq!(plan.enc_dest, nc.join("6516 Steel/6516 Stairs and Rails"));
        assert_eq!(plan.zeman_dest, nc.join("6516 - Zeman Import"));
    }

    #[test]
    fn test_discovery_proposes_defaults_without_creating() {
        let tmp = TempDir::new().unwrap();
        let sd = tmp.path().join("sd");
        let nc = tmp.path().join("nc");
        fs::create_dir_all(&sd).unwrap();
        fs::create_dir_all(&nc).unwrap();

        let log = JobLog::new();
        let plan = DistributionPlan::discover(&sd, &nc, "7001", &log);

        assert_eq!(plan.sd_dest, sd.join("7001"));
        assert_eq!(plan.nc_dest, nc.join("7001"));
        assert_eq!(plan.enc_dest, nc.join("7001/ENC"));
        assert_eq!(plan.zeman_dest, nc.join("7001 - Zeman"));
        assert!(!plan.sd_dest.exists());
        assert!(!plan.nc_dest.exists());
    }

    #[test]
    fn test_enc_falls_back_to_plain_enc_folder() {
        let tmp = TempDir::new().unwrap();
        let nc_job = tmp.path().join("6516");
        fs::create_dir_all(nc_job.join("ENC Files")).unwrap();

        assert_eq!(
            discover_enc_dest(&nc_job, "6516"),
            nc_job.join("ENC Files")
        );
    }

    #[test]
    fn test_route_destinations() {
        let plan = DistributionPlan {
            sd_dest: PathBuf::from("/sd/6516"),
            nc_dest: PathBuf::from("/nc/6516"),
            enc_dest: PathBuf::from("/nc/6516/ENC"),
            zeman_dest: PathBuf::from("/nc/6516 - Zeman"),
        };
        assert_eq!(
            plan.dest(Route::Erection),
            PathBuf::from("/sd/6516/Drawings/ESheets")
        );
        assert_eq!(plan.dest(Route::Nc1), PathBuf::from("/nc/6516"));
        assert_eq!(plan.dest(Route::NcDxf), PathBuf::from("/nc/6516"));
        assert_eq!(plan.dest(Route::Zeman), PathBuf::from("/nc/6516 - Zeman"));
    }
}
