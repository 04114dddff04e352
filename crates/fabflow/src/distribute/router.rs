use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::detect::DeliveryType;
use crate::joblog::JobLog;

use super::{DistributionPlan, DistributionReport, Route};

/// Copies a built transmittal tree onto the network destinations in a plan.
pub struct Distributor {
    plan: DistributionPlan,
    built_root: PathBuf,
    delivery_type: DeliveryType,
}

impl Distributor {
    pub fn new(plan: DistributionPlan, built_root: &Path, delivery_type: DeliveryType) -> Self {
        Self {
            plan,
            built_root: built_root.to_path_buf(),
            delivery_type,
        }
    }

    /// Copy every allowed category to its destination. Per-file failures are
    /// logged and skipped so one unreadable file cannot stall the rest of the
    /// distribution.
    pub fn distribute(&self, log: &JobLog) -> DistributionReport {
        if self.delivery_type == DeliveryType::Ifa {
            log.info("IFA transmittal detected - distributing ONLY erection drawings");
        } else {
            log.info(format!(
                "{} transmittal detected - full distribution enabled",
                self.delivery_type
            ));
        }

        let mut report = DistributionReport::default();
        let mut seen_nc: BTreeSet<String> = BTreeSet::new();
        let mut seen_dxf: BTreeSet<String> = BTreeSet::new();

        for route in Route::ALL {
            if !self.is_allowed(route) {
                log.info(format!(
                    "Skipping {} distribution for {} transmittal",
                    route.key(),
                    self.delivery_type
                ));
                continue;
            }

            if route == Route::Zeman {
                self.distribute_zeman(&mut report, log);
                continue;
            }

            let source = route.source_dir(&self.built_root);
            let files = scan_files(&source);
            if files.is_empty() {
                continue;
            }

            let dest = self.plan.dest(route);
            if let Err(err) = fs::create_dir_all(&dest) {
                log.error(format!(
                    "Error creating destination '{}': {}",
                    dest.display(),
                    err
                ));
                continue;
            }

            let distributed = report.distributed.entry(route.key().to_string()).or_default();
            for file in files {
                distributed.push(file.clone());
                track_stem(route, &file, &mut seen_nc, &mut seen_dxf);

                let target = dest.join(file.file_name().unwrap_or_default());
                if let Err(err) = fs::copy(&file, &target) {
                    log.error(format!("Error copying {}: {}", file.display(), err));
                }
            }
        }

        for (category, files) in &report.distributed {
            let count = match category.as_str() {
                "nc1" => seen_nc.len(),
                "dxf" => seen_dxf.len(),
                "nc_dxf" => seen_nc.len() + seen_dxf.len(),
                _ => files.len(),
            };
            report.counts.insert(category.clone(), count);
        }
        report
    }

    fn is_allowed(&self, route: Route) -> bool {
        match self.delivery_type {
            DeliveryType::Ifa => route == Route::Erection,
            _ => true,
        }
    }

    /// Zeman folders move as whole directories, not loose files.
    fn distribute_zeman(&self, report: &mut DistributionReport, log: &JobLog) {
        let source = Route::Zeman.source_dir(&self.built_root);
        let folders = scan_dirs(&source);
        if folders.is_empty() {
            return;
        }

        let dest = self.plan.dest(Route::Zeman);
        if let Err(err) = fs::create_dir_all(&dest) {
            log.error(format!(
                "Error creating destination '{}': {}",
                dest.display(),
                err
            ));
            return;
        }

        for folder in folders {
            let name = folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            log.success(format!(
                "Copying Zeman folder {} to {}",
                name,
                dest.display()
            ));
            match copy_dir(&folder, &dest.join(&name)) {
                Ok(()) => {
                    report
                        .distributed
                        .entry(Route::Zeman.key().to_string())
                        .or_default()
                        .push(folder);
                }
                Err(err) => {
                    log.error(format!(
                        "Error copying Zeman folder {}: {}",
                        folder.display(),
                        err
                    ));
                }
            }
        }
    }
}

fn track_stem(route: Route, file: &Path, seen_nc: &mut BTreeSet<String>, seen_dxf: &mut BTreeSet<String>) {
    let ext = file
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if matches!(route, Route::Nc1 | Route::NcDxf) && ext == "nc1" {
        seen_nc.insert(stem.clone());
    }
    if matches!(route, Route::Dxf | Route::NcDxf) && ext == "dxf" {
        seen_dxf.insert(stem);
    }
}

fn scan_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn scan_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default();
    dirs.sort();
    dirs
}

fn copy_dir(src: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn build_source(root: &Path) {
        for (dir, files) in [
            ("Drawings/Fabrication Drawings", vec!["f100.pdf", "f101.pdf"]),
            ("Drawings/Erection Drawings", vec!["E1.pdf"]),
            ("CNC Data/NC1", vec!["p1.nc1", "p2.nc1"]),
            ("CNC Data/DXF", vec!["p1.dxf"]),
            ("CNC Data/NC-DXF Combined", vec!["p1.nc1", "p2.nc1", "p1.dxf"]),
        ] {
            let path = root.join(dir);
            fs::create_dir_all(&path).unwrap();
            for file in files {
                fs::write(path.join(file), b"data").unwrap();
            }
        }
        let zeman = root.join("Zeman Folders/101a");
        fs::create_dir_all(&zeman).unwrap();
        fs::write(zeman.join("101a.xml"), b"<z/>").unwrap();
    }

    fn plan_under(root: &Path) -> DistributionPlan {
        DistributionPlan {
            sd_dest: root.join("sd/6516"),
            nc_dest: root.join("nc/6516"),
            enc_dest: root.join("nc/6516/ENC"),
            zeman_dest: root.join("nc/6516 - Zeman"),
        }
    }

    #[test]
    fn test_full_distribution_for_iff() {
        let tmp = TempDir::new().unwrap();
        let built = tmp.path().join("built");
        build_source(&built);

        let plan = plan_under(tmp.path());
        let log = JobLog::new();
        let report = Distributor::new(plan.clone(), &built, DeliveryType::Iff).distribute(&log);

        assert!(plan.sd_dest.join("Drawings/Fabrication/f100.pdf").exists());
        assert!(plan.sd_dest.join("Drawings/ESheets/E1.pdf").exists());
        assert!(plan.nc_dest.join("p1.nc1").exists());
        assert!(plan.zeman_dest.join("101a/101a.xml").exists());

        assert_eq!(report.counts["fab"], 2);
        assert_eq!(report.counts["erection"], 1);
        assert_eq!(report.counts["zeman"], 1);
    }

    #[test]
    fn test_distinct_stem_counts() {
        let tmp = TempDir::new().unwrap();
        let built = tmp.path().join("built");
        build_source(&built);

        let log = JobLog::new();
        let report =
            Distributor::new(plan_under(tmp.path()), &built, DeliveryType::Iff).distribute(&log);

        assert_eq!(report.counts["nc1"], 2);
        assert_eq!(report.counts["dxf"], 1);
        assert_eq!(report.counts["nc_dxf"], 3);
    }

    #[test]
    fn test_ifa_distributes_erection_only() {
        let tmp = TempDir::new().unwrap();
        let built = tmp.path().join("built");
        build_source(&built);

        let plan = plan_under(tmp.path());
        let log = JobLog::new();
        let report = Distributor::new(plan.clone(), &built, DeliveryType::Ifa).distribute(&log);

        assert!(plan.sd_dest.join("Drawings/ESheets/E1.pdf").exists());
        assert!(!plan.sd_dest.join("Drawings/Fabrication").exists());
        assert!(!plan.nc_dest.exists());
        assert!(!plan.zeman_dest.exists());
        assert_eq!(report.counts.len(), 1);
        assert!(report.counts.contains_key("erection"));
    }

    #[test]
    fn test_empty_categories_create_nothing() {
        let tmp = TempDir::new().unwrap();
        let built = tmp.path().join("built");
        fs::create_dir_all(&built).unwrap();

        let plan = plan_under(tmp.path());
        let log = JobLog::new();
        let report = Distributor::new(plan.clone(), &built, DeliveryType::Iff).distribute(&log);

        assert!(report.counts.is_empty());
        assert!(!plan.sd_dest.exists());
        assert!(!plan.nc_dest.exists());
    }
}
