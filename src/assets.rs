use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::resolver::PathLayout;
use crate::selection::ParticleSubset;

/// Outcome of walking every image the page can ask for.
#[derive(Debug, Default)]
pub struct AssetReport {
    pub checked: usize,
    pub missing: Vec<PathBuf>,
    pub unreadable: Vec<(PathBuf, String)>,
}

impl AssetReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.unreadable.is_empty()
    }
}

/// Relative paths of every image reachable from the controls, branch-major.
pub fn expected_images(config: &Configuration, layout: &PathLayout) -> Vec<String> {
    let mut paths = Vec::new();
    for branch in config.branch_names() {
        for subset in ParticleSubset::ALL {
            for component in config.ptypes() {
                for index in 0..config.nr_halos {
                    paths.push(layout.image_path(branch, subset, component, index));
                }
            }
        }
    }
    paths
}

pub fn check_assets(root: &Path, config: &Configuration, layout: &PathLayout) -> AssetReport {
    let mut report = AssetReport::default();
    for rel in expected_images(config, layout) {
        let path = root.join(&rel);
        report.checked += 1;
        if !path.is_file() {
            debug!(path = %path.display(), "missing image");
            report.missing.push(path);
            continue;
        }
        if let Err(e) = image::image_dimensions(&path) {
            warn!(path = %path.display(), "undecodable image: {e}");
            report.unreadable.push((path, e.to_string()));
        }
    }
    report
}
