use crate::selection::{ParticleSubset, Selection};

pub const FIXED_PREFIX: &str = "images/";
pub const FIXED_SNAPSHOT: &str = "0123";

/// Prefix and snapshot tag shared by every image path of one page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathLayout {
    prefix: String,
    snapshot: String,
}

impl PathLayout {
    /// Hardcoded layout: `images/<branch>/..._0123_halo_<i>.png`.
    pub fn fixed() -> Self {
        PathLayout {
            prefix: FIXED_PREFIX.to_string(),
            snapshot: FIXED_SNAPSHOT.to_string(),
        }
    }

    /// Paths relative to the page with the snapshot number zero-padded to 4 digits.
    pub fn for_snapshot(snap_nr: u32) -> Self {
        PathLayout {
            prefix: String::new(),
            snapshot: format!("{snap_nr:04}"),
        }
    }

    pub fn image_path(
        &self,
        branch: &str,
        particles: ParticleSubset,
        component: &str,
        halo_index: u32,
    ) -> String {
        format!(
            "{}{}/{}_{}_{}_halo_{}.png",
            self.prefix,
            branch,
            particles.file_token(),
            component,
            self.snapshot,
            halo_index
        )
    }
}

/// `None` until particles, branch and component are all selected.
pub fn resolve(layout: &PathLayout, selection: &Selection) -> Option<String> {
    let particles = selection.particles?;
    let branch = selection.branch.as_deref()?;
    let component = selection.component.as_deref()?;
    Some(layout.image_path(branch, particles, component, selection.halo_index))
}

/// Value for the display element's source: the resolved path, or empty.
pub fn display_source(layout: &PathLayout, selection: &Selection) -> String {
    resolve(layout, selection).unwrap_or_default()
}
