/// Which structural subset of a halo's particles an image shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleSubset {
    Fof,
    Central,
    Satellites,
}

impl ParticleSubset {
    pub const ALL: [ParticleSubset; 3] = [
        ParticleSubset::Fof,
        ParticleSubset::Central,
        ParticleSubset::Satellites,
    ];

    /// Id of the radio control on the page.
    pub fn control_id(self) -> &'static str {
        match self {
            ParticleSubset::Fof => "fof",
            ParticleSubset::Central => "central",
            ParticleSubset::Satellites => "satellite",
        }
    }

    /// Token used in image filenames.
    pub fn file_token(self) -> &'static str {
        match self {
            ParticleSubset::Fof => "fof",
            ParticleSubset::Central => "central",
            ParticleSubset::Satellites => "satellites",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ParticleSubset::Fof => "FoF group",
            ParticleSubset::Central => "Central",
            ParticleSubset::Satellites => "Satellites",
        }
    }

    /// Accepts either the control id or the filename token.
    pub fn from_query(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "fof" => Some(ParticleSubset::Fof),
            "central" => Some(ParticleSubset::Central),
            "satellite" | "satellites" => Some(ParticleSubset::Satellites),
            _ => None,
        }
    }
}

/// Current value of every selector on the page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub halo_index: u32,
    pub particles: Option<ParticleSubset>,
    pub branch: Option<String>,
    pub component: Option<String>,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        self.particles.is_some() && self.branch.is_some() && self.component.is_some()
    }
}
