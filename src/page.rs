use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::controls::{ControlTree, Group};
use crate::resolver::{self, PathLayout};
use crate::selection::{ParticleSubset, Selection};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("page template is missing the {{{{{0}}}}} anchor")]
    MissingAnchor(&'static str),

    #[error("page controller is already initialized")]
    AlreadyInitialized,

    #[error("page controller is not initialized")]
    NotInitialized,

    #[error("no control {key:?} in the {} group", group.name())]
    UnknownControl { group: Group, key: String },
}

/// Where the controls and the image layout come from.
#[derive(Clone, Debug)]
pub enum Profile {
    /// Hardcoded branches and components, `images/` prefix, snapshot `0123`.
    Static,
    /// Controls generated from a loaded configuration.
    Dynamic(Arc<Configuration>),
}

impl Profile {
    pub fn name(&self) -> &'static str {
        match self {
            Profile::Static => "static",
            Profile::Dynamic(_) => "dynamic",
        }
    }

    pub fn layout(&self) -> PathLayout {
        match self {
            Profile::Static => PathLayout::fixed(),
            Profile::Dynamic(config) => PathLayout::for_snapshot(config.snap_nr),
        }
    }

    fn controls(&self) -> ControlTree {
        match self {
            Profile::Static => ControlTree::fixed(),
            Profile::Dynamic(config) => ControlTree::build(config),
        }
    }
}

/// An input change reported by the host page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Raw text of the numeric halo-index input.
    HaloIndex(String),
    /// A radio control was checked, identified by id or value.
    Check { group: Group, key: String },
    /// Every radio in the group was cleared.
    Clear(Group),
}

/// Owns the page's control state and the displayed image source.
#[derive(Debug)]
pub struct PageController {
    profile: Profile,
    layout: PathLayout,
    controls: ControlTree,
    selection: Selection,
    image_source: String,
    initialized: bool,
}

impl PageController {
    pub fn new(profile: Profile) -> Self {
        let layout = profile.layout();
        PageController {
            profile,
            layout,
            controls: ControlTree::markup(),
            selection: Selection::default(),
            image_source: String::new(),
            initialized: false,
        }
    }

    /// Builds the controls, derives the initial selection and computes the first image source.
    pub fn initialize(&mut self) -> Result<(), PageError> {
        if self.initialized {
            return Err(PageError::AlreadyInitialized);
        }
        self.controls = self.profile.controls();
        self.selection = self.controls.selection();
        self.initialized = true;
        self.recompute();
        debug!(
            profile = self.profile.name(),
            branches = self.controls.branches.len(),
            components = self.controls.components.len(),
            "page initialized"
        );
        Ok(())
    }

    pub fn handle(&mut self, event: InputEvent) -> Result<(), PageError> {
        if !self.initialized {
            return Err(PageError::NotInitialized);
        }
        match event {
            InputEvent::HaloIndex(raw) => match raw.trim().parse::<u32>() {
                Ok(value) => {
                    let value = self.controls.index.clamp(value);
                    self.controls.index.value = value;
                    self.selection.halo_index = value;
                }
                Err(_) => warn!(input = %raw, "ignoring non-numeric halo index"),
            },
            InputEvent::Check { group, key } => {
                let control = self
                    .controls
                    .group_mut(group)
                    .check(&key)
                    .ok_or_else(|| PageError::UnknownControl {
                        group,
                        key: key.clone(),
                    })?;
                let value = control.value.clone();
                match group {
                    Group::Particles => self.selection.particles = ParticleSubset::from_query(&value),
                    Group::Branch => self.selection.branch = Some(value),
                    Group::Component => self.selection.component = Some(value),
                }
            }
            InputEvent::Clear(group) => {
                self.controls.group_mut(group).uncheck_all();
                match group {
                    Group::Particles => self.selection.particles = None,
                    Group::Branch => self.selection.branch = None,
                    Group::Component => self.selection.component = None,
                }
            }
        }
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.image_source = resolver::display_source(&self.layout, &self.selection);
        debug!(
            src = %self.image_source,
            complete = self.selection.is_complete(),
            "image source updated"
        );
    }

    pub fn controls(&self) -> &ControlTree {
        &self.controls
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Empty when the selection is incomplete.
    pub fn image_source(&self) -> &str {
        &self.image_source
    }
}
