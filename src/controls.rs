use crate::config::Configuration;
use crate::selection::{ParticleSubset, Selection};

/// Radio groups on the page. Each is single-choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Group {
    Particles,
    Branch,
    Component,
}

impl Group {
    /// Form field name, also used as the query parameter.
    pub fn name(self) -> &'static str {
        match self {
            Group::Particles => "particles",
            Group::Branch => "branch",
            Group::Component => "component",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RadioControl {
    pub id: String,
    pub value: String,
    pub label: String,
    pub checked: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RadioGroup {
    controls: Vec<RadioControl>,
}

impl RadioGroup {
    pub fn controls(&self) -> &[RadioControl] {
        &self.controls
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn checked(&self) -> Option<&RadioControl> {
        self.controls.iter().find(|c| c.checked)
    }

    fn clear(&mut self) {
        self.controls.clear();
    }

    // The first control pushed into an empty group starts checked.
    fn push(&mut self, id: &str, value: &str, label: &str) {
        let checked = self.controls.is_empty();
        self.controls.push(RadioControl {
            id: id.to_string(),
            value: value.to_string(),
            label: label.to_string(),
            checked,
        });
    }

    /// Checks the control whose value matches, or failing that whose id matches,
    /// and unchecks the rest. Leaves the group untouched when nothing matches.
    pub fn check(&mut self, key: &str) -> Option<&RadioControl> {
        let pos = self
            .controls
            .iter()
            .position(|c| c.value == key)
            .or_else(|| self.controls.iter().position(|c| c.id == key))?;
        for (i, control) in self.controls.iter_mut().enumerate() {
            control.checked = i == pos;
        }
        self.controls.get(pos)
    }

    pub fn uncheck_all(&mut self) {
        for control in &mut self.controls {
            control.checked = false;
        }
    }
}

/// Numeric halo-index input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexBounds {
    pub min: u32,
    pub max: Option<u32>,
    pub step: u32,
    pub value: u32,
}

impl IndexBounds {
    pub fn unbounded() -> Self {
        IndexBounds {
            min: 0,
            max: None,
            step: 1,
            value: 0,
        }
    }

    pub fn for_halo_count(nr_halos: u32) -> Self {
        IndexBounds {
            max: Some(nr_halos.saturating_sub(1)),
            ..Self::unbounded()
        }
    }

    pub fn clamp(&self, value: u32) -> u32 {
        let value = value.max(self.min);
        match self.max {
            Some(max) => value.min(max),
            None => value,
        }
    }
}

const FIXED_BRANCHES: [(&str, &str); 3] = [
    ("default", "default"),
    ("reassign", "reassign_gas_multi_fixed"),
    ("spatial", "reassign_gas_multi_fixed_spatial_nest"),
];

const FIXED_COMPONENTS: [(&str, &str); 2] = [("stars", "stars"), ("dm", "dark_matter")];

/// Every input control on the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlTree {
    pub particles: RadioGroup,
    pub branches: RadioGroup,
    pub components: RadioGroup,
    pub index: IndexBounds,
}

impl ControlTree {
    /// Only the controls present in the page markup: the index input and the particle radios.
    pub fn markup() -> Self {
        let mut particles = RadioGroup::default();
        for subset in ParticleSubset::ALL {
            particles.push(subset.control_id(), subset.control_id(), subset.label());
        }
        ControlTree {
            particles,
            branches: RadioGroup::default(),
            components: RadioGroup::default(),
            index: IndexBounds::unbounded(),
        }
    }

    /// Hardcoded page: branches and components are part of the markup too.
    pub fn fixed() -> Self {
        let mut tree = Self::markup();
        for (id, value) in FIXED_BRANCHES {
            tree.branches.push(id, value, value);
        }
        for (id, value) in FIXED_COMPONENTS {
            tree.components.push(id, value, value);
        }
        tree
    }

    pub fn build(config: &Configuration) -> Self {
        let mut tree = Self::markup();
        tree.populate(config);
        tree
    }

    /// Fills the generated groups from scratch and resets the index input.
    /// Running it again on the same tree yields the same controls.
    pub fn populate(&mut self, config: &Configuration) {
        self.branches.clear();
        for name in config.branch_names() {
            self.branches.push(&format!("branch-{name}"), name, name);
        }
        self.components.clear();
        for name in config.ptypes() {
            self.components.push(&format!("ptype-{name}"), name, name);
        }
        self.index = IndexBounds::for_halo_count(config.nr_halos);
    }

    pub fn group(&self, group: Group) -> &RadioGroup {
        match group {
            Group::Particles => &self.particles,
            Group::Branch => &self.branches,
            Group::Component => &self.components,
        }
    }

    pub fn group_mut(&mut self, group: Group) -> &mut RadioGroup {
        match group {
            Group::Particles => &mut self.particles,
            Group::Branch => &mut self.branches,
            Group::Component => &mut self.components,
        }
    }

    /// Reads the selection the controls currently express.
    pub fn selection(&self) -> Selection {
        Selection {
            halo_index: self.index.value,
            particles: self
                .particles
                .checked()
                .and_then(|c| ParticleSubset::from_query(&c.value)),
            branch: self.branches.checked().map(|c| c.value.clone()),
            component: self.components.checked().map(|c| c.value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Configuration {
        Configuration::from_json(
            r#"{"snap_nr":7,"nr_halos":3,"branches":{"default":{},"alt":{}},"ptypes":["stars","dark_matter"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn build_generates_one_radio_per_entry() {
        let tree = ControlTree::build(&sample());
        let branches: Vec<&str> = tree.branches.controls().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(branches, ["default", "alt"]);
        let components: Vec<&str> = tree.components.controls().iter().map(|c| c.value.as_str()).collect();
        assert_eq!(components, ["stars", "dark_matter"]);
        assert_eq!(tree.branches.checked().unwrap().value, "default");
        assert_eq!(tree.components.checked().unwrap().value, "stars");
    }

    #[test]
    fn index_bounds_follow_halo_count() {
        let tree = ControlTree::build(&sample());
        assert_eq!(
            tree.index,
            IndexBounds {
                min: 0,
                max: Some(2),
                step: 1,
                value: 0
            }
        );
        assert_eq!(tree.index.clamp(9), 2);
    }

    #[test]
    fn populate_twice_does_not_duplicate() {
        let config = sample();
        let mut tree = ControlTree::build(&config);
        tree.populate(&config);
        assert_eq!(tree.branches.len(), 2);
        assert_eq!(tree.components.len(), 2);
        assert_eq!(tree.particles.len(), 3);
    }

    #[test]
    fn check_is_exclusive_and_ignores_unknown_keys() {
        let mut tree = ControlTree::fixed();
        let checked = tree.branches.check("spatial").unwrap();
        assert_eq!(checked.value, "reassign_gas_multi_fixed_spatial_nest");
        assert_eq!(tree.branches.controls().iter().filter(|c| c.checked).count(), 1);

        // by value works as well
        tree.branches.check("default").unwrap();
        assert_eq!(tree.branches.checked().unwrap().id, "default");

        assert!(tree.branches.check("missing").is_none());
        assert_eq!(tree.branches.checked().unwrap().id, "default");
    }

    #[test]
    fn value_match_wins_over_generated_id() {
        let config = Configuration::from_json(
            r#"{"snap_nr":7,"nr_halos":1,"branches":{"a":{},"branch-a":{}},"ptypes":["stars"]}"#,
        )
        .unwrap();
        let mut tree = ControlTree::build(&config);
        assert_eq!(tree.branches.check("branch-a").unwrap().value, "branch-a");
        assert_eq!(tree.branches.checked().unwrap().id, "branch-branch-a");
    }

    #[test]
    fn fixed_tree_selection() {
        let mut tree = ControlTree::fixed();
        tree.components.check("dm");
        let selection = tree.selection();
        assert_eq!(selection.particles, Some(ParticleSubset::Fof));
        assert_eq!(selection.branch.as_deref(), Some("default"));
        assert_eq!(selection.component.as_deref(), Some("dark_matter"));
        assert_eq!(tree.index.max, None);
    }

    #[test]
    fn unchecked_group_reads_as_none() {
        let mut tree = ControlTree::fixed();
        tree.particles.uncheck_all();
        assert_eq!(tree.selection().particles, None);
    }
}
