//! Argument normalization and coloring.
//!
//! Callers describe colors, neurons and experiments in several shapes.
//! Each shape is a variant of a tagged enum here, and each enum has one
//! resolver that turns it into concrete per-entity values. Resolvers are
//! pure: atlas data reaches them through [`AtlasLookup`], randomness
//! through a caller-supplied RNG.

pub mod regions;
pub mod neurons;
pub mod tractography;
pub mod streamlines;

use crate::types::{Point3, Rgb};

/// Atlas queries the resolvers need.
pub trait AtlasLookup {
    /// Canonical color of a region.
    fn region_color(&self, acronym: &str) -> Option<Rgb>;

    /// Acronym of the summary structure containing `acronym`.
    fn summary_parent(&self, acronym: &str) -> Option<String>;

    /// Acronym of the region at a point.
    fn region_at(&self, point: Point3) -> Option<String>;
}

pub use regions::{resolve_region_colors, RegionColors, RegionStyle, ResolvedRegionColor};
pub use neurons::{
    normalize_neuron, resolve_neuron_colors, resolve_neurons, NeuronColor, NeuronColorSpec, NeuronOptions,
    NeuronOutput, NeuronPalette, PartColors,
};
pub use tractography::{
    resolve_tractography, InjectionRegionCheck, ManualColors, TractActors, TractColorBy,
    TractographyOptions,
};
pub use streamlines::{resolve_streamline_colors, streamline_actor, StreamlineColoring};

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::collections::BTreeMap;

    /// Lookup backed by plain maps.
    #[derive(Default)]
    pub struct MapLookup {
        pub colors: BTreeMap<String, Rgb>,
        pub parents: BTreeMap<String, String>,
        /// Points are matched on their depth coordinate only.
        pub regions_by_z: Vec<(f64, String)>,
    }

    impl AtlasLookup for MapLookup {
        fn region_color(&self, acronym: &str) -> Option<Rgb> {
            self.colors.get(acronym).copied()
        }

        fn summary_parent(&self, acronym: &str) -> Option<String> {
            self.parents.get(acronym).cloned()
        }

        fn region_at(&self, point: Point3) -> Option<String> {
            self.regions_by_z
                .iter()
                .find(|(z, _)| *z == point[2])
                .map(|(_, acronym)| acronym.clone())
        }
    }
}
