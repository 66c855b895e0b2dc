//! Atlas data providers.
//!
//! The adapter never talks to the network itself. Everything it knows about
//! the atlas (ontology, structure sets, meshes, annotation volume,
//! connectivity experiments, streamlines) comes through [`AtlasProvider`].

pub mod memory;
pub mod local;

use std::path::Path;

use crate::types::{
    ExperimentId, ExperimentSummary, SourceSearchParams, SpatialSearchParams, Structure,
    StructureId, StructureSetInfo,
};
use crate::volume::AnnotationVolume;

/// Source of atlas data.
///
/// Calls are blocking. Implementations have no retry policy; a failed
/// call surfaces as `Self::Error` and the adapter decides whether it is
/// fatal or a skipped batch item.
pub trait AtlasProvider: Send + Sync {
    /// Error type for provider calls.
    type Error: std::error::Error + Send + Sync;

    /// Every structure of the ontology.
    fn structures(&self) -> Result<Vec<Structure>, Self::Error>;

    /// Published structure sets (id + description).
    fn structure_sets(&self) -> Result<Vec<StructureSetInfo>, Self::Error>;

    /// Ids of the structures in one set.
    fn structure_set_members(&self, set_id: u32) -> Result<Vec<StructureId>, Self::Error>;

    /// Write the mesh of a structure to `dest`.
    fn download_structure_mesh(&self, id: StructureId, dest: &Path) -> Result<(), Self::Error>;

    /// The annotation volume at the given resolution.
    fn annotation_volume(&self, resolution: f64) -> Result<AnnotationVolume, Self::Error>;

    /// Experiments whose projections reach `seed`.
    ///
    /// Returns the raw response: an array of tractography records, or a
    /// string carrying the provider's error message.
    fn experiment_spatial_search(
        &self,
        seed: [i64; 3],
        params: &SpatialSearchParams,
    ) -> Result<serde_json::Value, Self::Error>;

    /// Experiments injected into the structure `acronym`.
    fn experiment_source_search(
        &self,
        acronym: &str,
        params: &SourceSearchParams,
    ) -> Result<Vec<ExperimentSummary>, Self::Error>;

    /// Raw streamline JSON for one experiment.
    fn download_streamlines(&self, experiment: ExperimentId) -> Result<Vec<u8>, Self::Error>;
}

pub use memory::InMemoryProvider;
pub use local::LocalProvider;
