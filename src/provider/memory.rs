//! In-memory provider for testing and offline scripting.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::AtlasProvider;
use crate::types::{
    ExperimentId, ExperimentSummary, SourceSearchParams, SpatialSearchParams, Structure,
    StructureId, StructureSetInfo, TractographyRecord,
};
use crate::volume::AnnotationVolume;

/// Error type for in-memory provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Requested item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The call was configured to fail.
    #[error("Unavailable: {0}")]
    Unavailable(String),
    /// Writing a downloaded file failed.
    #[error("Write failed for {path}: {message}")]
    Write {
        /// Destination path.
        path: String,
        /// IO error text.
        message: String,
    },
}

/// In-memory provider.
///
/// Uses BTreeMap for deterministic iteration order. Download calls are
/// counted so tests can check cache hits.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    structures: BTreeMap<StructureId, Structure>,
    sets: BTreeMap<u32, (String, BTreeSet<StructureId>)>,
    meshes: BTreeMap<StructureId, String>,
    volume: Option<AnnotationVolume>,
    tractography: Vec<TractographyRecord>,
    spatial_override: Option<serde_json::Value>,
    experiments: Vec<ExperimentSummary>,
    streamlines: BTreeMap<ExperimentId, Vec<u8>>,
    sets_unavailable: bool,
    mesh_downloads: AtomicUsize,
    streamline_downloads: AtomicUsize,
}

impl InMemoryProvider {
    /// Create a new empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a structure.
    pub fn add_structure(&mut self, structure: Structure) {
        self.structures.insert(structure.id, structure);
    }

    /// Add a structure set with its members.
    pub fn add_structure_set(
        &mut self,
        id: u32,
        description: impl Into<String>,
        members: impl IntoIterator<Item = StructureId>,
    ) {
        self.sets
            .insert(id, (description.into(), members.into_iter().collect()));
    }

    /// Register OBJ text as the mesh of a structure.
    pub fn add_mesh(&mut self, id: StructureId, obj: impl Into<String>) {
        self.meshes.insert(id, obj.into());
    }

    /// Set the annotation volume.
    pub fn set_annotation_volume(&mut self, volume: AnnotationVolume) {
        self.volume = Some(volume);
    }

    /// Add a tractography record returned by spatial searches.
    pub fn add_tractography(&mut self, record: TractographyRecord) {
        self.tractography.push(record);
    }

    /// Return this raw value from every spatial search instead of the records.
    pub fn set_spatial_search_response(&mut self, value: serde_json::Value) {
        self.spatial_override = Some(value);
    }

    /// Add an experiment returned by source searches.
    pub fn add_experiment(&mut self, experiment: ExperimentSummary) {
        self.experiments.push(experiment);
    }

    /// Register streamline JSON for an experiment.
    pub fn add_streamlines(&mut self, experiment: ExperimentId, json: impl Into<Vec<u8>>) {
        self.streamlines.insert(experiment, json.into());
    }

    /// Make `structure_sets` fail, as when the ontology service is offline.
    pub fn set_structure_sets_unavailable(&mut self, unavailable: bool) {
        self.sets_unavailable = unavailable;
    }

    /// Number of mesh downloads served.
    pub fn mesh_downloads(&self) -> usize {
        self.mesh_downloads.load(Ordering::Relaxed)
    }

    /// Number of streamline downloads served.
    pub fn streamline_downloads(&self) -> usize {
        self.streamline_downloads.load(Ordering::Relaxed)
    }
}

impl AtlasProvider for InMemoryProvider {
    type Error = InMemoryError;

    fn structures(&self) -> Result<Vec<Structure>, Self::Error> {
        Ok(self.structures.values().cloned().collect())
    }

    fn structure_sets(&self) -> Result<Vec<StructureSetInfo>, Self::Error> {
        if self.sets_unavailable {
            return Err(InMemoryError::Unavailable("structure sets".to_string()));
        }
        Ok(self
            .sets
            .iter()
            .map(|(id, (description, _))| StructureSetInfo {
                id: *id,
                description: description.clone(),
            })
            .collect())
    }

    fn structure_set_members(&self, set_id: u32) -> Result<Vec<StructureId>, Self::Error> {
        self.sets
            .get(&set_id)
            .map(|(_, members)| members.iter().copied().collect())
            .ok_or_else(|| InMemoryError::NotFound(format!("structure set {set_id}")))
    }

    fn download_structure_mesh(&self, id: StructureId, dest: &Path) -> Result<(), Self::Error> {
        let obj = self
            .meshes
            .get(&id)
            .ok_or_else(|| InMemoryError::NotFound(format!("mesh for structure {id}")))?;
        std::fs::write(dest, obj).map_err(|e| InMemoryError::Write {
            path: dest.display().to_string(),
            message: e.to_string(),
        })?;
        self.mesh_downloads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn annotation_volume(&self, _resolution: f64) -> Result<AnnotationVolume, Self::Error> {
        self.volume
            .clone()
            .ok_or_else(|| InMemoryError::NotFound("annotation volume".to_string()))
    }

    fn experiment_spatial_search(
        &self,
        _seed: [i64; 3],
        params: &SpatialSearchParams,
    ) -> Result<serde_json::Value, Self::Error> {
        if let Some(value) = &self.spatial_override {
            return Ok(value.clone());
        }
        let records: Vec<&TractographyRecord> = self
            .tractography
            .iter()
            .filter(|r| {
                params.injection_structures.is_empty()
                    || params.injection_structures.contains(&r.structure_abbrev)
            })
            .filter(|r| {
                params.transgenic_lines.is_empty()
                    || r.transgenic_line
                        .as_ref()
                        .map_or(false, |l| params.transgenic_lines.contains(l))
            })
            .collect();
        serde_json::to_value(records).map_err(|e| InMemoryError::Unavailable(e.to_string()))
    }

    fn experiment_source_search(
        &self,
        acronym: &str,
        params: &SourceSearchParams,
    ) -> Result<Vec<ExperimentSummary>, Self::Error> {
        Ok(self
            .experiments
            .iter()
            .filter(|e| e.structure_abbrev.as_deref() == Some(acronym))
            .filter(|e| params.mouse_line.matches(e.transgenic_line.as_deref()))
            .cloned()
            .collect())
    }

    fn download_streamlines(&self, experiment: ExperimentId) -> Result<Vec<u8>, Self::Error> {
        let data = self
            .streamlines
            .get(&experiment)
            .cloned()
            .ok_or_else(|| InMemoryError::NotFound(format!("streamlines for experiment {experiment}")))?;
        self.streamline_downloads.fetch_add(1, Ordering::Relaxed);
        Ok(data)
    }
}
