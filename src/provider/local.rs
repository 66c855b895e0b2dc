//! Provider backed by a local directory of exported atlas data.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   structures.json          [Structure]
//!   structure_sets.json      [{id, description, structure_ids}]
//!   meshes/<id>.obj          one mesh per structure id
//!   annotation_<res>.json    {shape, resolution, data}
//!   experiments.json         [ExperimentSummary]       (optional)
//!   tractography.json        spatial search response   (optional)
//!   streamlines/<id>.json    one file per experiment id
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::AtlasProvider;
use crate::types::{
    ExperimentId, ExperimentSummary, SourceSearchParams, SpatialSearchParams, Structure,
    StructureId, StructureSetInfo,
};
use crate::volume::{annotation_file_name, AnnotationVolume, AnnotationVolumeFile};

/// Error type for the local provider.
#[derive(Debug, thiserror::Error)]
pub enum LocalProviderError {
    /// A required file is missing.
    #[error("Missing file: {0}")]
    Missing(PathBuf),
    /// Reading or writing a file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// A file is not valid JSON for its record type.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// Structure set id not present in `structure_sets.json`.
    #[error("Unknown structure set: {0}")]
    UnknownSet(u32),
    /// The stored annotation volume is malformed.
    #[error("Invalid annotation volume: {0}")]
    Volume(String),
}

/// Structure set entry of `structure_sets.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStructureSet {
    /// Set id.
    pub id: u32,
    /// Set description.
    pub description: String,
    /// Member structure ids.
    pub structure_ids: Vec<StructureId>,
}

/// Provider reading exported atlas data from a directory.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    /// Create a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, LocalProviderError> {
        if !path.exists() {
            return Err(LocalProviderError::Missing(path.to_path_buf()));
        }
        std::fs::read(path).map_err(|source| LocalProviderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, LocalProviderError> {
        let path = self.root.join(name);
        let bytes = self.read_bytes(&path)?;
        serde_json::from_slice(&bytes).map_err(|source| LocalProviderError::Json { path, source })
    }

    fn sets(&self) -> Result<Vec<LocalStructureSet>, LocalProviderError> {
        self.read_json("structure_sets.json")
    }
}

impl AtlasProvider for LocalProvider {
    type Error = LocalProviderError;

    fn structures(&self) -> Result<Vec<Structure>, Self::Error> {
        self.read_json("structures.json")
    }

    fn structure_sets(&self) -> Result<Vec<StructureSetInfo>, Self::Error> {
        Ok(self
            .sets()?
            .into_iter()
            .map(|s| StructureSetInfo {
                id: s.id,
                description: s.description,
            })
            .collect())
    }

    fn structure_set_members(&self, set_id: u32) -> Result<Vec<StructureId>, Self::Error> {
        self.sets()?
            .into_iter()
            .find(|s| s.id == set_id)
            .map(|s| s.structure_ids)
            .ok_or(LocalProviderError::UnknownSet(set_id))
    }

    fn download_structure_mesh(&self, id: StructureId, dest: &Path) -> Result<(), Self::Error> {
        let src = self.root.join("meshes").join(format!("{id}.obj"));
        if !src.exists() {
            return Err(LocalProviderError::Missing(src));
        }
        std::fs::copy(&src, dest)
            .map(|_| ())
            .map_err(|source| LocalProviderError::Io {
                path: dest.to_path_buf(),
                source,
            })
    }

    fn annotation_volume(&self, resolution: f64) -> Result<AnnotationVolume, Self::Error> {
        let file: AnnotationVolumeFile = self.read_json(&annotation_file_name(resolution))?;
        AnnotationVolume::try_from(file).map_err(|e| LocalProviderError::Volume(e.to_string()))
    }

    fn experiment_spatial_search(
        &self,
        _seed: [i64; 3],
        _params: &SpatialSearchParams,
    ) -> Result<serde_json::Value, Self::Error> {
        self.read_json("tractography.json")
    }

    fn experiment_source_search(
        &self,
        acronym: &str,
        params: &SourceSearchParams,
    ) -> Result<Vec<ExperimentSummary>, Self::Error> {
        let path = self.root.join("experiments.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let experiments: Vec<ExperimentSummary> = self.read_json("experiments.json")?;
        Ok(experiments
            .into_iter()
            .filter(|e| e.structure_abbrev.as_deref() == Some(acronym))
            .filter(|e| params.mouse_line.matches(e.transgenic_line.as_deref()))
            .collect())
    }

    fn download_streamlines(&self, experiment: ExperimentId) -> Result<Vec<u8>, Self::Error> {
        self.read_bytes(&self.root.join("streamlines").join(format!("{experiment}.json")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_volume_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = AnnotationVolumeFile {
            shape: [1, 1, 2],
            resolution: 25.0,
            data: vec![0, 7],
        };
        std::fs::write(dir.path().join("annotation_25.json"), serde_json::to_vec(&file).unwrap()).unwrap();
        let provider = LocalProvider::new(dir.path());
        let volume = provider.annotation_volume(25.0).unwrap();
        assert_eq!(volume.lookup([0.0, 0.0, 25.0]), Some(7));
        assert!(matches!(provider.annotation_volume(10.0), Err(LocalProviderError::Missing(_))));

        std::fs::write(
            dir.path().join("annotation_50.json"),
            r#"{"shape":[2,2,2],"resolution":50.0,"data":[1]}"#,
        )
        .unwrap();
        assert!(matches!(provider.annotation_volume(50.0), Err(LocalProviderError::Volume(_))));
    }

    #[test]
    fn test_reads_exported_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let structures = vec![Structure::new(997, "root", "root", [255, 255, 255])];
        std::fs::write(root.join("structures.json"), serde_json::to_vec(&structures).unwrap()).unwrap();
        let sets = vec![LocalStructureSet {
            id: 5,
            description: "meshes".into(),
            structure_ids: vec![997],
        }];
        std::fs::write(root.join("structure_sets.json"), serde_json::to_vec(&sets).unwrap()).unwrap();
        std::fs::create_dir(root.join("meshes")).unwrap();
        std::fs::write(root.join("meshes/997.obj"), "v 0 0 0\n").unwrap();

        let provider = LocalProvider::new(root);
        assert_eq!(provider.structures().unwrap(), structures);
        assert_eq!(provider.structure_set_members(5).unwrap(), vec![997]);
        assert!(matches!(provider.structure_set_members(6), Err(LocalProviderError::UnknownSet(6))));

        let dest = root.join("copy.obj");
        provider.download_structure_mesh(997, &dest).unwrap();
        assert!(dest.exists());
        assert!(matches!(
            provider.download_structure_mesh(1, &dest),
            Err(LocalProviderError::Missing(_))
        ));
        assert!(provider
            .experiment_source_search("root", &SourceSearchParams::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_bad_json_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("structures.json"), "{not json").unwrap();
        let err = LocalProvider::new(dir.path()).structures().unwrap_err();
        assert!(err.to_string().contains("structures.json"));
    }
}
