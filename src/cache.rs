//! On-disk cache layout and the in-memory mesh cache.
//!
//! ## Layout
//!
//! ```text
//! <cache_root>/
//!   meshes/<acronym>.obj
//!   streamlines/<experiment id>.json
//!   annotation/
//!   connectivity/spatial_<fingerprint>.json
//! ```
//!
//! Every directory keeps a `cache_manifest.json` recording what was
//! downloaded and when. Writes are check-then-write without locking; two
//! processes sharing a cache root may both download the same file.

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AdapterResult;
use crate::types::{ExperimentId, MeshData};
use crate::volume::annotation_file_name;

/// File name of the per-directory manifest.
pub const MANIFEST_FILE: &str = "cache_manifest.json";

/// Cache directories under one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    /// Root directory.
    pub root: PathBuf,
    /// Region meshes.
    pub meshes: PathBuf,
    /// Streamline JSON files.
    pub streamlines: PathBuf,
    /// Annotation volumes.
    pub annotation: PathBuf,
    /// Cached connectivity queries.
    pub connectivity: PathBuf,
}

impl CachePaths {
    /// Directory layout under `root`. Nothing is created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            meshes: root.join("meshes"),
            streamlines: root.join("streamlines"),
            annotation: root.join("annotation"),
            connectivity: root.join("connectivity"),
            root,
        }
    }

    /// Create every directory that does not exist yet.
    pub fn ensure_dirs(&self) -> AdapterResult<()> {
        for dir in [&self.meshes, &self.streamlines, &self.annotation, &self.connectivity] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Mesh file of a region.
    pub fn mesh_path(&self, acronym: &str, format: &str) -> PathBuf {
        self.meshes.join(format!("{acronym}.{format}"))
    }

    /// Streamline file of an experiment.
    pub fn streamline_path(&self, experiment: ExperimentId) -> PathBuf {
        self.streamlines.join(format!("{experiment}.json"))
    }

    /// Stored annotation volume at a resolution.
    pub fn annotation_path(&self, resolution: f64) -> PathBuf {
        self.annotation.join(annotation_file_name(resolution))
    }

    /// Cached spatial search response.
    pub fn spatial_search_path(&self, fingerprint: &str) -> PathBuf {
        self.connectivity.join(format!("spatial_{fingerprint}.json"))
    }
}

/// One downloaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// When the file was written.
    pub downloaded_at: DateTime<Utc>,
    /// File size in bytes.
    pub bytes: u64,
}

/// Record of the files downloaded into one cache directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Entries keyed by file name.
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl CacheManifest {
    /// Load the manifest of `dir`; missing or unreadable manifests are empty.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(MANIFEST_FILE);
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt cache manifest");
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read cache manifest");
                Self::default()
            }
        }
    }

    /// Write the manifest into `dir`.
    pub fn save(&self, dir: &Path) -> AdapterResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_FILE), bytes)?;
        Ok(())
    }

    /// Record a file that was just written.
    pub fn record(&mut self, file: &Path) -> AdapterResult<()> {
        let bytes = std::fs::metadata(file)?.len();
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.entries.insert(
            name,
            ManifestEntry {
                downloaded_at: Utc::now(),
                bytes,
            },
        );
        Ok(())
    }

    /// Record `file` in the manifest of its directory.
    pub fn record_download(file: &Path) -> AdapterResult<()> {
        let Some(dir) = file.parent() else {
            return Ok(());
        };
        let mut manifest = Self::load(dir);
        manifest.record(file)?;
        manifest.save(dir)
    }
}

/// Parsed meshes kept in memory, keyed by file path.
pub struct MeshCache {
    cache: Arc<RwLock<LruCache<PathBuf, Arc<MeshData>>>>,
}

impl MeshCache {
    /// Create a cache holding at most `capacity` meshes.
    pub fn new(capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(RwLock::new(LruCache::new(size))),
        }
    }

    /// Load a mesh, parsing the file only on a cache miss.
    pub fn load(&self, path: &Path) -> AdapterResult<Arc<MeshData>> {
        if let Some(mesh) = self.cache.read().peek(path) {
            return Ok(Arc::clone(mesh));
        }

        let mesh = Arc::new(MeshData::load_obj(path)?);
        tracing::debug!(path = %path.display(), faces = mesh.faces.len(), "mesh loaded");
        self.cache.write().put(path.to_path_buf(), Arc::clone(&mesh));
        Ok(mesh)
    }

    /// Current and maximum number of entries.
    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.read();
        CacheStats {
            len: cache.len(),
            cap: cache.cap().get(),
        }
    }

    /// Drop every cached mesh.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

impl std::fmt::Debug for MeshCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshCache").field("stats", &self.stats()).finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
}
