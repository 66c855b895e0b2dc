//! The atlas data adapter.
//!
//! [`AtlasAdapter`] owns everything loaded from the provider at
//! construction time (structure tree, structure sets, annotation volume)
//! together with the cache layout and the mesh cache. Its methods turn
//! caller descriptors into [`Actor`] values and cached files.

use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{CacheManifest, CachePaths, CacheStats, MeshCache};
use crate::canonical::canonical_hash_hex;
use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterResult, BatchOutcome};
use crate::provider::AtlasProvider;
use crate::resolve::{
    self, AtlasLookup, NeuronOptions, NeuronOutput, RegionStyle, StreamlineColoring, TractActors,
    TractographyOptions,
};
use crate::tree::StructureTree;
use crate::types::{
    Actor, ExperimentId, ExperimentSummary, Hemisphere, MeshData, MouseLine, NeuronDescriptor,
    Point3, RegionRef, Rgb, SourceSearchParams, SpatialSearchParams, StreamlineFile, Structure,
    StructureId, TractographyRecord, DEPTH_AXIS,
};
use crate::volume::{hemisphere_of, mirror_point, AnnotationVolume, AnnotationVolumeFile};

/// A region mesh ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionActor {
    /// Region acronym.
    pub acronym: String,
    /// Colored mesh.
    pub actor: Actor,
}

/// Cache key of a spatial search.
#[derive(Serialize)]
struct SpatialQuery<'a> {
    seed: [i64; 3],
    params: &'a SpatialSearchParams,
}

/// Atlas data adapter.
///
/// ## Construction
///
/// 1. Load the structure tree
/// 2. Load the summary structures, minus the excluded regions
/// 3. Find the mesh-bearing structure set by description. If the set
///    list cannot be fetched, the summary structures are used as the
///    renderable regions and a warning is logged
/// 4. Load the annotation volume, from the cache when present
pub struct AtlasAdapter<P: AtlasProvider> {
    provider: Arc<P>,
    config: AdapterConfig,
    paths: CachePaths,
    tree: StructureTree,
    summary: BTreeSet<StructureId>,
    renderable: BTreeSet<String>,
    volume: AnnotationVolume,
    meshes: MeshCache,
}

impl<P: AtlasProvider> AtlasAdapter<P> {
    /// Create an adapter, loading atlas data from the provider.
    pub fn new(provider: Arc<P>, config: AdapterConfig) -> AdapterResult<Self> {
        config.validate()?;
        let paths = CachePaths::new(&config.cache_root);
        paths.ensure_dirs()?;

        let tree = StructureTree::new(provider.structures().map_err(AdapterError::from_provider)?);

        let summary: BTreeSet<StructureId> = provider
            .structure_set_members(config.summary_set_id)
            .map_err(AdapterError::from_provider)?
            .into_iter()
            .filter(|id| {
                tree.get_by_id(*id)
                    .is_some_and(|s| !config.excluded_regions.contains(&s.acronym))
            })
            .collect();

        let renderable = match Self::mesh_set_acronyms(&provider, &tree, &config) {
            Ok(acronyms) => acronyms,
            Err(e) => {
                tracing::warn!(error = %e, "could not retrieve structure sets, limited functionality available");
                summary
                    .iter()
                    .filter_map(|id| tree.get_by_id(*id))
                    .map(|s| s.acronym.clone())
                    .collect()
            }
        };

        let volume = Self::load_annotation(&provider, &paths, config.resolution)?;
        let meshes = MeshCache::new(config.mesh_cache_capacity);

        tracing::info!(
            structures = tree.len(),
            summary = summary.len(),
            renderable = renderable.len(),
            cache_root = %paths.root.display(),
            "atlas adapter ready"
        );

        Ok(Self {
            provider,
            config,
            paths,
            tree,
            summary,
            renderable,
            volume,
            meshes,
        })
    }

    fn mesh_set_acronyms(
        provider: &P,
        tree: &StructureTree,
        config: &AdapterConfig,
    ) -> AdapterResult<BTreeSet<String>> {
        let sets = provider.structure_sets().map_err(AdapterError::from_provider)?;
        let set = sets
            .iter()
            .find(|s| s.description == config.mesh_set_description)
            .ok_or_else(|| {
                AdapterError::Provider(format!("no structure set named {:?}", config.mesh_set_description))
            })?;
        let members = provider
            .structure_set_members(set.id)
            .map_err(AdapterError::from_provider)?;
        Ok(members
            .into_iter()
            .filter_map(|id| tree.get_by_id(id))
            .map(|s| s.acronym.clone())
            .collect())
    }

    fn load_annotation(provider: &P, paths: &CachePaths, resolution: f64) -> AdapterResult<AnnotationVolume> {
        let cached = paths.annotation_path(resolution);
        if cached.is_file() {
            let bytes = std::fs::read(&cached)?;
            let file: AnnotationVolumeFile = serde_json::from_slice(&bytes)
                .map_err(|e| AdapterError::parse(&cached, e.to_string()))?;
            return AnnotationVolume::try_from(file);
        }

        let volume = provider
            .annotation_volume(resolution)
            .map_err(AdapterError::from_provider)?;
        std::fs::write(&cached, serde_json::to_vec(&AnnotationVolumeFile::from(&volume))?)?;
        CacheManifest::record_download(&cached)?;
        tracing::info!(path = %cached.display(), shape = ?volume.shape(), "annotation volume cached");
        Ok(volume)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Configuration in use.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Cache directories.
    pub fn cache_paths(&self) -> &CachePaths {
        &self.paths
    }

    /// Structure tree.
    pub fn tree(&self) -> &StructureTree {
        &self.tree
    }

    /// Annotation volume.
    pub fn volume(&self) -> &AnnotationVolume {
        &self.volume
    }

    /// The provider.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Mesh cache statistics.
    pub fn mesh_cache_stats(&self) -> CacheStats {
        self.meshes.stats()
    }

    /// True if the region has a mesh and can be rendered.
    pub fn is_renderable(&self, acronym: &str) -> bool {
        self.renderable.contains(acronym)
    }

    /// Acronyms of every renderable region, sorted.
    pub fn region_acronyms(&self) -> impl Iterator<Item = &str> {
        self.renderable.iter().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    /// Path of a region's mesh, downloading it first if missing.
    pub fn ensure_mesh(&self, acronym: &str) -> AdapterResult<PathBuf> {
        let path = self.paths.mesh_path(acronym, &self.config.mesh_format);
        if path.is_file() {
            return Ok(path);
        }

        let structure = self
            .tree
            .get_by_acronym(acronym)
            .ok_or_else(|| AdapterError::UnknownRegion(acronym.to_string()))?;
        self.provider
            .download_structure_mesh(structure.id, &path)
            .map_err(AdapterError::from_provider)?;
        CacheManifest::record_download(&path)?;
        tracing::info!(region = acronym, path = %path.display(), "mesh downloaded");
        Ok(path)
    }

    /// Parsed mesh of a region.
    pub fn region_mesh(&self, acronym: &str) -> AdapterResult<Arc<MeshData>> {
        let path = self.ensure_mesh(acronym)?;
        self.meshes.load(&path)
    }

    /// Meshes of brain regions, colored per `style`.
    ///
    /// Ignored regions are skipped silently. Regions without a mesh and
    /// failed downloads land in the outcome's failures. With a hemisphere
    /// only that half of each region is returned.
    pub fn get_brain_regions<S: AsRef<str>>(
        &self,
        regions: &[S],
        style: &RegionStyle,
        hemisphere: Option<Hemisphere>,
    ) -> AdapterResult<BatchOutcome<RegionActor>> {
        let regions: Vec<String> = regions.iter().map(|r| r.as_ref().to_string()).collect();
        let resolved = resolve::resolve_region_colors(&regions, style, &self.config.regions, |acr| {
            self.canonical_color(acr)
        })?;

        let mut outcome = BatchOutcome::new();
        for (region, look) in regions.iter().zip(resolved) {
            if self.config.ignore_regions.contains(region) {
                tracing::debug!(region = %region, "ignored region skipped");
                continue;
            }
            tracing::debug!(region = %region, "rendering region");

            let result = if !self.is_renderable(region) {
                Err(AdapterError::UnknownRegion(format!(
                    "{region} does not belong to the mesh structure set"
                )))
            } else {
                self.get_region_unilateral(region, hemisphere, Some(look.color), Some(look.alpha))
                    .map(|actor| RegionActor {
                        acronym: region.clone(),
                        actor,
                    })
            };
            outcome.record(region.as_str(), result);
        }

        Ok(outcome)
    }

    /// One region's mesh, optionally restricted to one hemisphere.
    ///
    /// The bilateral mesh is cut at its centre of mass on the depth axis;
    /// the right half is kept and the left half is its mirror image about
    /// the root midline. `None` returns the whole mesh. Color and alpha
    /// default to the root look.
    pub fn get_region_unilateral(
        &self,
        acronym: &str,
        hemisphere: Option<Hemisphere>,
        color: Option<Rgb>,
        alpha: Option<f32>,
    ) -> AdapterResult<Actor> {
        let color = color.unwrap_or(self.config.regions.root_color);
        let alpha = alpha.unwrap_or(self.config.regions.root_alpha);
        let mesh = self.region_mesh(acronym)?;

        let shaped = match hemisphere {
            None => Actor::mesh(mesh),
            Some(side) => {
                let com = mesh
                    .center_of_mass()
                    .ok_or_else(|| AdapterError::parse(acronym, "mesh has no vertices"))?;
                let right = mesh.clip_half_space(DEPTH_AXIS, com[DEPTH_AXIS], true);
                match side {
                    Hemisphere::Right => Actor::mesh(Arc::new(right)),
                    Hemisphere::Left => {
                        let midline = self.config.root_midpoint()[DEPTH_AXIS];
                        Actor::mesh(Arc::new(right.mirrored(DEPTH_AXIS, midline)))
                    }
                }
            }
        };

        Ok(shaped.with_color(color).with_alpha(alpha).with_name(acronym))
    }

    // ------------------------------------------------------------------
    // Structure tree
    // ------------------------------------------------------------------

    /// Canonical color of a region.
    pub fn get_region_color(&self, region: impl Into<RegionRef>) -> AdapterResult<Rgb> {
        Ok(self.tree.resolve(&region.into())?.color())
    }

    /// Canonical colors of several regions, in order.
    pub fn get_region_colors<R: Into<RegionRef> + Clone>(&self, regions: &[R]) -> AdapterResult<Vec<Rgb>> {
        regions.iter().cloned().map(|r| self.get_region_color(r)).collect()
    }

    /// Ancestors of a region, from the root down.
    pub fn get_structure_ancestors(&self, region: impl Into<RegionRef>) -> AdapterResult<Vec<&Structure>> {
        let s = self.tree.resolve(&region.into())?;
        Ok(self.tree.ancestors(s.id))
    }

    /// Descendants of a region, shallowest first.
    pub fn get_structure_descendants(&self, region: impl Into<RegionRef>) -> AdapterResult<Vec<&Structure>> {
        let s = self.tree.resolve(&region.into())?;
        Ok(self.tree.descendants(s.id))
    }

    /// The summary structure a region belongs to.
    ///
    /// A summary structure is its own parent. Otherwise the nearest
    /// summary ancestor is returned, then the direct parent, then the
    /// region itself for the root.
    pub fn get_structure_parent(&self, region: impl Into<RegionRef>) -> AdapterResult<&Structure> {
        let s = self.tree.resolve(&region.into())?;
        if self.summary.contains(&s.id) {
            return Ok(s);
        }
        let nearest_summary = self
            .tree
            .ancestors(s.id)
            .into_iter()
            .rev()
            .find(|a| self.summary.contains(&a.id));
        Ok(nearest_summary.or_else(|| self.tree.parent(s.id)).unwrap_or(s))
    }

    /// Summary structures, sorted by acronym.
    pub fn summary_structures(&self) -> Vec<&Structure> {
        let mut out: Vec<&Structure> = self.summary.iter().filter_map(|id| self.tree.get_by_id(*id)).collect();
        out.sort_by(|a, b| a.acronym.cmp(&b.acronym));
        out
    }

    /// `"(acronym) - name"` for every summary structure.
    pub fn summary_structures_listing(&self) -> Vec<String> {
        self.summary_structures()
            .into_iter()
            .map(|s| format!("({}) - {}", s.acronym, s.name))
            .collect()
    }

    /// Write `"(acronym) -- name"` for every renderable region, sorted by
    /// acronym, one per line.
    pub fn write_structures_list(&self, path: impl AsRef<Path>) -> AdapterResult<usize> {
        let mut out = std::io::BufWriter::new(std::fs::File::create(path.as_ref())?);
        let mut written = 0;
        for acronym in &self.renderable {
            if let Some(s) = self.tree.get_by_acronym(acronym) {
                writeln!(out, "({}) -- {}", s.acronym, s.name)?;
                written += 1;
            }
        }
        out.flush()?;
        Ok(written)
    }

    // ------------------------------------------------------------------
    // Coordinates
    // ------------------------------------------------------------------

    /// Structure at a point; `None` outside the volume or in unannotated space.
    pub fn get_structure_from_coordinates(&self, point: Point3) -> Option<&Structure> {
        self.volume.lookup(point).and_then(|id| self.tree.get_by_id(id))
    }

    /// [`get_structure_from_coordinates`](Self::get_structure_from_coordinates)
    /// per point, positions preserved.
    pub fn get_structures_from_coordinates(&self, points: &[Point3]) -> Vec<Option<&Structure>> {
        points.iter().map(|p| self.get_structure_from_coordinates(*p)).collect()
    }

    /// Canonical color of the structure at each point, positions preserved.
    pub fn get_colors_from_coordinates(&self, points: &[Point3]) -> Vec<Option<Rgb>> {
        points
            .iter()
            .map(|p| self.get_structure_from_coordinates(*p).map(Structure::color))
            .collect()
    }

    /// Hemisphere of a point.
    pub fn get_hemisphere_from_point(&self, point: Point3) -> Hemisphere {
        hemisphere_of(point, self.config.root_midpoint()[DEPTH_AXIS])
    }

    /// Reflect a point into the other hemisphere.
    pub fn mirror_point_across_hemispheres(&self, point: Point3) -> Point3 {
        mirror_point(point, self.config.root_midpoint()[DEPTH_AXIS])
    }

    // ------------------------------------------------------------------
    // Neurons and tractography
    // ------------------------------------------------------------------

    /// Normalize and color neurons.
    pub fn get_neurons<I>(&self, neurons: I, options: &NeuronOptions) -> AdapterResult<NeuronOutput>
    where
        I: IntoIterator,
        I::Item: Into<NeuronDescriptor>,
    {
        let descriptors = neurons.into_iter().map(Into::into).collect();
        resolve::resolve_neurons(descriptors, options, &mut rand::rng())
    }

    /// Tract and injection actors for tractography records.
    pub fn get_tractography(
        &self,
        records: &[TractographyRecord],
        options: &TractographyOptions,
    ) -> AdapterResult<Vec<TractActors>> {
        for region in options.vip_regions.iter().filter(|r| self.tree.get_by_acronym(r).is_none()) {
            tracing::warn!(region = %region, "VIP region not in the structure tree");
        }
        resolve::resolve_tractography(records, options, &self.config.tractography, self)
    }

    /// Spheres at injection sites, sized by injected volume.
    pub fn get_injection_sites(
        &self,
        experiments: &[ExperimentSummary],
        color: Option<Rgb>,
    ) -> AdapterResult<Vec<Actor>> {
        if experiments.is_empty() {
            return Err(AdapterError::argument("experiments must not be empty"));
        }
        let color = color.unwrap_or(self.config.tractography.injection_color);
        let scale = self.config.tractography.injection_volume_size * 3.0;
        Ok(experiments
            .iter()
            .map(|e| {
                Actor::sphere(e.injection_point(), scale * e.injection_volume)
                    .with_color(color)
                    .with_name(e.id.to_string())
            })
            .collect())
    }

    /// One merged actor per streamline file.
    ///
    /// `style` defaults to the configured streamline style. Unreadable or
    /// empty files land in the outcome's failures.
    pub fn get_streamlines<F: AsRef<Path>>(
        &self,
        files: &[F],
        coloring: &StreamlineColoring,
        style: Option<&crate::config::StreamlineStyle>,
    ) -> AdapterResult<BatchOutcome<Actor>> {
        let style = style.unwrap_or(&self.config.streamlines);
        let colors = resolve::resolve_streamline_colors(coloring, files.len(), style, self, &mut rand::rng())?;

        let mut outcome = BatchOutcome::new();
        for (file, color) in files.iter().zip(colors) {
            let path = file.as_ref();
            let result = StreamlineFile::load(path).and_then(|data| {
                let actor = resolve::streamline_actor(&data, color, style)
                    .ok_or_else(|| AdapterError::parse(path, "file has no streamlines"))?;
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(actor.with_name(name))
            });
            outcome.record(path.display().to_string(), result);
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Connectivity
    // ------------------------------------------------------------------

    /// Experiments whose projections reach `p0`.
    ///
    /// The seed is truncated to integer coordinates. Responses are cached
    /// under the connectivity directory, keyed by the query fingerprint.
    pub fn get_projection_tracts_to_target(
        &self,
        p0: Point3,
        params: &SpatialSearchParams,
    ) -> AdapterResult<Vec<TractographyRecord>> {
        if p0.iter().any(|c| !c.is_finite()) {
            return Err(AdapterError::argument(format!("invalid seed point {p0:?}")));
        }
        let seed = [p0[0] as i64, p0[1] as i64, p0[2] as i64];
        let fingerprint = canonical_hash_hex(&SpatialQuery { seed, params })?;
        let cached = self.paths.spatial_search_path(&fingerprint);

        if cached.is_file() {
            tracing::debug!(seed = ?seed, path = %cached.display(), "spatial search cache hit");
            let bytes = std::fs::read(&cached)?;
            return serde_json::from_slice(&bytes).map_err(|e| AdapterError::parse(&cached, e.to_string()));
        }

        let response = self
            .provider
            .experiment_spatial_search(seed, params)
            .map_err(AdapterError::from_provider)?;
        if let serde_json::Value::String(message) = &response {
            return Err(AdapterError::argument(format!(
                "spatial search failed, query error message: {message}"
            )));
        }
        let records: Vec<TractographyRecord> = serde_json::from_value(response)
            .map_err(|e| AdapterError::parse("spatial search response", e.to_string()))?;

        std::fs::write(&cached, serde_json::to_vec(&records)?)?;
        CacheManifest::record_download(&cached)?;
        tracing::info!(seed = ?seed, experiments = records.len(), "spatial search done");
        Ok(records)
    }

    /// Download streamline files for experiments, skipping cached ones.
    pub fn download_streamlines(&self, experiments: &[ExperimentId]) -> BatchOutcome<PathBuf> {
        let total = experiments.len();
        let mut outcome = BatchOutcome::new();
        for (i, &id) in experiments.iter().enumerate() {
            tracing::info!(index = i + 1, total, experiment = id, "fetching streamlines");
            outcome.record(id.to_string(), self.download_streamline(id));
        }
        outcome
    }

    fn download_streamline(&self, experiment: ExperimentId) -> AdapterResult<PathBuf> {
        let path = self.paths.streamline_path(experiment);
        if path.is_file() {
            tracing::debug!(experiment, "streamlines already cached");
            return Ok(path);
        }
        let bytes = self
            .provider
            .download_streamlines(experiment)
            .map_err(AdapterError::from_provider)?;
        StreamlineFile::from_json_slice(&bytes, &path)?;
        std::fs::write(&path, &bytes)?;
        CacheManifest::record_download(&path)?;
        Ok(path)
    }

    /// Download streamlines of the experiments injected into a region.
    pub fn download_streamlines_for_region(
        &self,
        acronym: &str,
        params: &SourceSearchParams,
    ) -> AdapterResult<BatchOutcome<PathBuf>> {
        let experiments = self
            .provider
            .experiment_source_search(acronym, params)
            .map_err(AdapterError::from_provider)?;
        if experiments.is_empty() {
            tracing::warn!(region = acronym, "no experiments injected into region");
        }
        let ids: Vec<ExperimentId> = experiments.iter().map(|e| e.id).collect();
        Ok(self.download_streamlines(&ids))
    }

    /// Download streamlines of the experiments projecting to `p0`.
    pub fn download_streamlines_to_region(
        &self,
        p0: Point3,
        mouse_line: &MouseLine,
    ) -> AdapterResult<BatchOutcome<PathBuf>> {
        let records = self.get_projection_tracts_to_target(p0, &SpatialSearchParams::default())?;
        let ids: Vec<ExperimentId> = records
            .iter()
            .filter(|r| mouse_line.matches(r.transgenic_line.as_deref()))
            .map(|r| r.id)
            .collect();
        Ok(self.download_streamlines(&ids))
    }

    fn canonical_color(&self, acronym: &str) -> Option<Rgb> {
        self.tree.get_by_acronym(acronym).map(Structure::color)
    }
}

impl<P: AtlasProvider> AtlasLookup for AtlasAdapter<P> {
    fn region_color(&self, acronym: &str) -> Option<Rgb> {
        self.canonical_color(acronym)
    }

    fn summary_parent(&self, acronym: &str) -> Option<String> {
        self.get_structure_parent(acronym).ok().map(|s| s.acronym.clone())
    }

    fn region_at(&self, point: Point3) -> Option<String> {
        self.get_structure_from_coordinates(point).map(|s| s.acronym.clone())
    }
}

impl<P: AtlasProvider> std::fmt::Debug for AtlasAdapter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasAdapter")
            .field("cache_root", &self.paths.root)
            .field("structures", &self.tree.len())
            .field("renderable", &self.renderable.len())
            .field("meshes", &self.meshes)
            .finish()
    }
}
