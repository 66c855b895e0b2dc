//! Adapter configuration.
//!
//! All rendering defaults, atlas constants and cache locations live in one
//! [`AdapterConfig`] owned by the adapter. Values come from, lowest to
//! highest priority:
//!
//! 1. [`AdapterConfig::default`]
//! 2. a JSON file ([`AdapterConfig::from_json_file`])
//! 3. `ATLAS_*` environment variables ([`AdapterConfig::apply_env`])
//!
//! ## Environment variables
//!
//! - `ATLAS_CACHE_DIR`: root of the on-disk cache
//! - `ATLAS_RESOLUTION`: annotation volume resolution (µm per voxel)
//! - `ATLAS_MESH_CACHE_CAPACITY`: number of meshes kept in memory
//! - `ATLAS_STRUCTURE_COLOR` / `ATLAS_STRUCTURE_ALPHA`: default region look
//! - `ATLAS_VIP_COLOR`: color of VIP regions
//! - `ATLAS_TRACT_COLOR`: default tractography color

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AdapterError, AdapterResult};
use crate::types::{Point3, Rgb};

/// Structure set holding the main summary structures.
pub const SUMMARY_STRUCTURE_SET_ID: u32 = 167587189;

/// Description of the set of structures that have a precomputed mesh.
pub const MESH_STRUCTURE_SET: &str = "Structures whose surfaces are represented by a precomputed mesh";

/// How brain regions are drawn when the caller does not say.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDefaults {
    /// Color for regions without an explicit or canonical color.
    pub structure_color: Rgb,
    /// Opacity for non-VIP regions.
    pub structure_alpha: f32,
    /// Color of the whole-brain (root) mesh.
    pub root_color: Rgb,
    /// Opacity of the whole-brain (root) mesh.
    pub root_alpha: f32,
    /// Regions that get VIP treatment by default.
    pub vip_regions: Vec<String>,
    /// Color of VIP regions.
    pub vip_color: Rgb,
}

impl Default for RegionDefaults {
    fn default() -> Self {
        Self {
            structure_color: Rgb::from_unit(0.8, 0.8, 0.8),
            structure_alpha: 1.0,
            root_color: Rgb::from_unit(0.8, 0.8, 0.8),
            root_alpha: 0.2,
            vip_regions: Vec::new(),
            vip_color: Rgb::from_unit(0.8, 0.2, 0.2),
        }
    }
}

/// Tractography tube and injection sphere parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TractographyDefaults {
    /// Tube color when none is given.
    pub default_color: Rgb,
    /// Color of injection site spheres.
    pub injection_color: Rgb,
    /// Opacity of tubes and spheres.
    pub alpha: f32,
    /// Tube radius.
    pub radius: f64,
    /// Tube cross-section sides.
    pub resolution: u32,
    /// Sphere radius per unit of injected volume.
    pub injection_volume_size: f64,
}

impl Default for TractographyDefaults {
    fn default() -> Self {
        let salmon = Rgb::from_u8_triplet([250, 128, 114]);
        Self {
            default_color: salmon,
            injection_color: salmon,
            alpha: 1.0,
            radius: 15.0,
            resolution: 10,
            injection_volume_size: 120.0,
        }
    }
}

/// Look of streamline actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamlineStyle {
    /// Color when no coloring rule applies.
    pub color: Rgb,
    /// Opacity.
    pub alpha: f32,
    /// Tube radius.
    pub radius: f64,
    /// Tube cross-section sides.
    pub resolution: u32,
    /// Add spheres at the injection sites.
    pub show_injection_site: bool,
}

impl Default for StreamlineStyle {
    fn default() -> Self {
        Self {
            color: Rgb::from_u8_triplet([255, 255, 240]),
            alpha: 0.8,
            radius: 10.0,
            resolution: 3,
            show_injection_site: true,
        }
    }
}

/// Full adapter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Root of the on-disk cache (meshes, streamlines, annotation, connectivity).
    pub cache_root: PathBuf,
    /// Annotation volume resolution in µm per voxel.
    pub resolution: f64,
    /// Whole-brain bounding box, `[min, max]` per axis.
    pub root_bounds: [[f64; 2]; 3],
    /// Id of the summary structure set.
    pub summary_set_id: u32,
    /// Description of the mesh-bearing structure set.
    pub mesh_set_description: String,
    /// Regions never rendered.
    pub ignore_regions: Vec<String>,
    /// Regions left out of the summary structures.
    pub excluded_regions: Vec<String>,
    /// Mesh file extension.
    pub mesh_format: String,
    /// Meshes kept in memory.
    pub mesh_cache_capacity: usize,
    /// Region defaults.
    #[serde(default)]
    pub regions: RegionDefaults,
    /// Tractography defaults.
    #[serde(default)]
    pub tractography: TractographyDefaults,
    /// Streamline defaults.
    #[serde(default)]
    pub streamlines: StreamlineStyle,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from("atlas_data"),
            resolution: 25.0,
            root_bounds: [[-17.0, 13193.0], [134.0, 7564.0], [486.0, 10891.0]],
            summary_set_id: SUMMARY_STRUCTURE_SET_ID,
            mesh_set_description: MESH_STRUCTURE_SET.to_string(),
            ignore_regions: ["retina", "brain", "fiber tracts", "grey"]
                .into_iter()
                .map(String::from)
                .collect(),
            excluded_regions: vec!["fiber tracts".to_string()],
            mesh_format: "obj".to_string(),
            mesh_cache_capacity: 256,
            regions: RegionDefaults::default(),
            tractography: TractographyDefaults::default(),
            streamlines: StreamlineStyle::default(),
        }
    }
}

impl AdapterConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> AdapterResult<Self> {
        Self::default().apply_env(std::env::vars())
    }

    /// Apply `ATLAS_*` overrides from an iterator of `(key, value)` pairs.
    pub fn apply_env<I>(mut self, vars: I) -> AdapterResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "ATLAS_CACHE_DIR" => self.cache_root = PathBuf::from(value),
                "ATLAS_RESOLUTION" => self.resolution = parse_env(&key, &value)?,
                "ATLAS_MESH_CACHE_CAPACITY" => self.mesh_cache_capacity = parse_env(&key, &value)?,
                "ATLAS_STRUCTURE_ALPHA" => self.regions.structure_alpha = parse_env(&key, &value)?,
                "ATLAS_STRUCTURE_COLOR" => self.regions.structure_color = Rgb::parse(&value)?,
                "ATLAS_VIP_COLOR" => self.regions.vip_color = Rgb::parse(&value)?,
                "ATLAS_TRACT_COLOR" => self.tractography.default_color = Rgb::parse(&value)?,
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Use a different cache root.
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    /// Check ranges: positive resolution, ordered bounds, unit alphas.
    pub fn validate(&self) -> AdapterResult<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(AdapterError::argument(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.root_bounds.iter().any(|[lo, hi]| lo > hi) {
            return Err(AdapterError::argument("root bounds must be [min, max] per axis"));
        }
        let alphas = [
            self.regions.structure_alpha,
            self.regions.root_alpha,
            self.tractography.alpha,
            self.streamlines.alpha,
        ];
        if alphas.iter().any(|a| !(0.0..=1.0).contains(a)) {
            return Err(AdapterError::argument("alpha values must be in [0, 1]"));
        }
        if self.mesh_cache_capacity == 0 {
            return Err(AdapterError::argument("mesh cache capacity must be at least 1"));
        }
        Ok(())
    }

    /// Centre of the whole-brain bounding box.
    pub fn root_midpoint(&self) -> Point3 {
        let mid = |[lo, hi]: [f64; 2]| (lo + hi) / 2.0;
        [
            mid(self.root_bounds[0]),
            mid(self.root_bounds[1]),
            mid(self.root_bounds[2]),
        ]
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> AdapterResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AdapterError::argument(format!("{key}={value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_midpoint() {
        let mid = AdapterConfig::default().root_midpoint();
        assert_eq!(mid, [6588.0, 3849.0, 5688.5]);
    }

    #[test]
    fn test_env_overrides() {
        let config = AdapterConfig::default()
            .apply_env(vars(&[
                ("ATLAS_CACHE_DIR", "/tmp/atlas"),
                ("ATLAS_RESOLUTION", "10"),
                ("ATLAS_VIP_COLOR", "red"),
                ("UNRELATED", "x"),
            ]))
            .unwrap();
        assert_eq!(config.cache_root, PathBuf::from("/tmp/atlas"));
        assert_eq!(config.resolution, 10.0);
        assert_eq!(config.regions.vip_color.to_u8_triplet(), [255, 0, 0]);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let err = AdapterConfig::default()
            .apply_env(vars(&[("ATLAS_RESOLUTION", "fine")]))
            .unwrap_err();
        assert!(err.to_string().contains("ATLAS_RESOLUTION"));

        let err = AdapterConfig::default()
            .apply_env(vars(&[("ATLAS_STRUCTURE_ALPHA", "1.5")]))
            .unwrap_err();
        assert!(err.is_argument());
    }

    #[test]
    fn test_json_round_trip_with_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut value = serde_json::to_value(AdapterConfig::default()).unwrap();
        value.as_object_mut().unwrap().remove("streamlines");
        value["resolution"] = serde_json::json!(50.0);
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        let config = AdapterConfig::from_json_file(&path).unwrap();
        assert_eq!(config.resolution, 50.0);
        assert_eq!(config.streamlines, StreamlineStyle::default());
    }
}
