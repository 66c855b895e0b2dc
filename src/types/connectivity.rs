//! Connectivity records: tractography experiments and streamlines.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::geometry::Point3;
use crate::error::{AdapterError, AdapterResult};

/// Provider-assigned experiment id.
pub type ExperimentId = u64;

/// A structure touched by an injection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionStructure {
    /// Structure acronym.
    pub abbreviation: String,
    /// Structure id, when reported.
    #[serde(default)]
    pub id: Option<u32>,
    /// Structure name, when reported.
    #[serde(default)]
    pub name: Option<String>,
}

/// One point of a tractography path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    /// Position.
    pub coord: Point3,
    /// Projection density at this point.
    #[serde(default)]
    pub density: Option<f64>,
    /// Signal intensity at this point.
    #[serde(default)]
    pub intensity: Option<f64>,
}

/// One tractography experiment returned by a spatial search.
///
/// Field names follow the provider's kebab-case JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TractographyRecord {
    /// Experiment id.
    pub id: ExperimentId,
    /// Injection site centre.
    pub injection_coordinates: Point3,
    /// Injected volume (mm³).
    pub injection_volume: f64,
    /// Acronym of the primary injection structure.
    pub structure_abbrev: String,
    /// Name of the primary injection structure.
    #[serde(default)]
    pub structure_name: Option<String>,
    /// All structures touched by the injection.
    #[serde(default)]
    pub injection_structures: Vec<InjectionStructure>,
    /// Ordered path from the injection site to the seed point.
    #[serde(default)]
    pub path: Vec<PathPoint>,
    /// Mouse line; empty or missing for wild type.
    #[serde(default)]
    pub transgenic_line: Option<String>,
}

impl TractographyRecord {
    /// Acronyms of every injection structure.
    pub fn injection_acronyms(&self) -> Vec<String> {
        self.injection_structures
            .iter()
            .map(|s| s.abbreviation.clone())
            .collect()
    }

    /// Path positions in order.
    pub fn path_points(&self) -> Vec<Point3> {
        self.path.iter().map(|p| p.coord).collect()
    }

    /// True if the experiment was run on a wild-type animal.
    pub fn is_wild_type(&self) -> bool {
        self.transgenic_line.as_deref().map_or(true, str::is_empty)
    }
}

/// One experiment row from a source search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    /// Experiment id.
    pub id: ExperimentId,
    /// Injection x.
    pub injection_x: f64,
    /// Injection y.
    pub injection_y: f64,
    /// Injection z.
    pub injection_z: f64,
    /// Injected volume (mm³).
    pub injection_volume: f64,
    /// Primary injection structure acronym.
    #[serde(default)]
    pub structure_abbrev: Option<String>,
    /// Mouse line; empty or missing for wild type.
    #[serde(default)]
    pub transgenic_line: Option<String>,
}

impl ExperimentSummary {
    /// Injection site as a point.
    pub fn injection_point(&self) -> Point3 {
        [self.injection_x, self.injection_y, self.injection_z]
    }
}

/// Which mouse line to keep when filtering experiments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseLine {
    /// Wild type only (empty transgenic line).
    #[default]
    WildType,
    /// One named transgenic line.
    Line(String),
}

impl MouseLine {
    /// True if a record with this transgenic line passes the filter.
    pub fn matches(&self, transgenic_line: Option<&str>) -> bool {
        let line = transgenic_line.unwrap_or("");
        match self {
            Self::WildType => line.is_empty(),
            Self::Line(name) => line == name,
        }
    }
}

/// Parameters of a spatial (target) search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpatialSearchParams {
    /// Restrict to injections in these structures (empty = any).
    #[serde(default)]
    pub injection_structures: Vec<String>,
    /// Restrict to these transgenic lines (empty = any).
    #[serde(default)]
    pub transgenic_lines: Vec<String>,
    /// Only count the primary injection structure.
    #[serde(default)]
    pub primary_structure_only: bool,
}

/// Parameters of a source (injection region) search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSearchParams {
    /// Only experiments whose primary injection is the region.
    pub primary_structure_only: bool,
    /// Mouse line filter.
    pub mouse_line: MouseLine,
}

impl Default for SourceSearchParams {
    fn default() -> Self {
        Self {
            primary_structure_only: true,
            mouse_line: MouseLine::WildType,
        }
    }
}

/// A point in a streamline file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamlinePoint {
    /// x.
    pub x: f64,
    /// y.
    pub y: f64,
    /// z.
    pub z: f64,
}

impl From<StreamlinePoint> for Point3 {
    fn from(p: StreamlinePoint) -> Self {
        [p.x, p.y, p.z]
    }
}

/// Precomputed streamlines for one experiment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamlineFile {
    /// Each line is an ordered list of points.
    pub lines: Vec<Vec<StreamlinePoint>>,
    /// Injection site points.
    #[serde(default)]
    pub injection_sites: Vec<StreamlinePoint>,
}

impl StreamlineFile {
    /// Parse streamline JSON.
    ///
    /// Accepts a single `{lines, injection_sites}` object or an array of
    /// them; arrays are concatenated.
    pub fn from_json_slice(bytes: &[u8], source: &Path) -> AdapterResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| AdapterError::parse(source, e.to_string()))?;
        if value.is_array() {
            let parts: Vec<StreamlineFile> = serde_json::from_value(value)
                .map_err(|e| AdapterError::parse(source, e.to_string()))?;
            Ok(parts.into_iter().fold(Self::default(), |mut acc, part| {
                acc.lines.extend(part.lines);
                acc.injection_sites.extend(part.injection_sites);
                acc
            }))
        } else {
            serde_json::from_value(value).map_err(|e| AdapterError::parse(source, e.to_string()))
        }
    }

    /// Read and parse a streamline file.
    pub fn load(path: &Path) -> AdapterResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json_slice(&bytes, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_provider_json() {
        let json = r#"{
            "id": 100141273,
            "injection-coordinates": [8000.0, 3000.0, 4500.0],
            "injection-volume": 0.25,
            "structure-abbrev": "MOs",
            "injection-structures": [{"abbreviation": "MOs", "id": 993}, {"abbreviation": "MOp"}],
            "path": [{"coord": [8000.0, 3000.0, 4500.0], "density": 0.1}, {"coord": [7000.0, 3500.0, 5000.0]}],
            "transgenic-line": ""
        }"#;
        let record: TractographyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.structure_abbrev, "MOs");
        assert_eq!(record.injection_acronyms(), vec!["MOs", "MOp"]);
        assert_eq!(record.path_points().len(), 2);
        assert!(record.is_wild_type());
    }

    #[test]
    fn test_mouse_line_filter() {
        assert!(MouseLine::WildType.matches(None));
        assert!(MouseLine::WildType.matches(Some("")));
        assert!(!MouseLine::WildType.matches(Some("Cux2-IRES-Cre")));
        assert!(MouseLine::Line("Cux2-IRES-Cre".into()).matches(Some("Cux2-IRES-Cre")));
    }

    #[test]
    fn test_streamline_array_form() {
        let json = br#"[
            {"lines": [[{"x": 0, "y": 0, "z": 0}, {"x": 1, "y": 1, "z": 1}]], "injection_sites": [{"x": 0, "y": 0, "z": 0}]},
            {"lines": [[{"x": 2, "y": 2, "z": 2}, {"x": 3, "y": 3, "z": 3}]]}
        ]"#;
        let file = StreamlineFile::from_json_slice(json, Path::new("1.json")).unwrap();
        assert_eq!(file.lines.len(), 2);
        assert_eq!(file.injection_sites.len(), 1);
    }

    #[test]
    fn test_streamline_bad_json() {
        let err = StreamlineFile::from_json_slice(b"{\"lines\": 3}", Path::new("x.json")).unwrap_err();
        assert!(matches!(err, AdapterError::Parse { .. }));
    }
}
