//! Brain region (structure) records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::color::Rgb;
use crate::error::AdapterError;

/// Numeric structure id in the reference ontology.
pub type StructureId = u32;

/// A structure (brain region) of the reference ontology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Structure {
    /// Structure id.
    pub id: StructureId,
    /// Short unique identifier (e.g. `"CA1"`).
    pub acronym: String,
    /// Full name.
    pub name: String,
    /// Canonical display color, 0-255 per channel.
    pub rgb_triplet: [u8; 3],
    /// Ids from the root down to this structure (inclusive).
    #[serde(default)]
    pub structure_id_path: Vec<StructureId>,
    /// Direct parent id; `None` for the root.
    #[serde(default)]
    pub parent_structure_id: Option<StructureId>,
}

impl Structure {
    /// Create a structure with an empty id path.
    pub fn new(
        id: StructureId,
        acronym: impl Into<String>,
        name: impl Into<String>,
        rgb_triplet: [u8; 3],
    ) -> Self {
        Self {
            id,
            acronym: acronym.into(),
            name: name.into(),
            rgb_triplet,
            structure_id_path: vec![id],
            parent_structure_id: None,
        }
    }

    /// Attach the structure under `parent`, extending the parent's id path.
    pub fn child_of(mut self, parent: &Structure) -> Self {
        let mut path = parent.structure_id_path.clone();
        path.push(self.id);
        self.structure_id_path = path;
        self.parent_structure_id = Some(parent.id);
        self
    }

    /// Canonical color as unit RGB.
    pub fn color(&self) -> Rgb {
        Rgb::from_u8_triplet(self.rgb_triplet)
    }
}

/// Reference to a region by acronym or numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionRef {
    /// Numeric id.
    Id(StructureId),
    /// Acronym.
    Acronym(String),
}

impl From<&str> for RegionRef {
    fn from(s: &str) -> Self {
        Self::Acronym(s.to_string())
    }
}

impl From<String> for RegionRef {
    fn from(s: String) -> Self {
        Self::Acronym(s)
    }
}

impl From<&String> for RegionRef {
    fn from(s: &String) -> Self {
        Self::Acronym(s.clone())
    }
}

impl From<StructureId> for RegionRef {
    fn from(id: StructureId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for RegionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Acronym(a) => f.write_str(a),
        }
    }
}

/// A named structure set published by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureSetInfo {
    /// Set id.
    pub id: u32,
    /// Human-readable description, used to look sets up by name.
    pub description: String,
}

/// One side of the brain, split at the root midline on the depth axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    /// Depth coordinate below the midline.
    Left,
    /// Depth coordinate at or above the midline.
    Right,
}

impl FromStr for Hemisphere {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(AdapterError::argument(format!("Invalid hemisphere argument: {s}"))),
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_of_extends_path() {
        let root = Structure::new(997, "root", "root", [255, 255, 255]);
        let grey = Structure::new(8, "grey", "Basic cell groups and regions", [191, 218, 227]).child_of(&root);
        assert_eq!(grey.structure_id_path, vec![997, 8]);
        assert_eq!(grey.parent_structure_id, Some(997));
    }

    #[test]
    fn test_hemisphere_parse() {
        assert_eq!("LEFT".parse::<Hemisphere>().unwrap(), Hemisphere::Left);
        assert_eq!("right".parse::<Hemisphere>().unwrap(), Hemisphere::Right);
        assert!("both".parse::<Hemisphere>().unwrap_err().is_argument());
    }

    #[test]
    fn test_region_ref_json() {
        let refs: Vec<RegionRef> = serde_json::from_str(r#"["CA1", 382]"#).unwrap();
        assert_eq!(refs[0], RegionRef::Acronym("CA1".into()));
        assert_eq!(refs[1], RegionRef::Id(382));
    }
}
