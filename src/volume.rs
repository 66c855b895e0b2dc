//! Annotation volume and point → region lookup.
//!
//! Each voxel holds the id of the most specific structure at that location
//! (`0` = unannotated). A point maps to the voxel
//! `round(point / resolution)` on every axis; points that land outside the
//! grid have no region.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};
use crate::types::{Hemisphere, Point3, StructureId, DEPTH_AXIS};

/// A voxel grid of structure ids at a fixed resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationVolume {
    data: Array3<StructureId>,
    resolution: f64,
}

impl AnnotationVolume {
    /// Wrap a voxel grid. `resolution` is the voxel edge length in µm.
    pub fn new(data: Array3<StructureId>, resolution: f64) -> AdapterResult<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(AdapterError::argument(format!(
                "annotation resolution must be positive, got {resolution}"
            )));
        }
        Ok(Self { data, resolution })
    }

    /// Build from a flat, C-ordered (x slowest) vector.
    pub fn from_flat(shape: [usize; 3], values: Vec<StructureId>, resolution: f64) -> AdapterResult<Self> {
        let data = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values)
            .map_err(|e| AdapterError::argument(format!("annotation volume shape {shape:?}: {e}")))?;
        Self::new(data, resolution)
    }

    /// Grid shape.
    pub fn shape(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    /// Voxel edge length.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Voxel index of a point, or `None` outside the grid.
    pub fn voxel_of(&self, point: Point3) -> Option<[usize; 3]> {
        let shape = self.shape();
        let mut voxel = [0usize; 3];
        for axis in 0..3 {
            let idx = (point[axis] / self.resolution).round();
            if !idx.is_finite() || idx < 0.0 || idx >= shape[axis] as f64 {
                return None;
            }
            voxel[axis] = idx as usize;
        }
        Some(voxel)
    }

    /// Structure id at a point. Unannotated voxels and out-of-range points
    /// yield `None`.
    pub fn lookup(&self, point: Point3) -> Option<StructureId> {
        let [x, y, z] = self.voxel_of(point)?;
        match self.data[[x, y, z]] {
            0 => None,
            id => Some(id),
        }
    }

    /// [`lookup`](Self::lookup) applied per point, positions preserved.
    pub fn lookup_many(&self, points: &[Point3]) -> Vec<Option<StructureId>> {
        points.iter().map(|p| self.lookup(*p)).collect()
    }
}

/// On-disk form of an annotation volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationVolumeFile {
    /// Grid shape.
    pub shape: [usize; 3],
    /// Voxel edge length.
    pub resolution: f64,
    /// C-ordered voxel values.
    pub data: Vec<StructureId>,
}

impl TryFrom<AnnotationVolumeFile> for AnnotationVolume {
    type Error = AdapterError;

    fn try_from(file: AnnotationVolumeFile) -> Result<Self, Self::Error> {
        Self::from_flat(file.shape, file.data, file.resolution)
    }
}

impl From<&AnnotationVolume> for AnnotationVolumeFile {
    fn from(volume: &AnnotationVolume) -> Self {
        Self {
            shape: volume.shape(),
            resolution: volume.resolution,
            data: volume.data.iter().copied().collect(),
        }
    }
}

/// File name of a stored annotation volume at a resolution.
pub fn annotation_file_name(resolution: f64) -> String {
    if resolution.fract() == 0.0 {
        format!("annotation_{}.json", resolution as i64)
    } else {
        format!("annotation_{resolution}.json")
    }
}

/// Hemisphere of a point relative to the midline depth coordinate.
///
/// Points below the midline are left; the midline itself counts as right.
pub fn hemisphere_of(point: Point3, midline: f64) -> Hemisphere {
    if point[DEPTH_AXIS] < midline {
        Hemisphere::Left
    } else {
        Hemisphere::Right
    }
}

/// Reflect a point's depth coordinate about the midline.
pub fn mirror_point(point: Point3, midline: f64) -> Point3 {
    let mut mirrored = point;
    let delta = point[DEPTH_AXIS] - midline;
    mirrored[DEPTH_AXIS] = midline - delta;
    mirrored
}
