//! Renderable geometry handed to the scene renderer.
//!
//! The adapter does not render anything. It produces [`Actor`] values: a
//! [`Shape`] plus the color, opacity and name the renderer should apply.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::color::Rgb;
use crate::error::{AdapterError, AdapterResult};

/// A point in atlas space (micrometres).
pub type Point3 = [f64; 3];

/// Index of the depth (left/right) axis.
pub const DEPTH_AXIS: usize = 2;

/// Triangle mesh data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangles as zero-based vertex indices.
    pub faces: Vec<[u32; 3]>,
}

impl MeshData {
    /// Parse Wavefront OBJ text.
    ///
    /// Only `v` and `f` records are read. Polygons are fan-triangulated and
    /// `v/vt/vn` face references use their vertex index.
    pub fn from_obj(text: &str, source: &Path) -> AdapterResult<Self> {
        let mut mesh = MeshData::default();

        for (lineno, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("v") => {
                    let coords: Vec<f64> = fields
                        .take(3)
                        .map(str::parse)
                        .collect::<Result<_, _>>()
                        .map_err(|e| AdapterError::parse(source, format!("line {}: {e}", lineno + 1)))?;
                    if coords.len() != 3 {
                        return Err(AdapterError::parse(
                            source,
                            format!("line {}: vertex needs 3 coordinates", lineno + 1),
                        ));
                    }
                    mesh.vertices.push([coords[0], coords[1], coords[2]]);
                }
                Some("f") => {
                    let n_vertices = mesh.vertices.len() as i64;
                    let indices: Vec<u32> = fields
                        .map(|f| {
                            let raw: i64 = f
                                .split('/')
                                .next()
                                .unwrap_or_default()
                                .parse()
                                .map_err(|e| AdapterError::parse(source, format!("line {}: {e}", lineno + 1)))?;
                            // OBJ indices are 1-based; negatives count back from the end.
                            let idx = if raw < 0 { n_vertices + raw } else { raw - 1 };
                            if idx < 0 || idx >= n_vertices {
                                return Err(AdapterError::parse(
                                    source,
                                    format!("line {}: face index {raw} out of range", lineno + 1),
                                ));
                            }
                            Ok(idx as u32)
                        })
                        .collect::<AdapterResult<_>>()?;
                    if indices.len() < 3 {
                        return Err(AdapterError::parse(
                            source,
                            format!("line {}: face needs at least 3 vertices", lineno + 1),
                        ));
                    }
                    for k in 1..indices.len() - 1 {
                        mesh.faces.push([indices[0], indices[k], indices[k + 1]]);
                    }
                }
                _ => {}
            }
        }

        Ok(mesh)
    }

    /// Read and parse an OBJ file.
    pub fn load_obj(path: &Path) -> AdapterResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_obj(&text, path)
    }

    /// True if the mesh has no faces.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Mean of the vertex positions.
    pub fn center_of_mass(&self) -> Option<Point3> {
        if self.vertices.is_empty() {
            return None;
        }
        let n = self.vertices.len() as f64;
        let mut acc = [0.0; 3];
        for v in &self.vertices {
            for (a, c) in acc.iter_mut().zip(v) {
                *a += c;
            }
        }
        Some([acc[0] / n, acc[1] / n, acc[2] / n])
    }

    /// Keep the faces whose centroid lies on one side of the plane
    /// `coord[axis] == origin`. Unused vertices are dropped, as are faces
    /// referencing a vertex the mesh does not have.
    pub fn clip_half_space(&self, axis: usize, origin: f64, keep_above: bool) -> MeshData {
        let mut remap: Vec<Option<u32>> = vec![None; self.vertices.len()];
        let mut out = MeshData::default();

        for face in &self.faces {
            let Some(corners) = face
                .iter()
                .map(|&i| self.vertices.get(i as usize))
                .collect::<Option<Vec<_>>>()
            else {
                tracing::debug!(?face, vertices = self.vertices.len(), "face index out of range, skipped");
                continue;
            };
            let centroid = corners.iter().map(|v| v[axis]).sum::<f64>() / 3.0;
            let above = centroid >= origin;
            if above != keep_above {
                continue;
            }
            let mut new_face = [0u32; 3];
            for ((slot, &i), v) in new_face.iter_mut().zip(face).zip(corners) {
                *slot = *remap[i as usize].get_or_insert_with(|| {
                    out.vertices.push(*v);
                    (out.vertices.len() - 1) as u32
                });
            }
            out.faces.push(new_face);
        }

        out
    }

    /// Reflect every vertex across `coord[axis] == about`.
    ///
    /// Face winding is reversed so normals keep pointing outwards.
    pub fn mirrored(&self, axis: usize, about: f64) -> MeshData {
        let vertices = self
            .vertices
            .iter()
            .map(|v| {
                let mut p = *v;
                p[axis] = 2.0 * about - p[axis];
                p
            })
            .collect();
        let faces = self.faces.iter().map(|f| [f[0], f[2], f[1]]).collect();
        MeshData { vertices, faces }
    }
}

/// Geometry of an actor.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A loaded triangle mesh.
    Mesh(Arc<MeshData>),
    /// A sphere.
    Sphere {
        /// Centre.
        center: Point3,
        /// Radius.
        radius: f64,
    },
    /// A tube following an ordered polyline.
    Tube {
        /// Path points, in order.
        points: Vec<Point3>,
        /// Tube radius.
        radius: f64,
        /// Number of sides of the tube cross-section.
        resolution: u32,
    },
    /// Several shapes rendered as one object.
    Group(Vec<Shape>),
}

impl Shape {
    /// Number of leaf shapes (groups are flattened).
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Group(parts) => parts.iter().map(Shape::leaf_count).sum(),
            _ => 1,
        }
    }

    fn into_leaves(self, out: &mut Vec<Shape>) {
        match self {
            Self::Group(parts) => parts.into_iter().for_each(|p| p.into_leaves(out)),
            leaf => out.push(leaf),
        }
    }
}

/// A renderable object: a shape with display properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    /// Geometry.
    pub shape: Shape,
    /// Color; `None` leaves the renderer default.
    pub color: Option<Rgb>,
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
    /// Optional label (region acronym, file name).
    pub name: Option<String>,
}

impl Actor {
    /// Create an opaque, uncolored actor.
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            color: None,
            alpha: 1.0,
            name: None,
        }
    }

    /// Actor wrapping a mesh.
    pub fn mesh(mesh: Arc<MeshData>) -> Self {
        Self::new(Shape::Mesh(mesh))
    }

    /// Sphere actor.
    pub fn sphere(center: Point3, radius: f64) -> Self {
        Self::new(Shape::Sphere { center, radius })
    }

    /// Tube actor.
    pub fn tube(points: Vec<Point3>, radius: f64, resolution: u32) -> Self {
        Self::new(Shape::Tube {
            points,
            radius,
            resolution,
        })
    }

    /// Set the color.
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the opacity (clamped to `[0, 1]`).
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Set the label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Recolor in place.
    pub fn set_color(&mut self, color: Rgb) {
        self.color = Some(color);
    }

    /// Combine two actors into one group.
    ///
    /// Display properties come from `self`. Nested groups are flattened.
    pub fn merge(self, other: Actor) -> Actor {
        let mut leaves = Vec::new();
        self.shape.into_leaves(&mut leaves);
        other.shape.into_leaves(&mut leaves);
        Actor {
            shape: Shape::Group(leaves),
            color: self.color,
            alpha: self.alpha,
            name: self.name,
        }
    }

    /// Merge a list of actors; `None` for an empty list.
    pub fn merge_all(actors: impl IntoIterator<Item = Actor>) -> Option<Actor> {
        actors.into_iter().reduce(Actor::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_HALF: &str = "\
# two triangles straddling z = 5
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 10
v 1 0 10
v 0 1 10
f 1 2 3
f 4/1/1 5/2/2 6/3/3
";

    #[test]
    fn test_from_obj() {
        let mesh = MeshData::from_obj(CUBE_HALF, Path::new("t.obj")).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [3, 4, 5]]);
    }

    #[test]
    fn test_from_obj_quad_is_fanned() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = MeshData::from_obj(text, Path::new("q.obj")).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_from_obj_bad_index() {
        let err = MeshData::from_obj("v 0 0 0\nf 1 2 3\n", Path::new("bad.obj")).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_clip_and_mirror() {
        let mesh = MeshData::from_obj(CUBE_HALF, Path::new("t.obj")).unwrap();
        let com = mesh.center_of_mass().unwrap();
        assert_eq!(com[DEPTH_AXIS], 5.0);

        let right = mesh.clip_half_space(DEPTH_AXIS, com[DEPTH_AXIS], true);
        assert_eq!(right.faces.len(), 1);
        assert_eq!(right.vertices.len(), 3);
        assert!(right.vertices.iter().all(|v| v[DEPTH_AXIS] == 10.0));

        let left = right.mirrored(DEPTH_AXIS, 5.0);
        assert!(left.vertices.iter().all(|v| v[DEPTH_AXIS] == 0.0));
        assert_eq!(left.faces[0], [0, 2, 1]);
    }

    #[test]
    fn test_clip_skips_faces_with_missing_vertices() {
        let mesh = MeshData {
            vertices: vec![[0.0, 0.0, 10.0], [1.0, 0.0, 10.0], [0.0, 1.0, 10.0]],
            faces: vec![[0, 1, 7], [0, 1, 2]],
        };
        let kept = mesh.clip_half_space(DEPTH_AXIS, 5.0, true);
        assert_eq!(kept.faces, vec![[0, 1, 2]]);
        assert_eq!(kept.vertices, mesh.vertices);
    }

    #[test]
    fn test_merge_flattens() {
        let a = Actor::sphere([0.0; 3], 1.0).with_color(Rgb::from_unit(1.0, 0.0, 0.0));
        let b = Actor::tube(vec![[0.0; 3], [1.0; 3]], 2.0, 8);
        let c = Actor::sphere([5.0; 3], 1.0);
        let merged = a.clone().merge(b).merge(c);
        assert_eq!(merged.shape.leaf_count(), 3);
        assert_eq!(merged.color, a.color);
        assert!(Actor::merge_all(Vec::new()).is_none());
    }
}
