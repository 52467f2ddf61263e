//! Flat indexed triangle meshes.
//!
//! [`TriMesh`] is the I/O-boundary representation: positions plus CCW-wound
//! index triples, with no topology attached. OBJ files parse into it, the
//! topology-aware [`Mesh`](crate::mesh::Mesh) is built from it when a shape
//! set is constructed, and composed region surfaces are emitted as it.

use nalgebra::Point3;

use crate::geom::Aabb;

/// An indexed triangle surface.
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// Mesh name; for fragments this is the `"a-b"` mesh id string.
    pub name: String,

    /// Vertex positions.
    pub positions: Vec<Point3<f64>>,

    /// Triangle faces as indices into `positions`, counter-clockwise when
    /// viewed from the front.
    pub faces: Vec<[u32; 3]>,
}

impl TriMesh {
    /// Create an empty mesh with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positions: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Whether the mesh has no vertices or no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.faces.is_empty()
    }

    /// The axis-aligned bounding box, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Push a vertex and return its index.
    pub fn push_vertex(&mut self, position: Point3<f64>) -> u32 {
        self.positions.push(position);
        (self.positions.len() - 1) as u32
    }
}
