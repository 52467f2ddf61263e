//! Region composition: stitching fragments into one closed region surface.

use hashbrown::HashMap;
use tracing::info;

use crate::error::{ShapeSetError, ShapeSetResult};
use crate::geom::point_key;
use crate::ids::ShapeId;
use crate::shapeset::ShapeSet;
use crate::trimesh::TriMesh;

/// Result of composing a region surface.
#[derive(Debug)]
pub struct ComposeResult {
    /// The stitched surface. Its name is the region's shape labels joined
    /// with underscores.
    pub mesh: TriMesh,

    /// Faces incident to each result vertex, maintained as faces were
    /// appended.
    pub vertex_faces: Vec<Vec<u32>>,

    /// How many source meshes were copied with inverted orientation.
    pub inverted_sources: usize,
}

impl ShapeSet {
    /// Compose the outer surface of the union of the given shapes.
    ///
    /// A fragment is part of the region surface when exactly one of its two
    /// shapes is in the region. Its faces are copied with inverted
    /// orientation when the *front* shape is the one inside, so the result
    /// faces outward consistently. Vertices are deduplicated by exact
    /// coordinates, which folds shared border vertices into one.
    pub fn compose_region(&self, shape_ids: &[ShapeId]) -> ShapeSetResult<ComposeResult> {
        let mut labels = Vec::with_capacity(shape_ids.len());
        for &shape_id in shape_ids {
            let label = self
                .shapes
                .get(&shape_id)
                .ok_or(ShapeSetError::UnknownShape { id: shape_id })?;
            labels.push(label.clone());
        }
        let mut mesh = TriMesh::new(labels.join("_"));

        let in_region = |s: ShapeId| shape_ids.contains(&s);
        let mut vertex_faces: Vec<Vec<u32>> = Vec::new();
        let mut dedup: HashMap<[u64; 3], u32> = HashMap::new();
        let mut inverted_sources = 0;

        for (mesh_id, source) in &self.meshes {
            let (front, back) = mesh_id.shapes();
            let must_invert = in_region(front);
            if must_invert == in_region(back) {
                // interior or exterior fragment, not part of the surface
                continue;
            }
            if must_invert {
                inverted_sources += 1;
            }

            for &f in &source.faces {
                let face = self.topo.face(f);
                let mut corners = [0u32; 3];
                for (i, &v) in face.vertices.iter().enumerate() {
                    let position = self.topo.vertex(v).position;
                    let index = *dedup.entry(point_key(&position)).or_insert_with(|| {
                        vertex_faces.push(Vec::new());
                        mesh.push_vertex(position)
                    });
                    // swapping the first two corners flips orientation
                    let slot = if must_invert {
                        match i {
                            0 => 1,
                            1 => 0,
                            _ => 2,
                        }
                    } else {
                        i
                    };
                    corners[slot] = index;
                }
                let face_index = mesh.faces.len() as u32;
                mesh.faces.push(corners);
                for &c in &corners {
                    vertex_faces[c as usize].push(face_index);
                }
            }
        }

        info!(
            region = %mesh.name,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            inverted = inverted_sources,
            "composed region surface"
        );

        Ok(ComposeResult {
            mesh,
            vertex_faces,
            inverted_sources,
        })
    }
}
