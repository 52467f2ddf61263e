//! The shape-set root: labeled shapes, mesh fragments, and their borders.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use tracing::debug;

use crate::border::BorderIndex;
use crate::error::{ShapeSetError, ShapeSetResult};
use crate::geom::Aabb;
use crate::ids::{MeshId, ShapeId};
use crate::mesh::Mesh;
use crate::topology::{EdgeId, Topology, VertexId};
use crate::trimesh::TriMesh;

/// A collection of mesh fragments partitioning a volume into labeled
/// regions, together with the index of the borders they share.
#[derive(Debug)]
pub struct ShapeSet {
    /// Set name, carried through save/load.
    pub name: String,

    /// Shape labels by shape id.
    pub shapes: BTreeMap<ShapeId, String>,

    /// Mesh fragments by mesh id.
    pub meshes: BTreeMap<MeshId, Mesh>,

    pub(crate) topo: Topology,
    pub(crate) borders: BorderIndex,
}

impl ShapeSet {
    /// Build a shape set from flat triangle meshes. Each mesh's name must be
    /// a mesh id string (`"a-b"`), and face indices must be in range.
    ///
    /// The meshes are lowered into the shared topology arena: one vertex
    /// entity per position entry, one edge per unordered vertex pair, one
    /// face per index triple, all cross-referenced.
    pub fn new(
        name: impl Into<String>,
        shapes: BTreeMap<ShapeId, String>,
        tri_meshes: Vec<TriMesh>,
    ) -> ShapeSetResult<Self> {
        let mut topo = Topology::new();
        let mut meshes = BTreeMap::new();

        for tm in tri_meshes {
            let id: MeshId = tm.name.parse()?;
            let mesh = lower_tri_mesh(&mut topo, id, &tm)?;
            debug!(
                mesh = %id,
                vertices = mesh.vertex_count(),
                faces = mesh.face_count(),
                "lowered mesh into topology"
            );
            meshes.insert(id, mesh);
        }

        let mut ss = Self {
            name: name.into(),
            shapes,
            meshes,
            topo,
            borders: BorderIndex::new(),
        };
        let ShapeSet { meshes, topo, .. } = &mut ss;
        for mesh in meshes.values_mut() {
            mesh.reindex(topo);
        }
        Ok(ss)
    }

    /// Read access to the topology arena.
    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    /// Read access to the border index.
    #[inline]
    pub fn borders(&self) -> &BorderIndex {
        &self.borders
    }

    /// The union bounding box of all meshes, or `None` if every mesh is
    /// empty.
    pub fn bounding_box(&self) -> Option<Aabb> {
        let mut result: Option<Aabb> = None;
        for mesh in self.meshes.values() {
            if let Some(bb) = mesh.bounding_box {
                result = Some(match result {
                    Some(acc) => acc.union(&bb),
                    None => bb,
                });
            }
        }
        result
    }

    /// Transform the whole set so its bounding box is centered on the origin
    /// and its largest dimension equals `max_dimension`: translate by the
    /// negated center, then scale uniformly. Applied once per unique vertex.
    pub fn scale_and_center(&mut self, max_dimension: f64) {
        let Some(bb) = self.bounding_box() else {
            return;
        };
        let current = bb.max_dimension();
        if current <= 0.0 {
            return;
        }
        let center = bb.center();
        let factor = max_dimension / current;

        let ShapeSet { meshes, topo, .. } = self;
        let mut seen: HashSet<VertexId> = HashSet::new();
        for mesh in meshes.values_mut() {
            for &v in &mesh.vertices {
                if seen.insert(v) {
                    let p = &mut topo.vertex_mut(v).position;
                    *p = Point3::from((*p - center) * factor);
                }
            }
            mesh.refresh_bounds(topo);
        }
    }

    /// Extract a mesh back out as a flat triangle mesh, in container order.
    /// The mesh must be reindexed first; stale locations are a logic fault.
    pub fn extract_tri_mesh(&self, id: MeshId) -> Option<TriMesh> {
        let mesh = self.meshes.get(&id)?;
        let mut tm = TriMesh::new(id.to_string());
        tm.positions = mesh
            .vertices
            .iter()
            .map(|&v| self.topo.vertex(v).position)
            .collect();
        tm.faces = mesh
            .faces
            .iter()
            .map(|&f| {
                let face = self.topo.face(f);
                let corner = |v| mesh.position_of(&self.topo, v) as u32;
                [
                    corner(face.vertices[0]),
                    corner(face.vertices[1]),
                    corner(face.vertices[2]),
                ]
            })
            .collect();
        Some(tm)
    }

    /// Merge a secondary vertex into a canonical one: move the secondary's
    /// faces and edges onto the canonical vertex, point the secondary mesh's
    /// container slot at the canonical vertex, and extend the canonical
    /// vertex's mesh-location map. No-op when both handles are the same
    /// vertex (a previous run already merged them).
    pub(crate) fn merge_shared_vertices(&mut self, canonical: VertexId, secondary: VertexId) {
        if canonical == secondary {
            return;
        }
        let ShapeSet { meshes, topo, .. } = self;
        topo.transfer_vertex(secondary, canonical);

        let secondary_locations: HashMap<MeshId, usize> =
            std::mem::take(&mut topo.vertex_mut(secondary).locations);
        for (mesh_id, index) in secondary_locations {
            if let Some(mesh) = meshes.get_mut(&mesh_id) {
                mesh.vertices[index] = canonical;
            }
            topo.vertex_mut(canonical).locations.insert(mesh_id, index);
        }
    }

    /// Reindex every mesh (locations and bounding boxes).
    pub(crate) fn reindex_all(&mut self) {
        let ShapeSet { meshes, topo, .. } = self;
        for mesh in meshes.values_mut() {
            mesh.reindex(topo);
        }
    }
}

/// Lower one flat triangle mesh into the arena: vertices, deduplicated
/// edges, faces.
fn lower_tri_mesh(topo: &mut Topology, id: MeshId, tm: &TriMesh) -> ShapeSetResult<Mesh> {
    let vertices: Vec<VertexId> = tm
        .positions
        .iter()
        .map(|&p| topo.new_vertex(p))
        .collect();

    let mut edge_map: HashMap<(VertexId, VertexId), EdgeId> = HashMap::new();
    let mut edge_between = |topo: &mut Topology, a: VertexId, b: VertexId| -> EdgeId {
        let key = if a < b { (a, b) } else { (b, a) };
        *edge_map.entry(key).or_insert_with(|| topo.new_edge(a, b))
    };

    let mut faces = Vec::with_capacity(tm.faces.len());
    for (face_index, &[i, j, k]) in tm.faces.iter().enumerate() {
        let fetch = |idx: u32| -> ShapeSetResult<VertexId> {
            vertices.get(idx as usize).copied().ok_or_else(|| {
                ShapeSetError::MalformedMesh {
                    mesh: id.to_string(),
                    details: format!(
                        "face {face_index} references vertex {idx} but the mesh has {} vertices",
                        vertices.len()
                    ),
                }
            })
        };
        let (va, vb, vc) = (fetch(i)?, fetch(j)?, fetch(k)?);
        if va == vb || vb == vc || va == vc {
            return Err(ShapeSetError::MalformedMesh {
                mesh: id.to_string(),
                details: format!("face {face_index} repeats a vertex"),
            });
        }
        let ea = edge_between(topo, va, vb);
        let eb = edge_between(topo, vb, vc);
        let ec = edge_between(topo, vc, va);
        faces.push(topo.new_face(id, [va, vb, vc], [ea, eb, ec]));
    }

    Ok(Mesh::new(id, vertices, faces, topo))
}
