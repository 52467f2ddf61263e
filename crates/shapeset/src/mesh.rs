//! A mesh fragment: ordered vertex and face containers over the shared
//! topology arena.

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};

use crate::geom::Aabb;
use crate::ids::{BorderId, MeshId};
use crate::topology::{EdgeId, FaceId, Topology, VertexId};

/// One mesh fragment of a shape set.
///
/// The containers are ordered: a vertex's index in `vertices` is its
/// position in the mesh's buffers at the I/O boundary, mirrored into the
/// vertex's mesh-location map by [`reindex`](Mesh::reindex).
#[derive(Debug)]
pub struct Mesh {
    /// The pair of shapes this fragment separates; also the mesh name.
    pub id: MeshId,

    /// Ordered vertex handles. After border indexing, entries on a shared
    /// border refer to the same vertices as the other participating meshes.
    pub vertices: Vec<VertexId>,

    /// Ordered face handles.
    pub faces: Vec<FaceId>,

    /// Cached bounding box; refreshed by [`reindex`](Mesh::reindex).
    pub bounding_box: Option<Aabb>,

    /// The borders this mesh participates in.
    pub borders: BTreeSet<BorderId>,
}

impl Mesh {
    pub(crate) fn new(
        id: MeshId,
        vertices: Vec<VertexId>,
        faces: Vec<FaceId>,
        topo: &Topology,
    ) -> Self {
        let bounding_box =
            Aabb::from_points(vertices.iter().map(|&v| topo.vertex(v).position));
        Self {
            id,
            vertices,
            faces,
            bounding_box,
            borders: BTreeSet::new(),
        }
    }

    /// Number of vertices in this mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces in this mesh.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Assign every vertex its current container position (updating its
    /// mesh-location map entry for this mesh) and refresh the bounding box.
    pub fn reindex(&mut self, topo: &mut Topology) {
        for (i, &v) in self.vertices.iter().enumerate() {
            topo.vertex_mut(v).locations.insert(self.id, i);
        }
        self.refresh_bounds(topo);
    }

    /// Recompute the cached bounding box from current vertex positions.
    pub fn refresh_bounds(&mut self, topo: &Topology) {
        self.bounding_box =
            Aabb::from_points(self.vertices.iter().map(|&v| topo.vertex(v).position));
    }

    /// The bounding box of a subset of vertices.
    pub fn subset_bounding_box(&self, topo: &Topology, verts: &[VertexId]) -> Option<Aabb> {
        Aabb::from_points(verts.iter().map(|&v| topo.vertex(v).position))
    }

    /// The container position of a vertex in this mesh. The vertex must be
    /// indexed here; a missing entry is a logic fault.
    pub fn position_of(&self, topo: &Topology, v: VertexId) -> usize {
        topo.vertex(v)
            .locations
            .get(&self.id)
            .copied()
            .unwrap_or_else(|| panic!("vertex {v:?} is not indexed in mesh {}", self.id))
    }

    /// Identify the boundaries of this mesh: ordered vertex runs along edges
    /// that have exactly one incident face *in this mesh*.
    ///
    /// Open chains are emitted before closed loops; traversal starts from the
    /// lowest-container-index endpoint (or loop vertex) and steps toward the
    /// smaller-index neighbor first, so the result is deterministic for a
    /// given container order.
    pub fn identify_boundaries(&self, topo: &Topology) -> Vec<Vec<VertexId>> {
        // Count this mesh's faces per edge.
        let mut face_counts: HashMap<EdgeId, u32> = HashMap::new();
        for &f in &self.faces {
            for &e in &topo.face(f).edges {
                *face_counts.entry(e).or_insert(0) += 1;
            }
        }

        // Adjacency between boundary vertices along boundary edges, each
        // neighbor list sorted by container index.
        let mut adjacency: HashMap<VertexId, Vec<(VertexId, EdgeId)>> = HashMap::new();
        for (&e, &count) in &face_counts {
            if count != 1 {
                continue;
            }
            let (v1, v2) = topo.edge(e).endpoints();
            adjacency.entry(v1).or_default().push((v2, e));
            adjacency.entry(v2).or_default().push((v1, e));
        }
        for neighbors in adjacency.values_mut() {
            neighbors.sort_by_key(|&(v, _)| self.position_of(topo, v));
        }

        let mut starts: Vec<VertexId> = adjacency.keys().copied().collect();
        starts.sort_by_key(|&v| self.position_of(topo, v));

        let mut visited: HashSet<EdgeId> = HashSet::new();
        let mut boundaries = Vec::new();

        // Chains first: walks beginning at a degree-one endpoint.
        for &start in &starts {
            if adjacency[&start].len() == 1 {
                let walk = self.walk_boundary(&adjacency, &mut visited, start);
                if walk.len() > 1 {
                    boundaries.push(walk);
                }
            }
        }
        // Then loops: anything with unvisited boundary edges left.
        for &start in &starts {
            if adjacency[&start].iter().any(|&(_, e)| !visited.contains(&e)) {
                let walk = self.walk_boundary(&adjacency, &mut visited, start);
                if walk.len() > 1 {
                    boundaries.push(walk);
                }
            }
        }

        boundaries
    }

    fn walk_boundary(
        &self,
        adjacency: &HashMap<VertexId, Vec<(VertexId, EdgeId)>>,
        visited: &mut HashSet<EdgeId>,
        start: VertexId,
    ) -> Vec<VertexId> {
        let mut path = vec![start];
        let mut current = start;
        loop {
            let Some(&(next, via)) = adjacency[&current]
                .iter()
                .find(|&&(_, e)| !visited.contains(&e))
            else {
                break;
            };
            visited.insert(via);
            if next == start {
                // the loop closed; the start vertex is not repeated
                break;
            }
            path.push(next);
            current = next;
        }
        path
    }
}
