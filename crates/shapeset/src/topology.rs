//! Shared topology entities: vertices, edges, and faces with reciprocal
//! references.
//!
//! Entities live in one arena for the whole shape set and are addressed by
//! integer handles; meshes and borders hold ordered lists of handles. After
//! border indexing a vertex or edge on a shared boundary curve is a single
//! entity referenced from every participating mesh, which is what makes the
//! Vertex <-> Edge <-> Face reference graph cyclic and rules out direct
//! ownership between entities.
//!
//! Every mutator maintains reciprocity: an edge is listed by both of its
//! endpoint vertices, a face by its three corner vertices and its three
//! edges. A violated precondition is a logic fault and panics; the more
//! expensive post-condition re-checks only run with `DEBUG_LEVEL >= 1`.

use hashbrown::HashMap;
use nalgebra::Point3;

use crate::debug::assert_invariant;
use crate::geom::Quadric;
use crate::ids::{BorderId, MeshId};

/// Handle to a [`Vertex`] in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(u32);

/// Handle to an [`Edge`] in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(u32);

/// Handle to a [`Face`] in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId(u32);

impl VertexId {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

impl FaceId {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A mesh vertex, possibly shared between meshes along a border.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// 3D position.
    pub position: Point3<f64>,

    /// Where this vertex sits in each mesh that contains it: one entry per
    /// mesh, kept current by [`Mesh::reindex`](crate::mesh::Mesh::reindex).
    pub locations: HashMap<MeshId, usize>,

    /// Incident edges.
    pub edges: Vec<EdgeId>,

    /// Incident faces.
    pub faces: Vec<FaceId>,

    /// The border this vertex lies on, if any. A vertex belongs to at most
    /// one border.
    pub border: Option<BorderId>,

    /// Set when an edge collapse absorbed this vertex into another.
    pub collapsed_into: Option<VertexId>,

    /// Accumulated error quadric (simplification only).
    pub q: Quadric,
}

/// An edge between two vertices.
///
/// Within a single closed mesh an edge has exactly two incident faces; a
/// merged border edge carries one face per participating mesh.
#[derive(Debug, Clone)]
pub struct Edge {
    v1: VertexId,
    v2: VertexId,

    /// Incident faces.
    pub faces: Vec<FaceId>,

    /// The border that owns this edge, if any.
    pub border: Option<BorderId>,

    /// Position an edge collapse would move the surviving vertex to.
    pub collapse_target: Point3<f64>,

    /// Summed endpoint quadric (simplification only).
    pub q: Quadric,

    /// Error of `collapse_target` under `q`.
    pub error: f64,

    /// Set when the edge has been collapsed away.
    pub collapsed: bool,

    /// Set when a collapse attempt found this edge unsafe to collapse.
    pub protected: bool,
}

impl Edge {
    /// First endpoint.
    #[inline]
    pub fn v1(&self) -> VertexId {
        self.v1
    }

    /// Second endpoint.
    #[inline]
    pub fn v2(&self) -> VertexId {
        self.v2
    }

    /// Both endpoints.
    #[inline]
    pub fn endpoints(&self) -> (VertexId, VertexId) {
        (self.v1, self.v2)
    }

    /// Whether `v` is one of the endpoints.
    #[inline]
    pub fn references_vertex(&self, v: VertexId) -> bool {
        self.v1 == v || self.v2 == v
    }

    /// The endpoint that is not `v`. Panics if `v` is not an endpoint.
    pub fn other_endpoint(&self, v: VertexId) -> VertexId {
        if self.v1 == v {
            self.v2
        } else if self.v2 == v {
            self.v1
        } else {
            panic!("vertex {v:?} is not an endpoint of this edge");
        }
    }

    /// Whether the two edges connect the same unordered vertex pair.
    pub fn same_endpoints(&self, other: &Edge) -> bool {
        (self.v1 == other.v1 && self.v2 == other.v2)
            || (self.v1 == other.v2 && self.v2 == other.v1)
    }
}

/// A triangle belonging to one mesh fragment.
#[derive(Debug, Clone)]
pub struct Face {
    /// The mesh this face belongs to.
    pub mesh: MeshId,

    /// Corner vertices, counter-clockwise from the front.
    pub vertices: [VertexId; 3],

    /// The edges between consecutive corners.
    pub edges: [EdgeId; 3],

    /// Plane quadric, computed lazily during simplification setup.
    /// Degenerate faces get the zero quadric.
    pub kp: Option<Quadric>,

    /// Set when an edge collapse removed this face.
    pub collapsed: bool,
}

impl Face {
    /// Whether `e` is one of this face's edges.
    #[inline]
    pub fn references_edge(&self, e: EdgeId) -> bool {
        self.edges.contains(&e)
    }

    /// Whether `v` is one of this face's corners.
    #[inline]
    pub fn references_vertex(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }
}

/// The entity arena shared by all meshes of a shape set.
#[derive(Debug, Default)]
pub struct Topology {
    verts: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.verts[v.idx()]
    }

    #[inline]
    pub fn vertex_mut(&mut self, v: VertexId) -> &mut Vertex {
        &mut self.verts[v.idx()]
    }

    #[inline]
    pub fn edge(&self, e: EdgeId) -> &Edge {
        &self.edges[e.idx()]
    }

    #[inline]
    pub fn edge_mut(&mut self, e: EdgeId) -> &mut Edge {
        &mut self.edges[e.idx()]
    }

    #[inline]
    pub fn face(&self, f: FaceId) -> &Face {
        &self.faces[f.idx()]
    }

    #[inline]
    pub fn face_mut(&mut self, f: FaceId) -> &mut Face {
        &mut self.faces[f.idx()]
    }

    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Allocate a new vertex.
    pub fn new_vertex(&mut self, position: Point3<f64>) -> VertexId {
        self.verts.push(Vertex {
            position,
            locations: HashMap::new(),
            edges: Vec::new(),
            faces: Vec::new(),
            border: None,
            collapsed_into: None,
            q: Quadric::default(),
        });
        VertexId((self.verts.len() - 1) as u32)
    }

    /// Allocate a new edge between two distinct vertices and register it with
    /// both endpoints. The stored endpoint order is canonical by handle.
    pub fn new_edge(&mut self, a: VertexId, b: VertexId) -> EdgeId {
        if a == b {
            panic!("edge endpoints must be distinct");
        }
        let (v1, v2) = if a < b { (a, b) } else { (b, a) };
        self.edges.push(Edge {
            v1,
            v2,
            faces: Vec::new(),
            border: None,
            collapse_target: Point3::origin(),
            q: Quadric::default(),
            error: 0.0,
            collapsed: false,
            protected: false,
        });
        let e = EdgeId((self.edges.len() - 1) as u32);
        self.add_edge_to_vertex(v1, e);
        self.add_edge_to_vertex(v2, e);
        e
    }

    /// Allocate a new face and register it with its corner vertices and
    /// edges.
    pub fn new_face(
        &mut self,
        mesh: MeshId,
        vertices: [VertexId; 3],
        edges: [EdgeId; 3],
    ) -> FaceId {
        self.faces.push(Face {
            mesh,
            vertices,
            edges,
            kp: None,
            collapsed: false,
        });
        let f = FaceId((self.faces.len() - 1) as u32);
        for v in vertices {
            self.add_face_to_vertex(v, f);
        }
        for e in edges {
            self.add_face_to_edge(e, f);
        }
        f
    }

    /// Register an edge with a vertex.
    pub fn add_edge_to_vertex(&mut self, v: VertexId, e: EdgeId) {
        self.verts[v.idx()].edges.push(e);
        let vert = &self.verts[v.idx()];
        assert_invariant("vertex references added edge exactly once", || {
            vert.edges.iter().filter(|&&x| x == e).count() == 1
        });
    }

    /// Detach an edge from a vertex. The vertex must reference the edge.
    pub fn remove_edge_from_vertex(&mut self, v: VertexId, e: EdgeId) {
        let vert = &mut self.verts[v.idx()];
        match vert.edges.iter().position(|&x| x == e) {
            Some(i) => {
                vert.edges.remove(i);
            }
            None => panic!("vertex {v:?} does not reference edge {e:?}"),
        }
        let vert = &self.verts[v.idx()];
        assert_invariant("vertex no longer references removed edge", || {
            !vert.edges.contains(&e)
        });
    }

    /// Register a face with a vertex.
    pub fn add_face_to_vertex(&mut self, v: VertexId, f: FaceId) {
        self.verts[v.idx()].faces.push(f);
        let vert = &self.verts[v.idx()];
        assert_invariant("vertex references added face exactly once", || {
            vert.faces.iter().filter(|&&x| x == f).count() == 1
        });
    }

    /// Detach a face from a vertex. The vertex must reference the face.
    pub fn remove_face_from_vertex(&mut self, v: VertexId, f: FaceId) {
        let vert = &mut self.verts[v.idx()];
        match vert.faces.iter().position(|&x| x == f) {
            Some(i) => {
                vert.faces.remove(i);
            }
            None => panic!("vertex {v:?} does not reference face {f:?}"),
        }
    }

    /// Register a face with an edge.
    pub fn add_face_to_edge(&mut self, e: EdgeId, f: FaceId) {
        self.edges[e.idx()].faces.push(f);
        let edge = &self.edges[e.idx()];
        assert_invariant("edge references added face exactly once", || {
            edge.faces.iter().filter(|&&x| x == f).count() == 1
        });
    }

    /// Detach a face from an edge. The edge must reference the face.
    pub fn remove_face_from_edge(&mut self, e: EdgeId, f: FaceId) {
        let edge = &mut self.edges[e.idx()];
        match edge.faces.iter().position(|&x| x == f) {
            Some(i) => {
                edge.faces.remove(i);
            }
            None => panic!("edge {e:?} does not reference face {f:?}"),
        }
    }

    /// Rewrite one endpoint of an edge. `old` must be an endpoint and `new`
    /// must not already be one.
    pub fn replace_vertex_in_edge(&mut self, e: EdgeId, old: VertexId, new: VertexId) {
        let edge = &mut self.edges[e.idx()];
        if edge.v1 == old {
            edge.v1 = new;
        } else if edge.v2 == old {
            edge.v2 = new;
        } else {
            panic!("vertex {old:?} is not an endpoint of edge {e:?}");
        }
        let edge = &self.edges[e.idx()];
        assert_invariant("edge references replacement vertex exactly once", || {
            (edge.v1 == new) != (edge.v2 == new) && edge.v1 != old && edge.v2 != old
        });
    }

    /// Rewrite one corner of a face. `old` must be a corner and `new` must
    /// not already be one.
    pub fn replace_vertex_in_face(&mut self, f: FaceId, old: VertexId, new: VertexId) {
        let face = &mut self.faces[f.idx()];
        match face.vertices.iter().position(|&x| x == old) {
            Some(i) => face.vertices[i] = new,
            None => panic!("vertex {old:?} is not a corner of face {f:?}"),
        }
        let face = &self.faces[f.idx()];
        assert_invariant("face references replacement vertex exactly once", || {
            face.vertices.iter().filter(|&&x| x == new).count() == 1
                && !face.vertices.contains(&old)
        });
    }

    /// Rewrite one edge slot of a face. `old` must be present and `new` must
    /// not already be.
    pub fn replace_edge_in_face(&mut self, f: FaceId, old: EdgeId, new: EdgeId) {
        let face = &mut self.faces[f.idx()];
        match face.edges.iter().position(|&x| x == old) {
            Some(i) => face.edges[i] = new,
            None => panic!("edge {old:?} is not an edge of face {f:?}"),
        }
        let face = &self.faces[f.idx()];
        assert_invariant("face references replacement edge exactly once", || {
            face.edges.iter().filter(|&&x| x == new).count() == 1 && !face.edges.contains(&old)
        });
    }

    /// Merge duplicate edges into `winner`. All `losers` must connect the
    /// same unordered vertex pair as `winner`; their faces move to the
    /// winner and the losers are detached from both endpoint vertices.
    pub fn merge_edges(&mut self, winner: EdgeId, losers: &[EdgeId]) {
        for &loser in losers {
            assert_invariant("merged edges share the same endpoints", || {
                self.edges[winner.idx()].same_endpoints(&self.edges[loser.idx()])
            });

            for f in self.edges[loser.idx()].faces.clone() {
                self.add_face_to_edge(winner, f);
                self.replace_edge_in_face(f, loser, winner);
            }
            let (a, b) = self.edges[loser.idx()].endpoints();
            self.remove_edge_from_vertex(a, loser);
            self.remove_edge_from_vertex(b, loser);
            self.edges[loser.idx()].faces.clear();
        }
    }

    /// Move every face and edge reference of `from` onto `to`, rewriting
    /// corners and endpoints. `from` ends up detached from everything.
    pub fn transfer_vertex(&mut self, from: VertexId, to: VertexId) {
        for f in self.verts[from.idx()].faces.clone() {
            self.replace_vertex_in_face(f, from, to);
            self.add_face_to_vertex(to, f);
        }
        for e in self.verts[from.idx()].edges.clone() {
            self.replace_vertex_in_edge(e, from, to);
            self.add_edge_to_vertex(to, e);
        }
        let from = &mut self.verts[from.idx()];
        from.faces.clear();
        from.edges.clear();
    }

    /// Clear every border back-reference on vertices and edges. Used when
    /// the border index is rebuilt.
    pub(crate) fn clear_border_links(&mut self) {
        for v in &mut self.verts {
            v.border = None;
        }
        self.clear_edge_borders();
    }

    /// Clear the border back-reference on every edge. Used before border
    /// edges are re-inferred.
    pub(crate) fn clear_edge_borders(&mut self) {
        for e in &mut self.edges {
            e.border = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ShapeId;

    fn mesh_id() -> MeshId {
        MeshId::new(ShapeId(1), ShapeId(2))
    }

    fn triangle(topo: &mut Topology) -> (VertexId, VertexId, VertexId, FaceId) {
        let a = topo.new_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = topo.new_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = topo.new_vertex(Point3::new(0.0, 1.0, 0.0));
        let ab = topo.new_edge(a, b);
        let bc = topo.new_edge(b, c);
        let ca = topo.new_edge(c, a);
        let f = topo.new_face(mesh_id(), [a, b, c], [ab, bc, ca]);
        (a, b, c, f)
    }

    #[test]
    fn new_face_establishes_reciprocity() {
        let mut topo = Topology::new();
        let (a, b, c, f) = triangle(&mut topo);

        for v in [a, b, c] {
            assert!(topo.vertex(v).faces.contains(&f));
            assert_eq!(topo.vertex(v).edges.len(), 2);
        }
        for &e in &topo.face(f).edges {
            assert!(topo.edge(e).faces.contains(&f));
            let (v1, v2) = topo.edge(e).endpoints();
            assert!(topo.vertex(v1).edges.contains(&e));
            assert!(topo.vertex(v2).edges.contains(&e));
        }
    }

    #[test]
    fn edge_endpoints_are_canonical() {
        let mut topo = Topology::new();
        let a = topo.new_vertex(Point3::origin());
        let b = topo.new_vertex(Point3::origin());
        let e = topo.new_edge(b, a);
        assert_eq!(topo.edge(e).v1(), a);
        assert_eq!(topo.edge(e).v2(), b);
        assert_eq!(topo.edge(e).other_endpoint(a), b);
    }

    #[test]
    #[should_panic(expected = "does not reference edge")]
    fn removing_an_unreferenced_edge_is_a_logic_fault() {
        let mut topo = Topology::new();
        let a = topo.new_vertex(Point3::origin());
        let b = topo.new_vertex(Point3::origin());
        let c = topo.new_vertex(Point3::origin());
        let e = topo.new_edge(a, b);
        topo.remove_edge_from_vertex(c, e);
    }

    #[test]
    fn merge_edges_moves_faces_and_detaches_losers() {
        let mut topo = Topology::new();
        let a = topo.new_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = topo.new_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = topo.new_vertex(Point3::new(0.0, 1.0, 0.0));
        let d = topo.new_vertex(Point3::new(0.0, -1.0, 0.0));

        // Two duplicate a-b edges, each with its own triangle
        let ab1 = topo.new_edge(a, b);
        let ab2 = topo.new_edge(a, b);
        let bc = topo.new_edge(b, c);
        let ca = topo.new_edge(c, a);
        let bd = topo.new_edge(b, d);
        let da = topo.new_edge(d, a);
        let f1 = topo.new_face(mesh_id(), [a, b, c], [ab1, bc, ca]);
        let f2 = topo.new_face(mesh_id(), [a, b, d], [ab2, bd, da]);

        topo.merge_edges(ab1, &[ab2]);

        assert_eq!(topo.edge(ab1).faces, vec![f1, f2]);
        assert!(topo.edge(ab2).faces.is_empty());
        assert!(!topo.vertex(a).edges.contains(&ab2));
        assert!(!topo.vertex(b).edges.contains(&ab2));
        assert!(topo.face(f2).references_edge(ab1));
    }

    #[test]
    fn transfer_vertex_rewrites_references() {
        let mut topo = Topology::new();
        let (a, _, _, f) = triangle(&mut topo);
        let a2 = topo.new_vertex(Point3::new(0.0, 0.0, 5.0));

        let a_edges = topo.vertex(a).edges.clone();
        topo.transfer_vertex(a, a2);

        assert!(topo.vertex(a).edges.is_empty());
        assert!(topo.vertex(a).faces.is_empty());
        assert!(topo.face(f).references_vertex(a2));
        for e in a_edges {
            assert!(topo.edge(e).references_vertex(a2));
            assert!(topo.vertex(a2).edges.contains(&e));
        }
    }
}
