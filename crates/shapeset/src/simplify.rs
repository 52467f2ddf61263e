//! Quadric edge-collapse simplification of border curves.
//!
//! Border vertices accumulate the plane quadrics of their incident faces;
//! each border edge gets the summed endpoint quadric, an optimal collapse
//! target, and the error at that target. Edges are processed per border
//! through a min-heap ordered by error. A collapse retains one endpoint,
//! folds the other into it across every participating mesh, and re-heaps the
//! edges whose error changed. Collapses that would corrupt border topology
//! or create non-manifold geometry mark the edge protected and do nothing.
//!
//! Borders never share a vertex, so they are independent; within a border
//! processing is strictly sequential to keep the heap consistent.

use hashbrown::{HashMap, HashSet};
use tracing::{debug, info};

use crate::border::BorderIndex;
use crate::geom::{collapse_target, plane_quadric, Quadric};
use crate::ids::BorderId;
use crate::shapeset::ShapeSet;
use crate::topology::{EdgeId, FaceId, Topology, VertexId};

/// Parameters for border simplification.
#[derive(Debug, Clone)]
pub struct SimplifyParams {
    /// Collapses stop on a border once the cheapest remaining edge exceeds
    /// this error.
    pub error_threshold: f64,

    /// Fraction of each border's edges to attempt to collapse (0.0 to 1.0).
    pub aggressiveness: f64,

    /// Subtracted from each border's collapse budget; short borders with a
    /// budget at or below zero are left alone.
    pub forgiveness: usize,
}

impl Default for SimplifyParams {
    fn default() -> Self {
        Self {
            error_threshold: 1.0,
            aggressiveness: 0.75,
            forgiveness: 10,
        }
    }
}

/// Result of a border simplification pass.
#[derive(Debug, Clone, Default)]
pub struct SimplifyResult {
    /// Number of edges collapsed.
    pub collapses_performed: usize,

    /// Number of collapse attempts rejected by a safety predicate.
    pub collapses_rejected: usize,

    /// Number of borders that had a heap processed.
    pub borders_processed: usize,

    /// Vertices removed from meshes in the post-pass.
    pub vertices_removed: usize,

    /// Faces removed from meshes in the post-pass.
    pub faces_removed: usize,
}

impl ShapeSet {
    /// Reduce vertex count along every border by quadric edge collapse,
    /// constrained so every participating mesh stays manifold.
    pub fn simplify_borders(&mut self, params: &SimplifyParams) -> SimplifyResult {
        info!(
            borders = self.borders.len(),
            error_threshold = params.error_threshold,
            aggressiveness = params.aggressiveness,
            forgiveness = params.forgiveness,
            "simplifying borders"
        );
        let mut result = SimplifyResult::default();

        // Setup: plane quadrics for faces around border vertices, summed
        // into vertex quadrics, then per-border edge heaps.
        let border_ids: Vec<BorderId> = self.borders.iter().map(|b| b.id).collect();
        self.compute_border_quadrics(&border_ids);

        let mut heaps = Vec::with_capacity(border_ids.len());
        for &bid in &border_ids {
            let Some(border) = self.borders.border_for(bid) else {
                continue;
            };
            let edges = border.edges.clone();
            if edges.is_empty() {
                continue;
            }
            for &e in &edges {
                recalculate_edge(&mut self.topo, e);
            }
            heaps.push((bid, EdgeHeap::from_edges(&self.topo, edges)));
        }

        // Main loop, one border at a time.
        for (bid, mut heap) in heaps {
            let budget = collapse_budget(heap.len(), params.aggressiveness, params.forgiveness);
            if budget == 0 {
                continue;
            }
            result.borders_processed += 1;

            for _ in 0..budget {
                let Some(e) = heap.pop(&self.topo) else {
                    break;
                };
                if self.topo.edge(e).error > params.error_threshold {
                    // remaining edges are all more expensive
                    break;
                }
                let ShapeSet { topo, borders, .. } = self;
                let outcome = collapse_edge(topo, borders, e);
                if outcome.performed {
                    result.collapses_performed += 1;
                } else {
                    result.collapses_rejected += 1;
                }
                heap.update_edges(&self.topo, &outcome.affected);
            }
            debug!(border = %bid, remaining = heap.len(), "border simplified");
        }

        // Post-pass: drop collapsed faces and absorbed vertices, reindex.
        let ShapeSet { meshes, topo, .. } = self;
        for mesh in meshes.values_mut() {
            let faces_before = mesh.faces.len();
            mesh.faces.retain(|&f| !topo.face(f).collapsed);
            result.faces_removed += faces_before - mesh.faces.len();

            let vertices_before = mesh.vertices.len();
            mesh.vertices
                .retain(|&v| topo.vertex(v).collapsed_into.is_none());
            result.vertices_removed += vertices_before - mesh.vertices.len();

            mesh.reindex(topo);
        }

        info!(
            performed = result.collapses_performed,
            rejected = result.collapses_rejected,
            vertices_removed = result.vertices_removed,
            "border simplification finished"
        );
        result
    }

    /// Compute `Kp` for every face incident to a border vertex and sum the
    /// incident-face quadrics into each border vertex.
    fn compute_border_quadrics(&mut self, border_ids: &[BorderId]) {
        let mut border_vertices: Vec<VertexId> = Vec::new();
        for &bid in border_ids {
            if let Some(border) = self.borders.border_for(bid) {
                border_vertices.extend(border.vertices.iter().copied());
            }
        }

        for &v in &border_vertices {
            for f in self.topo.vertex(v).faces.clone() {
                if self.topo.face(f).kp.is_none() {
                    let corners = self.topo.face(f).vertices;
                    let [p0, p1, p2] =
                        corners.map(|c| self.topo.vertex(c).position);
                    // degenerate faces contribute the zero quadric
                    let kp = plane_quadric(&p0, &p1, &p2).unwrap_or_default();
                    self.topo.face_mut(f).kp = Some(kp);
                }
            }
        }

        for &v in &border_vertices {
            let mut q = Quadric::default();
            for &f in &self.topo.vertex(v).faces {
                if let Some(kp) = &self.topo.face(f).kp {
                    q.add(kp);
                }
            }
            self.topo.vertex_mut(v).q = q;
        }
    }
}

/// The number of collapses to attempt on a border with `edge_count` edges.
fn collapse_budget(edge_count: usize, aggressiveness: f64, forgiveness: usize) -> usize {
    let goal = (edge_count as f64 * aggressiveness).floor() as i64 - forgiveness as i64;
    goal.max(0) as usize
}

/// Recompute an edge's summed quadric, collapse target, and error.
fn recalculate_edge(topo: &mut Topology, e: EdgeId) {
    let (v1, v2) = topo.edge(e).endpoints();
    let mut q = topo.vertex(v1).q;
    q.add(&topo.vertex(v2).q);
    let (target, error) =
        collapse_target(&q, &topo.vertex(v1).position, &topo.vertex(v2).position);
    let edge = topo.edge_mut(e);
    edge.q = q;
    edge.collapse_target = target;
    edge.error = error;
}

struct CollapseOutcome {
    performed: bool,
    /// Edges whose error changed and need re-heaping.
    affected: Vec<EdgeId>,
}

impl CollapseOutcome {
    fn rejected() -> Self {
        Self {
            performed: false,
            affected: Vec::new(),
        }
    }
}

/// Collapse an edge: retain `v1`, fold `v2` into it, delete the edge and its
/// incident faces, and graft the rest of `v2`'s topology onto `v1`.
///
/// Safety predicates mark the edge protected and reject the collapse:
/// 1. another edge of an incident face is itself a border edge;
/// 2. the endpoints belong to different borders;
/// 3. the endpoints share more than one linked neighbor in some mesh (a
///    non-manifold fin would result);
/// 4. the endpoints close a triangle of border edges through a third vertex.
fn collapse_edge(
    topo: &mut Topology,
    borders: &mut BorderIndex,
    e: EdgeId,
) -> CollapseOutcome {
    if topo.edge(e).protected {
        return CollapseOutcome::rejected();
    }
    if topo.edge(e).collapsed {
        panic!("edge {e:?} is already collapsed");
    }
    let (v1, v2) = topo.edge(e).endpoints();

    // 1. Collapsing an edge that shares a face with other border edges
    // causes border-topology complications that are easiest to avoid.
    let touches_other_border_edge = topo.edge(e).faces.iter().any(|&f| {
        topo.face(f)
            .edges
            .iter()
            .any(|&fe| fe != e && topo.edge(fe).border.is_some())
    });
    if touches_other_border_edge {
        topo.edge_mut(e).protected = true;
        return CollapseOutcome::rejected();
    }

    // 2. Collapsing across distinct borders would give the surviving vertex
    // faces from meshes it was not part of.
    if topo.vertex(v1).border != topo.vertex(v2).border {
        topo.edge_mut(e).protected = true;
        return CollapseOutcome::rejected();
    }

    // 3. In each mesh, count v2's neighbors (other than v1) that share a
    // face with v1; more than one means the collapse would pinch a fin.
    let v2_meshes: Vec<_> = topo.vertex(v2).locations.keys().copied().collect();
    for mesh_id in v2_meshes {
        let v1_faces: HashSet<FaceId> = topo
            .vertex(v1)
            .faces
            .iter()
            .copied()
            .filter(|&f| topo.face(f).mesh == mesh_id)
            .collect();
        let mut neighbors: HashSet<VertexId> = HashSet::new();
        for &f in &topo.vertex(v2).faces {
            if topo.face(f).mesh != mesh_id {
                continue;
            }
            for &c in &topo.face(f).vertices {
                if c != v2 && c != v1 {
                    neighbors.insert(c);
                }
            }
        }
        let link_count = neighbors
            .iter()
            .filter(|&&n| {
                topo.vertex(n)
                    .faces
                    .iter()
                    .any(|f| v1_faces.contains(f))
            })
            .count();
        if link_count > 1 {
            topo.edge_mut(e).protected = true;
            return CollapseOutcome::rejected();
        }
    }

    // 4. A triangle of border edges: both endpoints reach a common third
    // vertex along border edges other than `e`. Protect all three edges.
    // Two border edges between the same vertex pair would be an unmerged
    // duplicate, which the model rules out.
    let border_neighbors = |topo: &Topology, v: VertexId| -> HashMap<VertexId, EdgeId> {
        let mut map = HashMap::new();
        for &ve in &topo.vertex(v).edges {
            if ve != e && topo.edge(ve).border.is_some() {
                let neighbor = topo.edge(ve).other_endpoint(v);
                if map.insert(neighbor, ve).is_some() {
                    panic!("vertex {v:?} has two border edges to {neighbor:?}");
                }
            }
        }
        map
    };
    let via_v1 = border_neighbors(topo, v1);
    let via_v2 = border_neighbors(topo, v2);
    for (neighbor, &e1) in &via_v1 {
        if let Some(&e2) = via_v2.get(neighbor) {
            topo.edge_mut(e).protected = true;
            topo.edge_mut(e1).protected = true;
            topo.edge_mut(e2).protected = true;
            return CollapseOutcome::rejected();
        }
    }

    // The collapse is safe.
    topo.edge_mut(e).collapsed = true;
    if topo.vertex(v1).collapsed_into.is_some() || topo.vertex(v2).collapsed_into.is_some() {
        panic!("collapse of {e:?} touches an already-collapsed vertex");
    }
    topo.vertex_mut(v2).collapsed_into = Some(v1);

    topo.remove_edge_from_vertex(v1, e);
    topo.remove_edge_from_vertex(v2, e);

    // Delete the incident faces, merging each face's v2-side edge into its
    // v1-side edge.
    for f in topo.edge(e).faces.clone() {
        let mut v1e = None;
        let mut v2e = None;
        for &fe in &topo.face(f).edges {
            if fe == e {
                continue;
            } else if topo.edge(fe).references_vertex(v1) {
                v1e = Some(fe);
            } else if topo.edge(fe).references_vertex(v2) {
                v2e = Some(fe);
            } else {
                panic!("edge {fe:?} of face {f:?} touches neither endpoint of {e:?}");
            }
        }
        let (Some(v1e), Some(v2e)) = (v1e, v2e) else {
            panic!("face {f:?} of edge {e:?} is missing a side edge");
        };

        topo.face_mut(f).collapsed = true;
        topo.remove_face_from_edge(v1e, f);
        topo.remove_face_from_edge(v2e, f);
        for c in topo.face(f).vertices {
            topo.remove_face_from_vertex(c, f);
        }

        topo.edge_mut(v2e).collapsed = true;
        for v2ef in topo.edge(v2e).faces.clone() {
            if v2ef == f {
                continue;
            }
            topo.replace_edge_in_face(v2ef, v2e, v1e);
            topo.add_face_to_edge(v1e, v2ef);
        }
        topo.edge_mut(v2e).faces.clear();
        let (a, b) = topo.edge(v2e).endpoints();
        topo.remove_edge_from_vertex(a, v2e);
        topo.remove_edge_from_vertex(b, v2e);
    }
    topo.edge_mut(e).faces.clear();

    // Graft v2's remaining topology onto v1.
    for v2_edge in topo.vertex(v2).edges.clone() {
        if !topo.edge(v2_edge).collapsed {
            topo.replace_vertex_in_edge(v2_edge, v2, v1);
            topo.add_edge_to_vertex(v1, v2_edge);
        }
    }
    topo.vertex_mut(v2).edges.clear();
    for v2_face in topo.vertex(v2).faces.clone() {
        if !topo.face(v2_face).collapsed {
            topo.replace_vertex_in_face(v2_face, v2, v1);
            topo.add_face_to_vertex(v1, v2_face);
        }
    }
    topo.vertex_mut(v2).faces.clear();

    // Move v1 to the collapse target and fold in v2's quadric. The deleted
    // faces' planes end up double-counted, as in standard QEM accumulation.
    let target = topo.edge(e).collapse_target;
    topo.vertex_mut(v1).position = target;
    let q2 = topo.vertex(v2).q;
    topo.vertex_mut(v1).q.add(&q2);

    let mut affected = Vec::new();
    for v1_edge in topo.vertex(v1).edges.clone() {
        if topo.edge(v1_edge).border.is_some() {
            recalculate_edge(topo, v1_edge);
            affected.push(v1_edge);
        }
    }

    // Detach the collapsed pieces from the border.
    let Some(edge_border) = topo.edge(e).border else {
        panic!("collapsed edge {e:?} is not on a border");
    };
    borders.border_mut(edge_border).remove_edge(e);
    let Some(vertex_border) = topo.vertex(v2).border else {
        panic!("collapsed vertex {v2:?} is not on a border");
    };
    borders.border_mut(vertex_border).remove_vertex(v2);

    CollapseOutcome {
        performed: true,
        affected,
    }
}

/// Min-heap of border edges keyed by collapse error, with in-place
/// re-heapification for edges whose error changed.
struct EdgeHeap {
    entries: Vec<EdgeId>,
    positions: HashMap<EdgeId, usize>,
}

impl EdgeHeap {
    fn from_edges(topo: &Topology, edges: Vec<EdgeId>) -> Self {
        let mut heap = Self {
            positions: edges.iter().enumerate().map(|(i, &e)| (e, i)).collect(),
            entries: edges,
        };
        if heap.entries.len() > 1 {
            for i in (0..heap.entries.len() / 2).rev() {
                heap.sift_down(topo, i);
            }
        }
        heap
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the edge at `i` orders before the edge at `j`.
    /// Error ties break on the edge handle, keeping pops deterministic.
    fn less(&self, topo: &Topology, i: usize, j: usize) -> bool {
        let (a, b) = (self.entries[i], self.entries[j]);
        let (ea, eb) = (topo.edge(a).error, topo.edge(b).error);
        match ea.partial_cmp(&eb) {
            Some(std::cmp::Ordering::Less) => true,
            Some(std::cmp::Ordering::Greater) => false,
            _ => a < b,
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.entries.swap(i, j);
        self.positions.insert(self.entries[i], i);
        self.positions.insert(self.entries[j], j);
    }

    fn sift_up(&mut self, topo: &Topology, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(topo, i, parent) {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, topo: &Topology, mut i: usize) {
        loop {
            let mut smallest = i;
            for child in [2 * i + 1, 2 * i + 2] {
                if child < self.entries.len() && self.less(topo, child, smallest) {
                    smallest = child;
                }
            }
            if smallest == i {
                break;
            }
            self.swap(i, smallest);
            i = smallest;
        }
    }

    /// Pop the lowest-error edge.
    fn pop(&mut self, topo: &Topology) -> Option<EdgeId> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let popped = self.entries.pop()?;
        self.positions.remove(&popped);
        if !self.entries.is_empty() {
            self.positions.insert(self.entries[0], 0);
            self.sift_down(topo, 0);
        }
        Some(popped)
    }

    /// Restore heap order at the positions of the given edges, whose errors
    /// may have changed. Edges not in the heap are ignored.
    fn update_edges(&mut self, topo: &Topology, edges: &[EdgeId]) {
        for &e in edges {
            if let Some(&i) = self.positions.get(&e) {
                self.sift_up(topo, i);
                let i = self.positions[&e];
                self.sift_down(topo, i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn budget_floors_and_clamps() {
        assert_eq!(collapse_budget(8, 0.5, 0), 4);
        assert_eq!(collapse_budget(9, 0.5, 0), 4);
        assert_eq!(collapse_budget(10, 0.95, 5), 4);
        assert_eq!(collapse_budget(4, 0.5, 10), 0);
        assert_eq!(collapse_budget(0, 1.0, 0), 0);
    }

    /// Builds a path of border-less edges with prescribed errors for heap
    /// tests.
    fn heap_fixture(errors: &[f64]) -> (Topology, Vec<EdgeId>) {
        let mut topo = Topology::new();
        let verts: Vec<_> = (0..=errors.len())
            .map(|i| topo.new_vertex(Point3::new(i as f64, 0.0, 0.0)))
            .collect();
        let edges: Vec<_> = errors
            .iter()
            .enumerate()
            .map(|(i, &err)| {
                let e = topo.new_edge(verts[i], verts[i + 1]);
                topo.edge_mut(e).error = err;
                e
            })
            .collect();
        (topo, edges)
    }

    #[test]
    fn heap_pops_in_error_order() {
        let (topo, edges) = heap_fixture(&[3.0, 1.0, 2.0, 0.5]);
        let mut heap = EdgeHeap::from_edges(&topo, edges.clone());
        assert_eq!(heap.pop(&topo), Some(edges[3]));
        assert_eq!(heap.pop(&topo), Some(edges[1]));
        assert_eq!(heap.pop(&topo), Some(edges[2]));
        assert_eq!(heap.pop(&topo), Some(edges[0]));
        assert_eq!(heap.pop(&topo), None);
    }

    #[test]
    fn heap_ties_break_on_handle() {
        let (topo, edges) = heap_fixture(&[1.0, 1.0, 1.0]);
        let mut heap = EdgeHeap::from_edges(&topo, edges.clone());
        assert_eq!(heap.pop(&topo), Some(edges[0]));
        assert_eq!(heap.pop(&topo), Some(edges[1]));
        assert_eq!(heap.pop(&topo), Some(edges[2]));
    }

    #[test]
    fn update_edges_reorders_changed_entries() {
        let (mut topo, edges) = heap_fixture(&[1.0, 2.0, 3.0]);
        let mut heap = EdgeHeap::from_edges(&topo, edges.clone());

        topo.edge_mut(edges[2]).error = 0.1;
        heap.update_edges(&topo, &[edges[2]]);

        assert_eq!(heap.pop(&topo), Some(edges[2]));
        assert_eq!(heap.pop(&topo), Some(edges[0]));

        topo.edge_mut(edges[1]).error = 9.0;
        heap.update_edges(&topo, &[edges[1]]);
        assert_eq!(heap.pop(&topo), Some(edges[1]));
    }
}
