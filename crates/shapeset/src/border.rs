//! Borders and the shape-set-wide border index.
//!
//! A border is the curve where three or more mesh fragments meet. It owns an
//! ordered vertex sequence shared by every participating mesh (the vertices
//! are single entities after indexing) plus the set of merged edges along the
//! curve. The [`BorderIndex`] maps both [`BorderId`] and
//! [`BorderDescription`] to borders.

use std::collections::BTreeMap;

use crate::error::{ShapeSetError, ShapeSetResult};
use crate::ids::{BorderDescription, BorderId, MeshId};
use crate::mesh::Mesh;
use crate::topology::{EdgeId, Topology, VertexId};

/// One border curve.
#[derive(Debug)]
pub struct Border {
    pub id: BorderId,

    /// Participating mesh ids, in canonical order.
    pub mesh_ids: Vec<MeshId>,

    /// Ordered vertices along the curve, shared by all participating meshes.
    pub vertices: Vec<VertexId>,

    /// The merged edges of the curve.
    pub edges: Vec<EdgeId>,
}

impl Border {
    /// The canonical description for this border's mesh set.
    pub fn description(&self) -> BorderDescription {
        BorderDescription::from_mesh_ids(self.mesh_ids.iter().copied())
    }

    /// Number of vertices on the border.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Drop an edge from the border. The edge must be present.
    pub(crate) fn remove_edge(&mut self, e: EdgeId) {
        match self.edges.iter().position(|&x| x == e) {
            Some(i) => {
                self.edges.remove(i);
            }
            None => panic!("edge {e:?} not found in border {}", self.id),
        }
    }

    /// Drop a vertex from the border. The vertex must be present.
    pub(crate) fn remove_vertex(&mut self, v: VertexId) {
        match self.vertices.iter().position(|&x| x == v) {
            Some(i) => {
                self.vertices.remove(i);
            }
            None => panic!("vertex {v:?} not found in border {}", self.id),
        }
    }
}

/// Lookup key accepted by [`BorderIndex::border_for`].
#[derive(Debug, Clone)]
pub enum BorderKey {
    Id(BorderId),
    Description(BorderDescription),
}

impl From<BorderId> for BorderKey {
    fn from(id: BorderId) -> Self {
        BorderKey::Id(id)
    }
}

impl From<BorderDescription> for BorderKey {
    fn from(desc: BorderDescription) -> Self {
        BorderKey::Description(desc)
    }
}

/// The shape-set-wide index of borders.
#[derive(Debug)]
pub struct BorderIndex {
    counter: u32,
    by_id: BTreeMap<BorderId, Border>,
    by_desc: BTreeMap<BorderDescription, BorderId>,
}

impl Default for BorderIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl BorderIndex {
    pub fn new() -> Self {
        Self {
            // the first allocated BorderId must be 1, never 0
            counter: 1,
            by_id: BTreeMap::new(),
            by_desc: BTreeMap::new(),
        }
    }

    /// Drop every border and restart id allocation at 1.
    pub fn reset(&mut self) {
        self.counter = 1;
        self.by_id.clear();
        self.by_desc.clear();
    }

    /// Number of borders.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Look up a border by id or by description.
    pub fn border_for(&self, key: impl Into<BorderKey>) -> Option<&Border> {
        match key.into() {
            BorderKey::Id(id) => self.by_id.get(&id),
            BorderKey::Description(desc) => {
                self.by_desc.get(&desc).and_then(|id| self.by_id.get(id))
            }
        }
    }

    /// Iterate borders in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Border> {
        self.by_id.values()
    }

    pub(crate) fn border_mut(&mut self, id: BorderId) -> &mut Border {
        self.by_id
            .get_mut(&id)
            .unwrap_or_else(|| panic!("no border with id {id}"))
    }

    /// Create an empty border for a description, allocating the next unused
    /// positive id, and register it with every participating mesh.
    /// Fails if a border with this description already exists.
    pub(crate) fn new_border(
        &mut self,
        desc: BorderDescription,
        meshes: &mut BTreeMap<MeshId, Mesh>,
    ) -> ShapeSetResult<BorderId> {
        if self.by_desc.contains_key(&desc) {
            return Err(ShapeSetError::DuplicateBorder {
                desc: desc.to_string(),
            });
        }
        let id = loop {
            let candidate = BorderId::new(self.counter)
                .unwrap_or_else(|| panic!("border id counter wrapped to zero"));
            if !self.by_id.contains_key(&candidate) {
                break candidate;
            }
            self.counter += 1;
        };

        let mesh_ids = desc.mesh_ids().to_vec();
        self.register(
            Border {
                id,
                mesh_ids,
                vertices: Vec::new(),
                edges: Vec::new(),
            },
            desc,
            meshes,
        );
        Ok(id)
    }

    /// Insert a border with a caller-supplied id and vertex sequence, as when
    /// loading a shape-set file. Sets each vertex's border back-reference.
    /// Fails if the id or the derived description is occupied.
    pub(crate) fn load_border(
        &mut self,
        id: BorderId,
        mesh_ids: Vec<MeshId>,
        vertices: Vec<VertexId>,
        topo: &mut Topology,
        meshes: &mut BTreeMap<MeshId, Mesh>,
    ) -> ShapeSetResult<()> {
        let desc = BorderDescription::from_mesh_ids(mesh_ids.iter().copied());
        if self.by_desc.contains_key(&desc) {
            return Err(ShapeSetError::DuplicateBorder {
                desc: desc.to_string(),
            });
        }
        if self.by_id.contains_key(&id) {
            return Err(ShapeSetError::DuplicateBorderId { id });
        }

        for &v in &vertices {
            topo.vertex_mut(v).border = Some(id);
        }
        self.register(
            Border {
                id,
                mesh_ids,
                vertices,
                edges: Vec::new(),
            },
            desc,
            meshes,
        );
        Ok(())
    }

    fn register(
        &mut self,
        border: Border,
        desc: BorderDescription,
        meshes: &mut BTreeMap<MeshId, Mesh>,
    ) {
        for mesh_id in &border.mesh_ids {
            if let Some(mesh) = meshes.get_mut(mesh_id) {
                mesh.borders.insert(border.id);
            }
        }
        self.by_desc.insert(desc, border.id);
        self.by_id.insert(border.id, border);
    }

    /// Infer each border's edge set, assuming border vertex sequences are in
    /// place.
    ///
    /// Boundary edges between meshes that share a border exist once per
    /// participating mesh; this walks every border vertex, groups its
    /// incident edges by their other endpoint, merges each group whose faces
    /// span three or more distinct meshes, and attaches the merged edge to
    /// the border whose description matches that mesh set. Groups spanning
    /// fewer meshes are coincidental overlaps and stay unindexed, as do
    /// merged edges whose mesh set matches no existing border.
    pub(crate) fn index_border_edges(&mut self, topo: &mut Topology) {
        for border in self.by_id.values_mut() {
            border.edges.clear();
        }
        topo.clear_edge_borders();

        let snapshot: Vec<(BorderId, Vec<VertexId>)> = self
            .by_id
            .values()
            .map(|b| (b.id, b.vertices.clone()))
            .collect();

        for (_, vertices) in snapshot {
            for v in vertices {
                // group incident edges by the far endpoint, in handle order
                let mut neighbors: BTreeMap<VertexId, Vec<EdgeId>> = BTreeMap::new();
                for &e in &topo.vertex(v).edges {
                    let other = topo.edge(e).other_endpoint(v);
                    neighbors.entry(other).or_default().push(e);
                }

                for (_, group) in neighbors {
                    if topo.edge(group[0]).border.is_some() {
                        // already indexed from the other endpoint
                        continue;
                    }

                    let mut face_meshes: Vec<MeshId> = group
                        .iter()
                        .flat_map(|&e| topo.edge(e).faces.iter())
                        .map(|&f| topo.face(f).mesh)
                        .collect();
                    face_meshes.sort();
                    face_meshes.dedup();
                    if face_meshes.len() < 3 {
                        continue;
                    }

                    let winner = group[0];
                    topo.merge_edges(winner, &group[1..]);

                    let desc = BorderDescription::from_mesh_ids(face_meshes);
                    match self.by_desc.get(&desc).copied() {
                        Some(bid) => {
                            topo.edge_mut(winner).border = Some(bid);
                            self.border_mut(bid).edges.push(winner);
                        }
                        None => {
                            // An edge can be shared by a set of meshes different
                            // from the set sharing either of its vertices, so
                            // there may be no border for it. Leave it unindexed.
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(s: &str) -> BorderDescription {
        s.parse().unwrap()
    }

    fn mesh_ids(s: &str) -> Vec<MeshId> {
        desc(s).mesh_ids().to_vec()
    }

    #[test]
    fn new_border_allocates_ids_from_one() {
        let mut index = BorderIndex::new();
        let mut meshes = BTreeMap::new();

        let first = index.new_border(desc("1-2_1-3_2-3"), &mut meshes).unwrap();
        let second = index.new_border(desc("1-2_1-4_2-4"), &mut meshes).unwrap();
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);
        assert_eq!(index.len(), 2);

        // id and description both resolve the border
        assert_eq!(index.border_for(first).unwrap().id, first);
        assert_eq!(index.border_for(desc("1-2_1-3_2-3")).unwrap().id, first);
    }

    #[test]
    fn duplicate_description_is_rejected() {
        let mut index = BorderIndex::new();
        let mut meshes = BTreeMap::new();

        index.new_border(desc("1-2_1-3_2-3"), &mut meshes).unwrap();
        let err = index
            .new_border(desc("1-2_1-3_2-3"), &mut meshes)
            .unwrap_err();
        assert!(matches!(err, ShapeSetError::DuplicateBorder { .. }));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn load_border_rejects_a_reused_id() {
        let mut index = BorderIndex::new();
        let mut meshes = BTreeMap::new();
        let mut topo = Topology::new();
        let id = BorderId::new(7).unwrap();

        index
            .load_border(id, mesh_ids("1-2_1-3_2-3"), Vec::new(), &mut topo, &mut meshes)
            .unwrap();

        // same id under a different description
        let err = index
            .load_border(id, mesh_ids("1-2_1-4_2-4"), Vec::new(), &mut topo, &mut meshes)
            .unwrap_err();
        assert!(matches!(err, ShapeSetError::DuplicateBorderId { .. }));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn load_border_rejects_a_reused_description() {
        let mut index = BorderIndex::new();
        let mut meshes = BTreeMap::new();
        let mut topo = Topology::new();

        index
            .load_border(
                BorderId::new(7).unwrap(),
                mesh_ids("1-2_1-3_2-3"),
                Vec::new(),
                &mut topo,
                &mut meshes,
            )
            .unwrap();

        // fresh id, colliding description
        let err = index
            .load_border(
                BorderId::new(8).unwrap(),
                mesh_ids("1-2_1-3_2-3"),
                Vec::new(),
                &mut topo,
                &mut meshes,
            )
            .unwrap_err();
        assert!(matches!(err, ShapeSetError::DuplicateBorder { .. }));
    }

    #[test]
    fn new_border_skips_ids_taken_by_loaded_borders() {
        let mut index = BorderIndex::new();
        let mut meshes = BTreeMap::new();
        let mut topo = Topology::new();

        index
            .load_border(
                BorderId::new(1).unwrap(),
                mesh_ids("1-2_1-3_2-3"),
                Vec::new(),
                &mut topo,
                &mut meshes,
            )
            .unwrap();
        let allocated = index.new_border(desc("1-2_1-4_2-4"), &mut meshes).unwrap();
        assert_eq!(allocated.get(), 2);
    }
}
