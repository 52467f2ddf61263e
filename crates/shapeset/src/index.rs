//! Border indexing: discovering the boundary curves meshes share.
//!
//! Strategy: extract every mesh's boundaries (with bounding boxes), then for
//! each pair of meshes whose inflated boxes intersect, and each pair of their
//! boundaries whose inflated boxes intersect, concatenate the two boundary
//! vertex lists, sort by position, and scan adjacent entries for coincident
//! vertices from different sides. The per-pair occurrence maps are unioned,
//! grouped by the canonical description of each location's participating
//! meshes, and turned into borders: one vertex column per mesh, row-aligned,
//! with every row merged into a single shared vertex. Finally the border
//! edge sets are inferred from the merged topology.
//!
//! The extraction and matching phases run in parallel; everything that
//! mutates the topology runs sequentially. Determinism comes from sorting at
//! the output boundaries: descriptions are sorted before ids are allocated,
//! and row order follows the canonical mesh's boundary emission order.

use hashbrown::HashMap;
use nalgebra::Point3;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::ShapeSetResult;
use crate::geom::{point_key, Aabb};
use crate::ids::{BorderDescription, MeshId};
use crate::shapeset::ShapeSet;
use crate::topology::VertexId;

/// Bounding-box inflation for the intersection pre-filters.
const BOX_EPSILON: f64 = 0.01;

struct BoundaryInfo {
    verts: Vec<(VertexId, Point3<f64>)>,
    bounding_box: Aabb,
}

struct MeshBoundaries {
    boundaries: Vec<BoundaryInfo>,
    /// Emission order of each boundary vertex, for row ordering.
    rank: HashMap<VertexId, usize>,
}

impl ShapeSet {
    /// Discover all shared boundary curves and build the border index.
    ///
    /// Existing borders are discarded and ids restart at 1. The result is
    /// deterministic: running this twice yields identical border ids and
    /// identical border vertex orderings.
    pub fn index_borders(&mut self) -> ShapeSetResult<()> {
        info!(meshes = self.meshes.len(), "indexing borders");

        // Reset: clear the index, mesh border tables, and back-references.
        self.borders.reset();
        for mesh in self.meshes.values_mut() {
            mesh.borders.clear();
        }
        self.topo.clear_border_links();
        self.reindex_all();

        // Per-mesh boundary extraction, in parallel.
        let mesh_refs: Vec<(&MeshId, &crate::mesh::Mesh)> = self.meshes.iter().collect();
        let topo = &self.topo;
        let extracted: BTreeMap<MeshId, MeshBoundaries> = mesh_refs
            .par_iter()
            .map(|&(id, mesh)| {
                let loops = mesh.identify_boundaries(topo);
                let mut rank = HashMap::new();
                let mut boundaries = Vec::with_capacity(loops.len());
                for boundary in loops {
                    let Some(bounding_box) = mesh.subset_bounding_box(topo, &boundary) else {
                        continue;
                    };
                    let verts = boundary
                        .iter()
                        .map(|&v| (v, topo.vertex(v).position))
                        .collect::<Vec<_>>();
                    for &(v, _) in &verts {
                        let next = rank.len();
                        rank.entry(v).or_insert(next);
                    }
                    boundaries.push(BoundaryInfo {
                        verts,
                        bounding_box,
                    });
                }
                (*id, MeshBoundaries { boundaries, rank })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        debug!(
            boundaries = extracted.values().map(|m| m.boundaries.len()).sum::<usize>(),
            "extracted mesh boundaries"
        );

        // Candidate mesh pairs: canonical order, inflated boxes intersecting.
        let ids: Vec<MeshId> = self.meshes.keys().copied().collect();
        let mut pairs = Vec::new();
        for (i, &m1) in ids.iter().enumerate() {
            for &m2 in &ids[i + 1..] {
                let (Some(b1), Some(b2)) = (
                    self.meshes[&m1].bounding_box,
                    self.meshes[&m2].bounding_box,
                ) else {
                    continue;
                };
                if b1.expanded(BOX_EPSILON).intersects(&b2.expanded(BOX_EPSILON)) {
                    pairs.push((m1, m2));
                }
            }
        }

        // Pairwise boundary matching, in parallel; thread-local occurrence
        // maps are unioned afterwards.
        let pair_maps: Vec<HashMap<[u64; 3], Vec<(MeshId, VertexId)>>> = pairs
            .par_iter()
            .map(|&(m1, m2)| match_mesh_pair(m1, m2, &extracted))
            .collect();

        let mut occurrences: HashMap<[u64; 3], Vec<(MeshId, VertexId)>> = HashMap::new();
        for map in pair_maps {
            for (key, found) in map {
                occurrences.entry(key).or_default().extend(found);
            }
        }
        debug!(locations = occurrences.len(), "matched border vertex locations");

        // Group each location under the canonical description of its
        // participating meshes; one row per location.
        let mut grouped: BTreeMap<BorderDescription, Vec<BTreeMap<MeshId, VertexId>>> =
            BTreeMap::new();
        for (_, mut found) in occurrences {
            // deduplicate occurrences of this location by mesh
            found.sort();
            let mut row: BTreeMap<MeshId, VertexId> = BTreeMap::new();
            for (mesh_id, vertex) in found {
                row.entry(mesh_id).or_insert(vertex);
            }
            let desc = BorderDescription::from_mesh_ids(row.keys().copied());
            grouped.entry(desc).or_default().push(row);
        }

        // Create borders in sorted description order, producing reproducible
        // ids regardless of scheduling.
        for desc in grouped.keys() {
            let ShapeSet {
                borders, meshes, ..
            } = self;
            borders.new_border(desc.clone(), meshes)?;
        }

        // Merge vertices: the smallest participating mesh's column is
        // canonical; every other mesh's vertex in the row is folded into it.
        for (desc, mut rows) in grouped {
            let Some(border_id) = self.borders.border_for(desc.clone()).map(|b| b.id) else {
                continue;
            };
            let mesh_ids = desc.mesh_ids().to_vec();
            let canonical_mesh = mesh_ids[0];
            let canonical_ranks = &extracted[&canonical_mesh].rank;
            rows.sort_by_key(|row| canonical_ranks.get(&row[&canonical_mesh]).copied());

            let mut border_vertices = Vec::with_capacity(rows.len());
            for row in &rows {
                let canonical = row[&canonical_mesh];
                for (&mesh_id, &vertex) in row {
                    if mesh_id != canonical_mesh {
                        self.merge_shared_vertices(canonical, vertex);
                    }
                }
                self.topo.vertex_mut(canonical).border = Some(border_id);
                border_vertices.push(canonical);
            }
            self.borders.border_mut(border_id).vertices = border_vertices;
        }

        // Infer border edge sets from the merged topology.
        let ShapeSet { borders, topo, .. } = self;
        borders.index_border_edges(topo);

        info!(borders = self.borders.len(), "border index built");
        Ok(())
    }
}

/// Match coincident boundary vertices between two meshes. Returns a map of
/// location keys to the vertices found there, tagged with their source mesh.
fn match_mesh_pair(
    m1: MeshId,
    m2: MeshId,
    extracted: &BTreeMap<MeshId, MeshBoundaries>,
) -> HashMap<[u64; 3], Vec<(MeshId, VertexId)>> {
    let mut found: HashMap<[u64; 3], Vec<(MeshId, VertexId)>> = HashMap::new();

    for b1 in &extracted[&m1].boundaries {
        for b2 in &extracted[&m2].boundaries {
            if !b1
                .bounding_box
                .expanded(BOX_EPSILON)
                .intersects(&b2.bounding_box.expanded(BOX_EPSILON))
            {
                continue;
            }

            // Concatenate both boundaries, tagging each vertex with its
            // side, and sort so coincident vertices become adjacent with the
            // first mesh's entry leading.
            let mut verts: Vec<(Point3<f64>, u8, VertexId)> =
                Vec::with_capacity(b1.verts.len() + b2.verts.len());
            for &(v, p) in &b1.verts {
                verts.push((p, 0, v));
            }
            for &(v, p) in &b2.verts {
                verts.push((p, 1, v));
            }
            verts.sort_by(|a, b| {
                a.0.x
                    .total_cmp(&b.0.x)
                    .then_with(|| a.0.y.total_cmp(&b.0.y))
                    .then_with(|| a.0.z.total_cmp(&b.0.z))
                    .then_with(|| a.1.cmp(&b.1))
                    .then_with(|| a.2.cmp(&b.2))
            });

            // Scan adjacent entries for identical positions from different
            // sides.
            for window in verts.windows(2) {
                let (prev_p, prev_side, prev_v) = window[0];
                let (cur_p, cur_side, cur_v) = window[1];
                if prev_side != cur_side
                    && prev_p.x == cur_p.x
                    && prev_p.y == cur_p.y
                    && prev_p.z == cur_p.z
                {
                    let (prev_mesh, cur_mesh) = if prev_side == 0 { (m1, m2) } else { (m2, m1) };
                    let entry = found.entry(point_key(&cur_p)).or_default();
                    entry.push((prev_mesh, prev_v));
                    entry.push((cur_mesh, cur_v));
                }
            }
        }
    }

    found
}
