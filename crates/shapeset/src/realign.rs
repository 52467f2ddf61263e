//! Border realignment and vertex reloading.

use std::path::Path;

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info};

use crate::error::{ShapeSetError, ShapeSetResult};
use crate::io;
use crate::shapeset::ShapeSet;
use crate::topology::VertexId;

impl ShapeSet {
    /// Reposition every border vertex to the mean of its positions across
    /// the participating mesh columns.
    ///
    /// After `index_borders` the columns reference a single shared vertex,
    /// so this is the identity; it reconciles borders for lossy pipelines
    /// where per-mesh positions have diverged (see
    /// [`reload_vertices`](ShapeSet::reload_vertices)).
    pub fn realign_borders(&mut self) {
        let snapshot: Vec<(Vec<VertexId>, usize)> = self
            .borders
            .iter()
            .map(|b| (b.vertices.clone(), b.mesh_ids.len()))
            .collect();

        for (vertices, mesh_count) in snapshot {
            if mesh_count == 0 {
                continue;
            }
            for v in vertices {
                let mut sum = Vector3::zeros();
                for _ in 0..mesh_count {
                    sum += self.topo.vertex(v).position.coords;
                }
                self.topo.vertex_mut(v).position = Point3::from(sum / mesh_count as f64);
            }
        }

        let ShapeSet { meshes, topo, .. } = self;
        for mesh in meshes.values_mut() {
            mesh.refresh_bounds(topo);
        }
    }

    /// Reload vertex positions from a directory of `<a>-<b>.obj` files with
    /// the same topology as the current meshes.
    ///
    /// Non-shared vertices take the file position directly. Each border
    /// vertex is set to the mean of the positions proposed by the
    /// participating meshes' files.
    pub fn reload_vertices(&mut self, meshes_dir: &Path) -> ShapeSetResult<()> {
        if !meshes_dir.is_dir() {
            return Err(ShapeSetError::NotADirectory {
                path: meshes_dir.to_path_buf(),
            });
        }
        info!(dir = %meshes_dir.display(), "reloading mesh vertices");

        let mut proposals: HashMap<VertexId, Vec<Point3<f64>>> = HashMap::new();

        let mesh_ids: Vec<_> = self.meshes.keys().copied().collect();
        for mesh_id in mesh_ids {
            let path = meshes_dir.join(format!("{mesh_id}.obj"));
            let reloaded = io::read_obj(&path)?;
            let mesh = &self.meshes[&mesh_id];
            if reloaded.positions.len() != mesh.vertices.len() {
                return Err(ShapeSetError::MalformedMesh {
                    mesh: mesh_id.to_string(),
                    details: format!(
                        "reloaded file has {} vertices, mesh has {}",
                        reloaded.positions.len(),
                        mesh.vertices.len()
                    ),
                });
            }

            for (&v, &position) in mesh.vertices.iter().zip(&reloaded.positions) {
                if self.topo.vertex(v).border.is_some() {
                    proposals.entry(v).or_default().push(position);
                } else {
                    self.topo.vertex_mut(v).position = position;
                }
            }
            debug!(mesh = %mesh_id, "vertices reloaded");
        }

        // Border vertices take the mean of the per-mesh proposals.
        for (v, positions) in proposals {
            let mut sum = Vector3::zeros();
            for p in &positions {
                sum += p.coords;
            }
            self.topo.vertex_mut(v).position = Point3::from(sum / positions.len() as f64);
        }

        let ShapeSet { meshes, topo, .. } = self;
        for mesh in meshes.values_mut() {
            mesh.refresh_bounds(topo);
        }
        Ok(())
    }
}
