//! Border verification.
//!
//! Checks that every indexed border actually matches between its meshes:
//! each border vertex has a counterpart at the same row and the same
//! location in every participating mesh, and no vertex is claimed by two
//! borders. Returns the first violation found.

use hashbrown::HashMap;

use crate::error::{ShapeSetError, ShapeSetResult};
use crate::shapeset::ShapeSet;
use crate::topology::VertexId;

impl ShapeSet {
    /// Verify the border index against the meshes. Returns the first
    /// violated expectation as an error.
    pub fn verify_borders(&self) -> ShapeSetResult<()> {
        let mut owners: HashMap<VertexId, crate::ids::BorderId> = HashMap::new();

        for border in self.borders.iter() {
            for (row, &v) in border.vertices.iter().enumerate() {
                let vertex = self.topo.vertex(v);

                if vertex.border != Some(border.id) {
                    return Err(ShapeSetError::BorderMismatch {
                        details: format!(
                            "vertex at row {row} of border {} does not reference the border",
                            border.id
                        ),
                    });
                }

                if let Some(previous) = owners.insert(v, border.id) {
                    return Err(ShapeSetError::BorderMismatch {
                        details: format!(
                            "vertex at row {row} of border {} also occurs in border {previous}",
                            border.id
                        ),
                    });
                }

                // Row alignment: one location per participating mesh, each
                // container slot holding a vertex at the same coordinates.
                let mut first_position = None;
                for mesh_id in &border.mesh_ids {
                    let Some(&location) = vertex.locations.get(mesh_id) else {
                        return Err(ShapeSetError::BorderMismatch {
                            details: format!(
                                "row {row} of border {} has no location in mesh {mesh_id}",
                                border.id
                            ),
                        });
                    };
                    let Some(mesh) = self.meshes.get(mesh_id) else {
                        return Err(ShapeSetError::BorderMismatch {
                            details: format!(
                                "border {} names mesh {mesh_id}, which does not exist",
                                border.id
                            ),
                        });
                    };
                    let Some(&slot) = mesh.vertices.get(location) else {
                        return Err(ShapeSetError::BorderMismatch {
                            details: format!(
                                "row {row} of border {} points past the end of mesh {mesh_id}",
                                border.id
                            ),
                        });
                    };
                    let position = self.topo.vertex(slot).position;
                    match first_position {
                        None => first_position = Some(position),
                        Some(expected) if expected == position => {}
                        Some(_) => {
                            return Err(ShapeSetError::BorderMismatch {
                                details: format!(
                                    "row {row} of border {} differs between meshes",
                                    border.id
                                ),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
