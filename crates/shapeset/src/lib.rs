//! Shape sets: labeled-region surface meshes with shared border topology.
//!
//! A **shape set** is a collection of triangular mesh fragments that
//! partition a 3D volume into labeled regions. Each fragment separates
//! exactly two shapes and is named by their id pair (`"1-2"`). Because the
//! fragments are produced independently, the curves where three or more of
//! them meet arrive as duplicate coincident vertices with no shared
//! identity; this crate discovers those curves, unifies them, and keeps them
//! consistent through further processing.
//!
//! # Core operations
//!
//! - [`ShapeSet::index_borders`]: find shared boundary curves, merge the
//!   coincident vertices across meshes, and build a canonical, set-wide
//!   border index.
//! - [`ShapeSet::compose_region`]: stitch the fragments around a set of
//!   shapes into one outward-facing region surface.
//! - [`ShapeSet::simplify_borders`]: reduce border vertex count by quadric
//!   edge collapse while every participating mesh stays manifold.
//! - [`ShapeSet::realign_borders`], [`ShapeSet::reload_vertices`],
//!   [`ShapeSet::verify_borders`], [`ShapeSet::scale_and_center`]:
//!   maintenance operations around the core.
//!
//! # Quick start
//!
//! ```no_run
//! use shapeset::{ShapeSet, SimplifyParams};
//!
//! let mut ss = ShapeSet::read_file("brain.shapeset.json".as_ref())?;
//! ss.index_borders()?;
//! ss.simplify_borders(&SimplifyParams::default());
//! ss.write_file("simplified.shapeset.json".as_ref())?;
//! # Ok::<(), shapeset::ShapeSetError>(())
//! ```
//!
//! # File formats
//!
//! Shape sets serialize as JSON with comma-separated number buffers and
//! row-aligned border index lists; individual meshes travel as a Wavefront
//! OBJ subset (`v`/`f`, `#` comments), named `<a>-<b>.obj`. See the
//! [`io`] module.
//!
//! # Invariant assertions
//!
//! Topology mutations are checked against the reciprocity invariants when
//! the `DEBUG_LEVEL` environment variable is 1 or higher (read once at
//! startup). Violations are programming errors and panic; user-facing
//! failures are returned as [`ShapeSetError`].

mod border;
mod compose;
mod debug;
mod error;
mod index;
mod realign;
mod shapeset;
mod simplify;
mod verify;

pub mod geom;
pub mod ids;
pub mod io;
pub mod mesh;
pub mod topology;
pub mod trimesh;

pub use border::{Border, BorderIndex, BorderKey};
pub use compose::ComposeResult;
pub use debug::debug_level;
pub use error::{ShapeSetError, ShapeSetResult};
pub use ids::{BorderDescription, BorderId, MeshId, ShapeId};
pub use mesh::Mesh;
pub use shapeset::ShapeSet;
pub use simplify::{SimplifyParams, SimplifyResult};
pub use topology::{Edge, EdgeId, Face, FaceId, Topology, Vertex, VertexId};
pub use trimesh::TriMesh;

use std::path::Path;

// File-level conveniences over the io module.
impl ShapeSet {
    /// Load a shape set from a JSON file.
    pub fn read_file(path: &Path) -> ShapeSetResult<Self> {
        io::read_file(path)
    }

    /// Save the shape set to a JSON file.
    pub fn write_file(&mut self, path: &Path) -> ShapeSetResult<()> {
        io::write_file(self, path)
    }

    /// Create a shape set from a directory of `<a>-<b>.obj` meshes and a
    /// JSON labels file.
    pub fn create_from_dir(meshes_dir: &Path, labels_path: &Path) -> ShapeSetResult<Self> {
        io::create_from_dir(meshes_dir, labels_path)
    }

    /// Write every mesh as an OBJ file into a directory.
    pub fn save_meshes(&mut self, meshes_dir: &Path) -> ShapeSetResult<()> {
        io::save_meshes(self, meshes_dir)
    }
}
