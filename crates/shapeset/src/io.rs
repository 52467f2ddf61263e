//! Shape-set file I/O and OBJ mesh I/O.
//!
//! The shape-set file is JSON: set name, shape labels, and per-mesh vertex,
//! normal, and face buffers as comma-separated number strings, plus the
//! border index lists. Border vertex index lists are row-aligned: the same
//! row in every participating mesh names the same point on the curve.
//!
//! Meshes travel separately as Wavefront OBJ (`v`/`f` subset), named
//! `<a>-<b>.obj` after the fragment's mesh id.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ShapeSetError, ShapeSetResult};
use crate::ids::{BorderId, MeshId, ShapeId};
use crate::shapeset::ShapeSet;
use crate::topology::VertexId;
use crate::trimesh::TriMesh;

#[derive(Debug, Serialize, Deserialize)]
struct MeshSchema {
    name: String,
    verts: String,
    #[serde(default)]
    norms: String,
    faces: String,
    #[serde(default)]
    borders: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ShapeSetSchema {
    name: String,
    shapes: BTreeMap<String, String>,
    meshes: Vec<MeshSchema>,
}

/// Parse a shape set from a JSON reader.
///
/// Rebuilds the full topology: meshes are lowered into the arena, border
/// vertex columns are merged into shared vertices, and border edges are
/// inferred.
pub fn load(reader: impl Read) -> ShapeSetResult<ShapeSet> {
    let parsed: ShapeSetSchema = serde_json::from_reader(reader)
        .map_err(|e| ShapeSetError::parse("shape set json", e.to_string()))?;

    let mut shapes = BTreeMap::new();
    for (shape_id, label) in parsed.shapes {
        shapes.insert(shape_id.parse::<ShapeId>()?, label);
    }

    let mut tri_meshes = Vec::with_capacity(parsed.meshes.len());
    // border id -> mesh id -> vertex indices, collected while parsing meshes
    let mut border_tracker: BTreeMap<BorderId, BTreeMap<MeshId, Vec<usize>>> = BTreeMap::new();

    for mesh_data in &parsed.meshes {
        let mesh_id: MeshId = mesh_data.name.parse()?;

        let verts = parse_cs_floats(&mesh_data.verts)
            .map_err(|e| annotate_mesh(e, &mesh_data.name, "vertices"))?;
        if verts.len() % 3 != 0 {
            return Err(ShapeSetError::MalformedMesh {
                mesh: mesh_data.name.clone(),
                details: "vertex buffer length is not a multiple of 3".into(),
            });
        }

        // normals are optional, but when present must match the vertices
        if !mesh_data.norms.is_empty() {
            let norms = parse_cs_floats(&mesh_data.norms)
                .map_err(|e| annotate_mesh(e, &mesh_data.name, "normals"))?;
            if norms.len() != verts.len() {
                return Err(ShapeSetError::MalformedMesh {
                    mesh: mesh_data.name.clone(),
                    details: "vertices/normals mismatch".into(),
                });
            }
        }

        let faces = parse_cs_ints(&mesh_data.faces)
            .map_err(|e| annotate_mesh(e, &mesh_data.name, "faces"))?;
        if faces.len() % 3 != 0 {
            return Err(ShapeSetError::MalformedMesh {
                mesh: mesh_data.name.clone(),
                details: "face buffer length is not a multiple of 3".into(),
            });
        }

        let mut tm = TriMesh::new(mesh_id.to_string());
        tm.positions = verts
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        tm.faces = faces
            .chunks_exact(3)
            .map(|c| [c[0] as u32, c[1] as u32, c[2] as u32])
            .collect();
        tri_meshes.push(tm);

        for (border_id, indices) in &mesh_data.borders {
            let border_id: BorderId = border_id.parse()?;
            let indices = parse_cs_ints(indices)
                .map_err(|e| annotate_mesh(e, &mesh_data.name, "border indices"))?;
            border_tracker
                .entry(border_id)
                .or_default()
                .insert(mesh_id, indices);
        }
    }

    let mut ss = ShapeSet::new(parsed.name, shapes, tri_meshes)?;

    // Merge border vertex columns and install the borders.
    for (border_id, columns) in border_tracker {
        let mesh_ids: Vec<MeshId> = columns.keys().copied().collect();

        // resolve index columns to vertex handles before any merging
        let mut resolved: Vec<(MeshId, Vec<VertexId>)> = Vec::with_capacity(columns.len());
        let mut expected_len = None;
        for (mesh_id, indices) in columns {
            let mesh = &ss.meshes[&mesh_id];
            if *expected_len.get_or_insert(indices.len()) != indices.len() {
                return Err(ShapeSetError::BorderMismatch {
                    details: format!(
                        "border {border_id} length differs between meshes (found {} in {mesh_id})",
                        indices.len()
                    ),
                });
            }
            let mut column = Vec::with_capacity(indices.len());
            for index in indices {
                let Some(&v) = mesh.vertices.get(index) else {
                    return Err(ShapeSetError::MalformedMesh {
                        mesh: mesh_id.to_string(),
                        details: format!(
                            "border {border_id} references vertex {index} out of range"
                        ),
                    });
                };
                column.push(v);
            }
            resolved.push((mesh_id, column));
        }

        let canonical = resolved[0].1.clone();
        for (_, column) in resolved.iter().skip(1) {
            for (&keep, &fold) in canonical.iter().zip(column) {
                ss.merge_shared_vertices(keep, fold);
            }
        }

        let ShapeSet {
            borders,
            topo,
            meshes,
            ..
        } = &mut ss;
        borders.load_border(border_id, mesh_ids, canonical, topo, meshes)?;
    }

    let ShapeSet { borders, topo, .. } = &mut ss;
    borders.index_border_edges(topo);

    info!(
        meshes = ss.meshes.len(),
        borders = ss.borders().len(),
        "shape set loaded"
    );
    Ok(ss)
}

/// Serialize a shape set as JSON. Reindexes every mesh first so the emitted
/// buffers and border index lists agree.
pub fn save(ss: &mut ShapeSet, writer: impl Write) -> ShapeSetResult<()> {
    ss.reindex_all();

    let mut schema = ShapeSetSchema {
        name: ss.name.clone(),
        shapes: ss
            .shapes
            .iter()
            .map(|(id, label)| (id.to_string(), label.clone()))
            .collect(),
        meshes: Vec::with_capacity(ss.meshes.len()),
    };

    for (mesh_id, mesh) in &ss.meshes {
        let topo = ss.topology();
        let positions: Vec<Point3<f64>> = mesh
            .vertices
            .iter()
            .map(|&v| topo.vertex(v).position)
            .collect();

        let mut borders = BTreeMap::new();
        for &border_id in &mesh.borders {
            let Some(border) = ss.borders().border_for(border_id) else {
                continue;
            };
            let indices = border
                .vertices
                .iter()
                .map(|&v| mesh.position_of(topo, v).to_string())
                .collect::<Vec<_>>()
                .join(",");
            borders.insert(border_id.to_string(), indices);
        }

        schema.meshes.push(MeshSchema {
            name: mesh_id.to_string(),
            verts: join_floats(positions.iter().flat_map(|p| [p.x, p.y, p.z])),
            norms: join_floats(
                vertex_normals(ss, *mesh_id)
                    .iter()
                    .flat_map(|n| [n.x, n.y, n.z]),
            ),
            faces: {
                let mut parts = Vec::with_capacity(mesh.faces.len() * 3);
                for &f in &mesh.faces {
                    for &corner in &topo.face(f).vertices {
                        parts.push(mesh.position_of(topo, corner).to_string());
                    }
                }
                parts.join(",")
            },
            borders,
        });
    }

    serde_json::to_writer(writer, &schema)
        .map_err(|e| ShapeSetError::parse("shape set json", e.to_string()))?;
    Ok(())
}

/// Load a shape set from a file.
pub fn read_file(path: &Path) -> ShapeSetResult<ShapeSet> {
    let file = File::open(path).map_err(|e| ShapeSetError::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    load(std::io::BufReader::new(file))
}

/// Save a shape set to a file.
pub fn write_file(ss: &mut ShapeSet, path: &Path) -> ShapeSetResult<()> {
    let file = File::create(path).map_err(|e| ShapeSetError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    save(ss, BufWriter::new(file))
}

/// Create a new shape set from a labels file and a directory of meshes.
///
/// Every file in the directory named `<a>-<b>.obj` is loaded as a mesh
/// fragment; other files are ignored. The labels file is a JSON object of
/// shape id to label.
pub fn create_from_dir(meshes_dir: &Path, labels_path: &Path) -> ShapeSetResult<ShapeSet> {
    if !meshes_dir.is_dir() {
        return Err(ShapeSetError::NotADirectory {
            path: meshes_dir.to_path_buf(),
        });
    }

    let labels_file = File::open(labels_path).map_err(|e| ShapeSetError::IoRead {
        path: labels_path.to_path_buf(),
        source: e,
    })?;
    let raw_labels: BTreeMap<String, String> = serde_json::from_reader(labels_file)
        .map_err(|e| ShapeSetError::parse("labels json", e.to_string()))?;
    let mut shapes = BTreeMap::new();
    for (shape_id, label) in raw_labels {
        shapes.insert(shape_id.parse::<ShapeId>()?, label);
    }

    let mut entries: Vec<_> = std::fs::read_dir(meshes_dir)
        .map_err(|e| ShapeSetError::IoRead {
            path: meshes_dir.to_path_buf(),
            source: e,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let mut meshes = Vec::new();
    for path in entries {
        let is_obj = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("obj"));
        let mesh_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<MeshId>().ok());
        if let (true, Some(mesh_id)) = (is_obj, mesh_id) {
            let mut tm = read_obj(&path)?;
            tm.name = mesh_id.to_string();
            debug!(mesh = %mesh_id, vertices = tm.vertex_count(), "mesh read");
            meshes.push(tm);
        }
    }

    info!(meshes = meshes.len(), "creating shape set from directory");
    ShapeSet::new("New ShapeSet", shapes, meshes)
}

/// Write every mesh as `<a>-<b>.obj` into a directory.
pub fn save_meshes(ss: &mut ShapeSet, meshes_dir: &Path) -> ShapeSetResult<()> {
    if !meshes_dir.is_dir() {
        return Err(ShapeSetError::NotADirectory {
            path: meshes_dir.to_path_buf(),
        });
    }
    ss.reindex_all();

    let mesh_ids: Vec<MeshId> = ss.meshes.keys().copied().collect();
    for mesh_id in mesh_ids {
        let tm = ss
            .extract_tri_mesh(mesh_id)
            .unwrap_or_else(|| panic!("mesh {mesh_id} disappeared during save"));
        write_obj(&tm, &meshes_dir.join(format!("{mesh_id}.obj")))?;
    }
    Ok(())
}

/// Read a Wavefront OBJ file as a flat triangle mesh. The mesh is named
/// after the file stem.
pub fn read_obj(path: &Path) -> ShapeSetResult<TriMesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| ShapeSetError::Parse {
        context: path.display().to_string(),
        details: e.to_string(),
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let mut mesh = TriMesh::new(name);

    // merge all models, offsetting indices
    for model in &models {
        let offset = mesh.positions.len() as u32;
        for chunk in model.mesh.positions.chunks_exact(3) {
            mesh.push_vertex(Point3::new(chunk[0], chunk[1], chunk[2]));
        }
        for chunk in model.mesh.indices.chunks_exact(3) {
            mesh.faces
                .push([chunk[0] + offset, chunk[1] + offset, chunk[2] + offset]);
        }
    }

    debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "OBJ read"
    );
    Ok(mesh)
}

/// Write a flat triangle mesh as Wavefront OBJ.
pub fn write_obj(mesh: &TriMesh, path: &Path) -> ShapeSetResult<()> {
    let file = File::create(path).map_err(|e| ShapeSetError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_obj_to(mesh, BufWriter::new(file)).map_err(|e| ShapeSetError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_obj_to(mesh: &TriMesh, mut writer: impl Write) -> std::io::Result<()> {
    writeln!(writer, "# {}", mesh.name)?;
    for p in &mesh.positions {
        // full-precision output so coincident vertices stay exactly equal
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for &[a, b, c] in &mesh.faces {
        writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    Ok(())
}

/// Compute per-vertex normals for one mesh as the normalized, area-weighted
/// sum of its face normals.
fn vertex_normals(ss: &ShapeSet, mesh_id: MeshId) -> Vec<Vector3<f64>> {
    let topo = ss.topology();
    let mesh = &ss.meshes[&mesh_id];
    let mut normals = vec![Vector3::zeros(); mesh.vertices.len()];

    for &f in &mesh.faces {
        let face = topo.face(f);
        let [p0, p1, p2] = face.vertices.map(|v| topo.vertex(v).position);
        // unnormalized cross product weights by face area
        let n = (p1 - p0).cross(&(p2 - p0));
        for &corner in &face.vertices {
            normals[mesh.position_of(topo, corner)] += n;
        }
    }

    for n in &mut normals {
        let len = n.norm();
        if len > f64::EPSILON {
            *n /= len;
        }
    }
    normals
}

fn annotate_mesh(err: ShapeSetError, mesh: &str, what: &str) -> ShapeSetError {
    match err {
        ShapeSetError::Parse { details, .. } => ShapeSetError::MalformedMesh {
            mesh: mesh.to_string(),
            details: format!("{what}: {details}"),
        },
        other => other,
    }
}

/// Parse a string of comma-separated floats.
fn parse_cs_floats(csv: &str) -> ShapeSetResult<Vec<f64>> {
    csv.split(',')
        .map(|segment| {
            segment
                .parse::<f64>()
                .map_err(|_| ShapeSetError::parse("float", segment))
        })
        .collect()
}

/// Parse a string of comma-separated non-negative integers.
fn parse_cs_ints(csv: &str) -> ShapeSetResult<Vec<usize>> {
    csv.split(',')
        .map(|segment| {
            segment
                .parse::<usize>()
                .map_err(|_| ShapeSetError::parse("integer", segment))
        })
        .collect()
}

fn join_floats(values: impl Iterator<Item = f64>) -> String {
    values
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
