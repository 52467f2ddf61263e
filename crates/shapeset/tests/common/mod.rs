//! Shared fixtures: small shape sets with known border structure.
#![allow(dead_code)]

use std::collections::BTreeMap;

use nalgebra::{Point3, Vector3};
use shapeset::{ShapeId, ShapeSet, TriMesh};

/// Labels for the fixtures below.
pub fn labels(ids: &[(u32, &str)]) -> BTreeMap<ShapeId, String> {
    ids.iter()
        .map(|&(id, label)| (ShapeId(id), label.to_string()))
        .collect()
}

/// The eight corners of an axis-aligned box.
fn box_corners(min: Point3<f64>, max: Point3<f64>) -> [Point3<f64>; 8] {
    [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ]
}

/// An open box: the five faces of a cuboid, with outward winding, leaving
/// the requested x side uncovered.
fn open_box(name: &str, min: Point3<f64>, max: Point3<f64>, open_max_x: bool) -> TriMesh {
    let mut tm = TriMesh::new(name);
    tm.positions = box_corners(min, max).to_vec();
    let mut faces: Vec<[u32; 3]> = vec![
        // bottom (z = min)
        [0, 2, 1],
        [0, 3, 2],
        // top (z = max)
        [4, 5, 6],
        [4, 6, 7],
        // front (y = min)
        [0, 1, 5],
        [0, 5, 4],
        // back (y = max)
        [3, 7, 6],
        [3, 6, 2],
    ];
    if open_max_x {
        // keep the x = min side
        faces.push([0, 4, 7]);
        faces.push([0, 7, 3]);
    } else {
        // keep the x = max side
        faces.push([1, 2, 6]);
        faces.push([1, 6, 5]);
    }
    tm.faces = faces;
    tm
}

/// Two unit cubes side by side, sharing the face at x = 1.
///
/// Shapes: 0 = exterior, 1 = left cube, 2 = right cube. Meshes: `0-1` (left
/// cube minus the shared face), `0-2` (right cube minus the shared face),
/// and `1-2` (the shared face, normals toward shape 1). Indexing yields one
/// border of description `0-1_0-2_1-2` with four vertices.
pub fn two_cube_set() -> ShapeSet {
    let left = open_box(
        "0-1",
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 1.0),
        true,
    );
    let right = open_box(
        "0-2",
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(2.0, 1.0, 1.0),
        false,
    );

    // shared face at x = 1, wound so the normal points toward shape 1
    let mut shared = TriMesh::new("1-2");
    shared.positions = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(1.0, 1.0, 0.0),
    ];
    shared.faces = vec![[0, 1, 2], [0, 2, 3]];

    ShapeSet::new(
        "two-cubes",
        labels(&[(0, "exterior"), (1, "left"), (2, "right")]),
        vec![left, right, shared],
    )
    .unwrap()
}

/// Three rectangular "pages" meeting along a shared spine polyline, like the
/// sheets of a booklet. Meshes `1-2`, `1-3`, `2-3` each extrude the spine in
/// a different direction; only the spine vertices coincide across pages.
/// Indexing yields one border of description `1-2_1-3_2-3` whose vertices
/// are the spine points.
pub fn book_set(spine: &[Point3<f64>]) -> ShapeSet {
    let directions = [
        ("1-2", Vector3::new(0.0, 3.0, 0.0)),
        ("1-3", Vector3::new(0.0, -3.0, 0.0)),
        ("2-3", Vector3::new(0.0, 0.0, 3.0)),
    ];

    let mut meshes = Vec::new();
    for (name, dir) in directions {
        let n = spine.len();
        let mut tm = TriMesh::new(name);
        tm.positions.extend(spine.iter().copied());
        tm.positions.extend(spine.iter().map(|&p| p + dir));
        for i in 0..n - 1 {
            let (s0, s1) = (i as u32, (i + 1) as u32);
            let (o0, o1) = ((n + i) as u32, (n + i + 1) as u32);
            tm.faces.push([s0, s1, o0]);
            tm.faces.push([s1, o1, o0]);
        }
        meshes.push(tm);
    }

    ShapeSet::new(
        "book",
        labels(&[(1, "recto"), (2, "verso"), (3, "cover")]),
        meshes,
    )
    .unwrap()
}

/// A straight spine along the x axis with `segments` edges.
pub fn straight_spine(segments: usize) -> Vec<Point3<f64>> {
    (0..=segments)
        .map(|i| Point3::new(i as f64, 0.0, 0.0))
        .collect()
}

/// Check the reciprocity invariants over everything reachable from the
/// meshes: vertex <-> edge, vertex <-> face, edge <-> face, and that no
/// collapsed entity is still referenced.
pub fn check_reciprocity(ss: &ShapeSet) {
    let topo = ss.topology();
    for mesh in ss.meshes.values() {
        for &v in &mesh.vertices {
            let vertex = topo.vertex(v);
            assert!(
                vertex.collapsed_into.is_none(),
                "mesh {} references a collapsed vertex",
                mesh.id
            );
            for &e in &vertex.edges {
                assert!(!topo.edge(e).collapsed, "live vertex lists collapsed edge");
                assert!(
                    topo.edge(e).references_vertex(v),
                    "edge does not point back at vertex"
                );
            }
            for &f in &vertex.faces {
                assert!(!topo.face(f).collapsed, "live vertex lists collapsed face");
                assert!(
                    topo.face(f).references_vertex(v),
                    "face does not point back at vertex"
                );
            }
        }
        for &f in &mesh.faces {
            let face = topo.face(f);
            assert!(!face.collapsed, "mesh {} lists a collapsed face", mesh.id);
            for &c in &face.vertices {
                assert!(
                    topo.vertex(c).faces.contains(&f),
                    "corner vertex does not list face"
                );
            }
            for &e in &face.edges {
                assert!(
                    topo.edge(e).faces.contains(&f),
                    "face edge does not list face"
                );
                let (v1, v2) = topo.edge(e).endpoints();
                assert!(
                    face.references_vertex(v1) && face.references_vertex(v2),
                    "face edge endpoints are not face corners"
                );
            }
        }
    }
}

/// The signed volume of a triangle soup (divergence theorem).
pub fn signed_volume(mesh: &TriMesh) -> f64 {
    let mut volume = 0.0;
    for &[i0, i1, i2] in &mesh.faces {
        let v0 = mesh.positions[i0 as usize];
        let v1 = mesh.positions[i1 as usize];
        let v2 = mesh.positions[i2 as usize];
        volume += v0.coords.dot(&v1.coords.cross(&v2.coords));
    }
    volume / 6.0
}
