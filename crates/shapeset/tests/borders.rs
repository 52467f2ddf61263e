//! Border indexing, verification, composition, and round-trip behavior on
//! small constructed shape sets.

mod common;

use common::{
    book_set, check_reciprocity, labels, signed_volume, straight_spine, two_cube_set,
};
use nalgebra::Point3;
use shapeset::{BorderDescription, BorderId, ShapeId, ShapeSet, TriMesh};

#[test]
fn two_cubes_share_one_border() {
    let mut ss = two_cube_set();
    ss.index_borders().unwrap();

    assert_eq!(ss.borders().len(), 1);
    let border = ss.borders().border_for(BorderId::new(1).unwrap()).unwrap();
    assert_eq!(border.description().as_str(), "0-1_0-2_1-2");
    assert_eq!(border.vertices.len(), 4);
    assert_eq!(border.edges.len(), 4);

    // id and description both resolve to the same border
    let by_desc = ss.borders().border_for(border.description()).unwrap();
    assert_eq!(by_desc.id, border.id);

    // each merged border edge carries one face per participating mesh
    for &e in &border.edges {
        assert_eq!(ss.topology().edge(e).faces.len(), 3);
    }

    check_reciprocity(&ss);
    ss.verify_borders().unwrap();
}

#[test]
fn border_vertices_are_shared_across_meshes() {
    let mut ss = two_cube_set();
    ss.index_borders().unwrap();

    let border = ss.borders().iter().next().unwrap();
    for &v in &border.vertices {
        let vertex = ss.topology().vertex(v);
        assert_eq!(vertex.border, Some(border.id));
        // one container slot per participating mesh, all holding this vertex
        assert_eq!(vertex.locations.len(), 3);
        for mesh_id in &border.mesh_ids {
            let mesh = &ss.meshes[mesh_id];
            let slot = vertex.locations[mesh_id];
            assert_eq!(mesh.vertices[slot], v);
        }
        // the four shared corners all sit on the x = 1 plane
        assert_eq!(vertex.position.x, 1.0);
    }
}

#[test]
fn three_pages_meet_along_one_curve() {
    let mut ss = book_set(&straight_spine(2));
    ss.index_borders().unwrap();

    assert_eq!(ss.borders().len(), 1);
    let border = ss.borders().iter().next().unwrap();
    assert_eq!(border.description().as_str(), "1-2_1-3_2-3");
    assert_eq!(border.vertices.len(), 3);
    assert_eq!(border.edges.len(), 2);

    // every border vertex touches faces from all three meshes
    for &v in &border.vertices {
        let mut meshes: Vec<_> = ss
            .topology()
            .vertex(v)
            .faces
            .iter()
            .map(|&f| ss.topology().face(f).mesh)
            .collect();
        meshes.sort();
        meshes.dedup();
        assert_eq!(meshes.len(), 3);
    }

    check_reciprocity(&ss);
    ss.verify_borders().unwrap();
}

#[test]
fn distant_meshes_produce_no_borders() {
    fn quad(name: &str, x: f64) -> TriMesh {
        let mut tm = TriMesh::new(name);
        tm.positions = vec![
            Point3::new(x, 0.0, 0.0),
            Point3::new(x + 1.0, 0.0, 0.0),
            Point3::new(x + 1.0, 1.0, 0.0),
            Point3::new(x, 1.0, 0.0),
        ];
        tm.faces = vec![[0, 1, 2], [0, 2, 3]];
        tm
    }

    let mut ss = ShapeSet::new(
        "distant",
        labels(&[(1, "a"), (2, "b"), (3, "c")]),
        vec![quad("1-2", 0.0), quad("2-3", 10.0)],
    )
    .unwrap();
    ss.index_borders().unwrap();
    assert!(ss.borders().is_empty());
}

#[test]
fn indexing_twice_is_idempotent() {
    let mut ss = two_cube_set();
    ss.index_borders().unwrap();
    let first: Vec<_> = ss
        .borders()
        .iter()
        .map(|b| (b.id, b.description(), b.vertices.clone(), b.edges.len()))
        .collect();

    ss.index_borders().unwrap();
    let second: Vec<_> = ss
        .borders()
        .iter()
        .map(|b| (b.id, b.description(), b.vertices.clone(), b.edges.len()))
        .collect();

    assert_eq!(first, second);
    check_reciprocity(&ss);
    ss.verify_borders().unwrap();
}

#[test]
fn save_load_round_trip_preserves_the_model() {
    let mut ss = two_cube_set();
    ss.index_borders().unwrap();

    let mut buffer = Vec::new();
    shapeset::io::save(&mut ss, &mut buffer).unwrap();
    let mut reloaded = shapeset::io::load(buffer.as_slice()).unwrap();

    assert_eq!(reloaded.name, ss.name);
    assert_eq!(reloaded.shapes, ss.shapes);
    assert_eq!(reloaded.meshes.len(), ss.meshes.len());

    for (mesh_id, mesh) in &ss.meshes {
        let other = &reloaded.meshes[mesh_id];
        assert_eq!(other.vertex_count(), mesh.vertex_count());
        assert_eq!(other.face_count(), mesh.face_count());
        let original = ss.extract_tri_mesh(*mesh_id).unwrap();
        let round_tripped = reloaded.extract_tri_mesh(*mesh_id).unwrap();
        assert_eq!(original.positions, round_tripped.positions);
        assert_eq!(original.faces, round_tripped.faces);
    }

    // descriptions survive; ids may be renumbered
    let descs = |ss: &ShapeSet| -> Vec<BorderDescription> {
        ss.borders().iter().map(|b| b.description()).collect()
    };
    assert_eq!(descs(&ss), descs(&reloaded));

    reloaded.verify_borders().unwrap();
    check_reciprocity(&reloaded);

    // border edges were re-inferred on load
    let border = reloaded.borders().iter().next().unwrap();
    assert_eq!(border.edges.len(), 4);

    // saving the reloaded set again produces identical bytes
    let mut buffer2 = Vec::new();
    shapeset::io::save(&mut reloaded, &mut buffer2).unwrap();
    assert_eq!(buffer, buffer2);
}

#[test]
fn composed_region_is_a_closed_outward_cube() {
    let mut ss = two_cube_set();
    ss.index_borders().unwrap();

    let region = ss.compose_region(&[ShapeId(1)]).unwrap();
    assert_eq!(region.mesh.name, "left");
    assert_eq!(region.mesh.vertex_count(), 8);
    assert_eq!(region.mesh.face_count(), 12);
    assert_eq!(region.inverted_sources, 1);

    // watertight: every undirected edge is used by exactly two faces
    let mut edge_counts = std::collections::HashMap::new();
    for &[a, b, c] in &region.mesh.faces {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            let key = if u < v { (u, v) } else { (v, u) };
            *edge_counts.entry(key).or_insert(0) += 1;
        }
    }
    assert!(edge_counts.values().all(|&count| count == 2));

    // outward orientation: positive unit volume
    assert!((signed_volume(&region.mesh) - 1.0).abs() < 1e-10);

    // the mirror region composes the other cube, keeping the shared face
    let other = ss.compose_region(&[ShapeId(2)]).unwrap();
    assert_eq!(other.mesh.name, "right");
    assert_eq!(other.inverted_sources, 0);
    assert!((signed_volume(&other.mesh) - 1.0).abs() < 1e-10);
}

#[test]
fn realign_after_index_is_the_identity() {
    let mut ss = two_cube_set();
    ss.index_borders().unwrap();

    let before: Vec<_> = ss
        .borders()
        .iter()
        .flat_map(|b| b.vertices.iter().map(|&v| ss.topology().vertex(v).position))
        .collect();
    ss.realign_borders();
    let after: Vec<_> = ss
        .borders()
        .iter()
        .flat_map(|b| b.vertices.iter().map(|&v| ss.topology().vertex(v).position))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn scale_and_center_keeps_borders_valid() {
    let mut ss = two_cube_set();
    ss.index_borders().unwrap();
    ss.scale_and_center(10.0);

    let bb = ss.bounding_box().unwrap();
    assert!((bb.max_dimension() - 10.0).abs() < 1e-10);
    ss.verify_borders().unwrap();
    check_reciprocity(&ss);
}

#[test]
fn create_save_meshes_reload_vertices_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = dir.path().join("meshes");
    std::fs::create_dir(&mesh_dir).unwrap();

    let mut ss = two_cube_set();
    ss.index_borders().unwrap();
    ss.save_meshes(&mesh_dir).unwrap();

    // shift the whole set, then pull the original positions back in
    ss.scale_and_center(4.0);
    ss.reload_vertices(&mesh_dir).unwrap();

    let border = ss.borders().iter().next().unwrap();
    for &v in &border.vertices {
        assert_eq!(ss.topology().vertex(v).position.x, 1.0);
    }
    ss.verify_borders().unwrap();

    // and a labels file gets us back to a fresh set via create
    let labels_path = dir.path().join("labels.json");
    std::fs::write(
        &labels_path,
        r#"{"0": "exterior", "1": "left", "2": "right"}"#,
    )
    .unwrap();
    let mut fresh = ShapeSet::create_from_dir(&mesh_dir, &labels_path).unwrap();
    assert_eq!(fresh.meshes.len(), 3);
    fresh.index_borders().unwrap();
    assert_eq!(fresh.borders().len(), 1);
    assert_eq!(
        fresh.borders().iter().next().unwrap().vertices.len(),
        4
    );
}
