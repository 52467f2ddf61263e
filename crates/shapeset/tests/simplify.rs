//! Border simplification on constructed shape sets.

mod common;

use common::{book_set, check_reciprocity, straight_spine, two_cube_set};
use nalgebra::Point3;
use shapeset::SimplifyParams;

#[test]
fn flat_border_halves_under_half_aggressiveness() {
    // A straight spine shared by three flat pages: every edge has zero
    // error, nothing is protected, so exactly the budget collapses.
    let mut ss = book_set(&straight_spine(8));
    ss.index_borders().unwrap();

    let result = ss.simplify_borders(&SimplifyParams {
        error_threshold: 10.0,
        aggressiveness: 0.5,
        forgiveness: 0,
    });

    assert_eq!(result.collapses_performed, 4);
    assert_eq!(result.collapses_rejected, 0);

    let border = ss.borders().iter().next().unwrap();
    assert_eq!(border.edges.len(), 4);
    assert_eq!(border.vertices.len(), 5);

    // each collapse deletes one face in each of the three pages
    assert_eq!(result.faces_removed, 12);
    for mesh in ss.meshes.values() {
        assert_eq!(mesh.face_count(), 12);
    }

    check_reciprocity(&ss);
    ss.verify_borders().unwrap();
}

#[test]
fn collapses_stop_at_the_error_threshold() {
    // Five collinear segments and an end segment collapse for free; the two
    // edges between the sharp zigzag vertices carry real error and must
    // survive a tiny threshold.
    let spine = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(3.0, 0.0, 0.0),
        Point3::new(4.0, 0.0, 0.0),
        Point3::new(5.0, 2.0, 0.0),
        Point3::new(6.0, 0.0, 0.0),
        Point3::new(7.0, 2.0, 0.0),
    ];
    let mut ss = book_set(&spine);
    ss.index_borders().unwrap();
    let threshold = 1e-9;

    let result = ss.simplify_borders(&SimplifyParams {
        error_threshold: threshold,
        aggressiveness: 1.0,
        forgiveness: 0,
    });

    assert_eq!(result.collapses_performed, 5);

    let border = ss.borders().iter().next().unwrap();
    assert_eq!(border.edges.len(), 2);
    for &e in &border.edges {
        assert!(ss.topology().edge(e).error > threshold);
    }

    check_reciprocity(&ss);
    ss.verify_borders().unwrap();
}

#[test]
fn forgiveness_spares_short_borders() {
    let mut ss = book_set(&straight_spine(8));
    ss.index_borders().unwrap();

    let result = ss.simplify_borders(&SimplifyParams {
        error_threshold: 10.0,
        aggressiveness: 0.5,
        forgiveness: 10,
    });

    assert_eq!(result.collapses_performed, 0);
    assert_eq!(result.borders_processed, 0);
    assert_eq!(ss.borders().iter().next().unwrap().edges.len(), 8);
}

#[test]
fn tight_border_loops_are_protected() {
    // The two-cube border is a four-edge loop around the shared face; every
    // edge of that loop shares a face with another border edge, so all
    // collapse attempts are rejected and the meshes are untouched.
    let mut ss = two_cube_set();
    ss.index_borders().unwrap();

    let result = ss.simplify_borders(&SimplifyParams {
        error_threshold: 10.0,
        aggressiveness: 1.0,
        forgiveness: 0,
    });

    assert_eq!(result.collapses_performed, 0);
    assert_eq!(result.collapses_rejected, 4);
    assert_eq!(result.vertices_removed, 0);

    let border = ss.borders().iter().next().unwrap();
    assert_eq!(border.edges.len(), 4);
    assert_eq!(border.vertices.len(), 4);

    check_reciprocity(&ss);
    ss.verify_borders().unwrap();
}

#[test]
fn simplification_never_raises_the_edge_count() {
    for segments in [2, 5, 9, 16] {
        let mut ss = book_set(&straight_spine(segments));
        ss.index_borders().unwrap();
        let before = ss.borders().iter().next().unwrap().edges.len();

        ss.simplify_borders(&SimplifyParams {
            error_threshold: 1.0,
            aggressiveness: 0.75,
            forgiveness: 0,
        });

        let after = ss.borders().iter().next().unwrap().edges.len();
        assert!(after <= before);
        check_reciprocity(&ss);
        ss.verify_borders().unwrap();
    }
}

#[test]
fn surviving_vertices_move_to_collapse_targets() {
    // With all errors zero the fallback target is the midpoint, so surviving
    // border vertices stay on the spine line.
    let mut ss = book_set(&straight_spine(8));
    ss.index_borders().unwrap();
    ss.simplify_borders(&SimplifyParams {
        error_threshold: 10.0,
        aggressiveness: 0.5,
        forgiveness: 0,
    });

    let border = ss.borders().iter().next().unwrap();
    for &v in &border.vertices {
        let p = ss.topology().vertex(v).position;
        assert_eq!(p.y, 0.0);
        assert_eq!(p.z, 0.0);
    }
}
