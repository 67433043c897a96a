use oorandom::Rand64;
use stitch3d::math::Point;
use stitch3d::na;
use stitch3d::mesh::{EdgeFlags, HalfEdge, Mesh, VertexId};
use stitch3d::stitch::NonManifoldStitch;

fn boundary_edges(mesh: &Mesh) -> Vec<HalfEdge> {
    let mut out = Vec::new();
    for t in mesh.surface_triangle_ids() {
        for side in 0..3u8 {
            let e = HalfEdge::new(t, side);
            if mesh.edge_has(e, EdgeFlags::BOUNDARY) {
                out.push(e);
            }
        }
    }
    out
}

/// The border of the source strip is finer than the border of the target
/// quad: stitching must split the target border edge at the extra vertex.
#[test]
fn stitch_refines_the_target_border() {
    let mut mesh = Mesh::new();
    let a = mesh.add_vertex(Point::new(0.0, 0.0, 0.0));
    let b = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
    let c = mesh.add_vertex(Point::new(1.0, 1.0, 0.0));
    let d = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
    let _ = mesh.add_triangle([a, b, c], 2);
    let _ = mesh.add_triangle([a, c, d], 2);
    let e = mesh.add_vertex(Point::new(0.0, -0.01, 0.0));
    let m = mesh.add_vertex(Point::new(0.5, -0.01, 0.0));
    let f = mesh.add_vertex(Point::new(1.0, -0.01, 0.0));
    let g = mesh.add_vertex(Point::new(0.0, -1.0, 0.0));
    let h = mesh.add_vertex(Point::new(1.0, -1.0, 0.0));
    let _ = mesh.add_triangle([f, m, h], 1);
    let _ = mesh.add_triangle([m, g, h], 1);
    let _ = mesh.add_triangle([m, e, g], 1);
    mesh.build_adjacency();

    let mut stitch = NonManifoldStitch::new(mesh).unwrap();
    stitch.set_max_distance(0.2);
    stitch.set_tolerance(0.05);
    stitch.stitch_pair(1, 2, 0.0, false);

    let mesh = stitch.mesh();
    assert!(mesh.is_valid());
    assert!(mesh.check_no_degenerate_triangles());
    assert!(mesh.check_no_inverted_triangles());
    // The target border was split at (0.5, 0, 0) and the strip's midpoint
    // merged into the new vertex.
    let v = mesh
        .vertex_ids()
        .find(|&v| na::distance_squared(&mesh.point(v), &Point::new(0.5, 0.0, 0.0)) < 1.0e-12)
        .expect("missing seam vertex");
    assert!(!mesh.vertex(v).is_mutable());
    assert!(mesh.half_edge_between(a, b).is_none());
    for (va, vb) in [(a, v), (v, b)] {
        let seam = mesh.half_edge_between(va, vb).unwrap();
        assert!(!mesh.edge_has(seam, EdgeFlags::BOUNDARY));
        assert!(!mesh.is_outer(mesh.sym(seam).unwrap().tri));
    }
    // One extra triangle in the refined target group, none lost in the
    // source group.
    let count = |group: i32| {
        mesh.surface_triangle_ids()
            .filter(|&t| mesh.triangle(t).group() == group)
            .count()
    };
    assert_eq!(count(2), 3);
    assert_eq!(count(1), 3);
}

/// Merging across a gap close to the maximal stitch distance must keep
/// every merged source vertex within the merge distance bound of its
/// original position.
#[test]
fn merged_vertices_stay_within_the_distance_bound() {
    const MAX_DISTANCE: f64 = 0.2;
    let mut mesh = Mesh::new();
    let a = mesh.add_vertex(Point::new(0.0, 0.0, 0.0));
    let b = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
    let c = mesh.add_vertex(Point::new(1.0, 1.0, 0.0));
    let d = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
    let _ = mesh.add_triangle([a, b, c], 2);
    let _ = mesh.add_triangle([a, c, d], 2);
    let e = mesh.add_vertex(Point::new(0.0, -0.15, 0.0));
    let f = mesh.add_vertex(Point::new(1.0, -0.15, 0.0));
    let g = mesh.add_vertex(Point::new(0.0, -1.0, 0.0));
    let h = mesh.add_vertex(Point::new(1.0, -1.0, 0.0));
    let _ = mesh.add_triangle([f, e, g], 1);
    let _ = mesh.add_triangle([f, g, h], 1);
    mesh.build_adjacency();
    let sources = [mesh.point(e), mesh.point(f)];

    let mut stitch = NonManifoldStitch::new(mesh).unwrap();
    stitch.set_max_distance(MAX_DISTANCE);
    stitch.set_tolerance(0.18);
    stitch.stitch_pair(1, 2, 0.0, false);

    let mesh = stitch.mesh();
    assert!(mesh.is_valid());
    assert!(mesh.check_no_degenerate_triangles());
    assert!(mesh.check_no_inverted_triangles());
    // Both border vertices merged across the gap, closing the seam.
    let seam = mesh.half_edge_between(a, b).unwrap();
    assert!(!mesh.edge_has(seam, EdgeFlags::BOUNDARY));
    assert_eq!(mesh.vertex_ids().count(), 6);
    let bound = 2.0 * MAX_DISTANCE * MAX_DISTANCE;
    for source in sources {
        let moved = mesh
            .vertex_ids()
            .map(|v| na::distance_squared(&mesh.point(v), &source))
            .fold(f64::INFINITY, f64::min);
        assert!(moved < bound, "vertex moved {moved} from {source:?}");
    }
}

/// Two grids with jittered but matching border vertices must always stitch
/// into a closed seam, whatever the jitter.
#[test]
fn jittered_grid_borders_stitch_cleanly() {
    const COLS: usize = 4;
    const STEP: f64 = 0.25;
    for seed in 0..4u128 {
        let mut rng = Rand64::new(seed);
        let mut jitter = |amount: f64| (rng.rand_float() * 2.0 - 1.0) * amount;

        let mut mesh = Mesh::new();
        // Target grid, one row of quads above y = 0.
        let mut top = Vec::new();
        let mut bottom = Vec::new();
        for k in 0..=COLS {
            bottom.push(mesh.add_vertex(Point::new(k as f64 * STEP, 0.0, 0.0)));
            top.push(mesh.add_vertex(Point::new(k as f64 * STEP, 1.0, 0.0)));
        }
        for k in 0..COLS {
            let _ = mesh.add_triangle([bottom[k], bottom[k + 1], top[k + 1]], 2);
            let _ = mesh.add_triangle([bottom[k], top[k + 1], top[k]], 2);
        }
        // Source strip below, with a jittered upper border.
        let mut upper = Vec::new();
        let mut lower = Vec::new();
        for k in 0..=COLS {
            let x = k as f64 * STEP + jitter(0.02);
            let y = -0.005 - jitter(0.02).abs();
            upper.push(mesh.add_vertex(Point::new(x, y, 0.0)));
            lower.push(mesh.add_vertex(Point::new(k as f64 * STEP, -1.0, 0.0)));
        }
        for k in 0..COLS {
            let _ = mesh.add_triangle([lower[k], lower[k + 1], upper[k + 1]], 1);
            let _ = mesh.add_triangle([lower[k], upper[k + 1], upper[k]], 1);
        }
        mesh.build_adjacency();
        let sources: Vec<Point> = upper.iter().map(|&v| mesh.point(v)).collect();

        let mut stitch = NonManifoldStitch::new(mesh).unwrap();
        stitch.set_max_distance(0.3);
        stitch.set_tolerance(0.1);
        stitch.stitch_pair(1, 2, 0.0, false);

        let mesh = stitch.mesh();
        assert!(mesh.is_valid(), "seed {seed}");
        assert!(mesh.check_no_degenerate_triangles(), "seed {seed}");
        assert!(mesh.check_no_inverted_triangles(), "seed {seed}");
        // No merged vertex moved further than the merge distance bound.
        let bound = 2.0 * 0.3 * 0.3;
        for source in &sources {
            let moved = mesh
                .vertex_ids()
                .map(|v| na::distance_squared(&mesh.point(v), source))
                .fold(f64::INFINITY, f64::min);
            assert!(moved < bound, "seed {seed}: vertex moved {moved}");
        }
        // Every jittered vertex snapped to its matching grid corner, so one
        // vertex per column remains on the seam.
        for k in 0..=COLS {
            let corner = Point::new(k as f64 * STEP, 0.0, 0.0);
            let near: Vec<VertexId> = mesh
                .vertex_ids()
                .filter(|&v| na::distance_squared(&mesh.point(v), &corner) < 0.0025)
                .collect();
            assert_eq!(near.len(), 1, "seed {seed}, column {k}");
            assert!(!mesh.vertex(near[0]).is_mutable());
        }
        // The seam itself is completely closed.
        for e in boundary_edges(mesh) {
            let o = mesh.point(mesh.origin(e));
            let d = mesh.point(mesh.destination(e));
            assert!(
                o.y.abs() > 1.0e-9 || d.y.abs() > 1.0e-9,
                "seed {seed}: open seam edge {o:?}-{d:?}"
            );
        }
    }
}
