use crate::math::{Point, Real, Vector};
use crate::mesh::{triangle_normal, Mesh, TriangleId, VertexId};
use crate::partitioning::TriangleRTree;
use rstar::primitives::GeomWithData;
use rstar::RTree;

/// Computes the intersection segments between two groups of triangles.
///
/// Every pair of crossing triangles, one per group, yields a beam: two
/// vertices added to the mesh at the ends of the intersection segment.
/// Endpoints closer than the tolerance are shared between beams, so chains
/// of beams form polylines following the intersection curve.
pub struct Intersection<'a> {
    mesh: &'a mut Mesh,
    tree: &'a TriangleRTree,
}

impl<'a> Intersection<'a> {
    pub fn new(mesh: &'a mut Mesh, tree: &'a TriangleRTree) -> Self {
        Intersection { mesh, tree }
    }

    /// Intersects `group1` with `group2`.
    ///
    /// Returns the created beams as a flat list of vertex pairs.
    pub fn intersect(&mut self, group1: i32, group2: i32, tolerance: Real) -> Vec<VertexId> {
        let sqr_tol = tolerance * tolerance;
        let mut beams = Vec::new();
        let mut shared: RTree<GeomWithData<[Real; 3], VertexId>> = RTree::new();
        let mut candidates: Vec<TriangleId> = Vec::new();
        let tids: Vec<TriangleId> = self
            .mesh
            .surface_triangle_ids()
            .filter(|&t| self.mesh.triangle(t).group() == group1)
            .collect();
        for t in tids {
            let pts1 = self.triangle_points(t);
            let mut mins = [Real::INFINITY; 3];
            let mut maxs = [Real::NEG_INFINITY; 3];
            for p in &pts1 {
                for k in 0..3 {
                    mins[k] = mins[k].min(p[k]);
                    maxs[k] = maxs[k].max(p[k]);
                }
            }
            candidates.clear();
            self.tree
                .near_triangles(mins, maxs, tolerance, group2, false, &mut candidates);
            candidates.sort_unstable();
            candidates.dedup();
            for &t2 in &candidates {
                let pts2 = self.triangle_points(t2);
                if let Some((e1, e2)) = triangle_triangle_intersection(&pts1, &pts2) {
                    let v1 = self.shared_vertex(&mut shared, e1, sqr_tol);
                    let v2 = self.shared_vertex(&mut shared, e2, sqr_tol);
                    if v1 != v2 {
                        beams.push(v1);
                        beams.push(v2);
                    }
                }
            }
        }
        beams
    }

    fn triangle_points(&self, t: TriangleId) -> [Point; 3] {
        let v = self.mesh.triangle(t).vertices();
        [
            self.mesh.point(v[0]),
            self.mesh.point(v[1]),
            self.mesh.point(v[2]),
        ]
    }

    /// The vertex standing for `p`, reusing a previously created endpoint
    /// when one lies within the tolerance.
    fn shared_vertex(
        &mut self,
        shared: &mut RTree<GeomWithData<[Real; 3], VertexId>>,
        p: Point,
        sqr_tol: Real,
    ) -> VertexId {
        let q = [p.x, p.y, p.z];
        if let Some(near) = shared.nearest_neighbor(&q) {
            let g = near.geom();
            let d = (g[0] - q[0]).powi(2) + (g[1] - q[1]).powi(2) + (g[2] - q[2]).powi(2);
            if d < sqr_tol {
                return near.data;
            }
        }
        let v = self.mesh.add_vertex(p);
        shared.insert(GeomWithData::new(q, v));
        v
    }
}

/// Intersects a segment with a plane given by its normal `n` and one of its
/// points `p0`.
///
/// Returns `None` when the segment is parallel to the plane or when the
/// crossing falls outside of the segment.
fn intersect_with_line(p1: &Point, p2: &Point, n: &Vector, p0: &Point) -> Option<Point> {
    let p21 = p2 - p1;
    let num = n.dot(&p0.coords) - n.dot(&p1.coords);
    let den = n.dot(&p21);
    // The denominator is compared to the numerator, not to a fixed epsilon.
    if den.abs() <= num.abs() * 1.0e-6 {
        return None;
    }
    let t = num / den;
    if (0.0..=1.0).contains(&t) {
        Some(p1 + p21 * t)
    } else {
        None
    }
}

/// The intersection segment of two triangles, if any.
///
/// This follows the interval method of vtkIntersectionPolyDataFilter: both
/// triangles are cut by the line where their supporting planes meet, and the
/// segment is the overlap of the two resulting parameter intervals. Coplanar
/// triangles are not considered intersecting.
pub fn triangle_triangle_intersection(pts1: &[Point; 3], pts2: &[Point; 3]) -> Option<(Point, Point)> {
    let mut n1 = triangle_normal(&pts1[0], &pts1[1], &pts1[2]);
    let mut n2 = triangle_normal(&pts2[0], &pts2[1], &pts2[2]);
    if n1.normalize_mut() < 1.0e-12 || n2.normalize_mut() < 1.0e-12 {
        return None;
    }
    let s1 = -n1.dot(&pts1[0].coords);
    let s2 = -n2.dot(&pts2[0].coords);

    // Signed distances of each triangle's vertices to the other's plane; if
    // all three share a sign there is no crossing.
    let dist1 = [
        n2.dot(&pts1[0].coords) + s2,
        n2.dot(&pts1[1].coords) + s2,
        n2.dot(&pts1[2].coords) + s2,
    ];
    if dist1[0] * dist1[1] > 0.0 && dist1[0] * dist1[2] > 0.0 {
        return None;
    }
    let dist2 = [
        n1.dot(&pts2[0].coords) + s1,
        n1.dot(&pts2[1].coords) + s1,
        n1.dot(&pts2[2].coords) + s1,
    ];
    if dist2[0] * dist2[1] > 0.0 && dist2[0] * dist2[2] > 0.0 {
        return None;
    }
    if (n1.x - n2.x).abs() < 1.0e-9
        && (n1.y - n2.y).abs() < 1.0e-9
        && (n1.z - n2.z).abs() < 1.0e-9
        && (s1 - s2).abs() < 1.0e-9
    {
        return None;
    }

    // The line where the two planes meet, as an anchor point and a unit
    // direction.
    let n1n2 = n1.dot(&n2);
    let a = (s1 - s2 * n1n2) / (n1n2 * n1n2 - 1.0);
    let b = (s2 - s1 * n1n2) / (n1n2 * n1n2 - 1.0);
    let p = n1 * a + n2 * b;
    let mut v = n1.cross(&n2);
    v /= v.norm();

    let mut t1 = [0.0; 2];
    let mut t2 = [0.0; 2];
    let mut index1 = 0;
    let mut index2 = 0;
    let pv = p.dot(&v);
    for i in 0..3 {
        let (id1, id2) = (i, (i + 1) % 3);
        if let Some(x) = intersect_with_line(&pts1[id1], &pts1[id2], &n2, &pts2[0]) {
            if index1 >= 2 {
                // Something strange happened so we don't intersect.
                return None;
            }
            t1[index1] = x.coords.dot(&v) - pv;
            index1 += 1;
        }
        if let Some(x) = intersect_with_line(&pts2[id1], &pts2[id2], &n1, &pts1[0]) {
            if index2 >= 2 {
                return None;
            }
            t2[index2] = x.coords.dot(&v) - pv;
            index2 += 1;
        }
    }
    // Each triangle must be cut by the line along exactly one chord.
    if index1 != 2 || index2 != 2 {
        return None;
    }
    if t1[0].is_nan() || t1[1].is_nan() || t2[0].is_nan() || t2[1].is_nan() {
        return None;
    }
    if t1[0] > t1[1] {
        t1.swap(0, 1);
    }
    if t2[0] > t2[1] {
        t2.swap(0, 1);
    }
    if t1[1] < t2[0] || t2[1] < t1[0] {
        return None;
    }
    let tt1 = t1[0].max(t2[0]);
    let tt2 = t1[1].min(t2[1]);
    Some((Point::from(p + v * tt1), Point::from(p + v * tt2)))
}

#[cfg(test)]
mod test {
    use super::{triangle_triangle_intersection, Intersection};
    use crate::math::Point;
    use crate::mesh::Mesh;
    use crate::partitioning::TriangleRTree;

    fn close(p: &Point, x: f64, y: f64, z: f64) -> bool {
        na::distance_squared(p, &Point::new(x, y, z)) < 1.0e-18
    }

    #[test]
    fn crossing_triangles_yield_a_segment() {
        let pts1 = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        ];
        let pts2 = [
            Point::new(0.2, 0.5, -1.0),
            Point::new(1.5, 0.5, -1.0),
            Point::new(0.5, 0.5, 1.0),
        ];
        let (e1, e2) = triangle_triangle_intersection(&pts1, &pts2).unwrap();
        let (lo, hi) = if e1.x < e2.x { (e1, e2) } else { (e2, e1) };
        assert!(close(&lo, 0.5, 0.5, 0.0), "{lo:?}");
        assert!(close(&hi, 1.0, 0.5, 0.0), "{hi:?}");
    }

    #[test]
    fn disjoint_chords_do_not_intersect() {
        let pts1 = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ];
        // Crosses the plane of the first triangle far away from it.
        let pts2 = [
            Point::new(5.0, 0.2, -1.0),
            Point::new(6.0, 0.2, -1.0),
            Point::new(5.5, 0.2, 1.0),
        ];
        assert!(triangle_triangle_intersection(&pts1, &pts2).is_none());
    }

    #[test]
    fn coplanar_triangles_do_not_intersect() {
        let pts1 = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ];
        let pts2 = [
            Point::new(0.1, 0.1, 0.0),
            Point::new(1.1, 0.1, 0.0),
            Point::new(0.1, 1.1, 0.0),
        ];
        assert!(triangle_triangle_intersection(&pts1, &pts2).is_none());
    }

    #[test]
    fn adjacent_beams_share_their_common_endpoint() {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(Point::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point::new(1.0, 1.0, 0.0));
        let d = mesh.add_vertex(Point::new(0.0, 1.0, 0.0));
        let _ = mesh.add_triangle([a, b, c], 1);
        let _ = mesh.add_triangle([a, c, d], 1);
        let e0 = mesh.add_vertex(Point::new(-0.2, 0.5, -1.0));
        let e1 = mesh.add_vertex(Point::new(1.5, 0.5, -1.0));
        let e2 = mesh.add_vertex(Point::new(0.5, 0.5, 1.0));
        let _ = mesh.add_triangle([e0, e1, e2], 2);
        mesh.build_adjacency();

        let tree = TriangleRTree::new(&mesh);
        let beams = Intersection::new(&mut mesh, &tree).intersect(1, 2, 0.01);
        // Two beams meeting on the diagonal of the quad, with the meeting
        // point created only once.
        assert_eq!(beams.len(), 4);
        let mut unique = beams.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 3);
        assert!(beams
            .iter()
            .any(|&v| close(&mesh.point(v), 0.5, 0.5, 0.0)));
    }
}
